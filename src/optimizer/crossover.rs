use crate::config::ParameterSpace;
use fastrand::Rng;

/// Parents closer than this on a variable are treated as equal there.
const EPS: f64 = 1e-14;

/// Probability that an individual variable takes part in a mating.
const VARIABLE_PROB: f64 = 0.5;

#[inline(always)]
fn spread_factor(u: f64, alpha: f64, eta: f64) -> f64 {
    if u <= 1.0 / alpha {
        (u * alpha).powf(1.0 / (eta + 1.0))
    } else {
        (1.0 / (2.0 - u * alpha)).powf(1.0 / (eta + 1.0))
    }
}

/// Bounded simulated binary crossover (Deb & Agrawal) on one variable.
/// Returns the two children, clipped to `[low, high]`.
pub fn sbx_pair(rng: &mut Rng, p1: f64, p2: f64, low: f64, high: f64, eta: f64) -> (f64, f64) {
    let (y1, y2) = if p1 < p2 { (p1, p2) } else { (p2, p1) };
    let delta = y2 - y1;
    if delta <= EPS {
        return (p1, p2);
    }

    let u = rng.f64();

    let beta = 1.0 + 2.0 * (y1 - low) / delta;
    let alpha = 2.0 - beta.powf(-(eta + 1.0));
    let c1 = 0.5 * ((y1 + y2) - spread_factor(u, alpha, eta) * delta);

    let beta = 1.0 + 2.0 * (high - y2) / delta;
    let alpha = 2.0 - beta.powf(-(eta + 1.0));
    let c2 = 0.5 * ((y1 + y2) + spread_factor(u, alpha, eta) * delta);

    let (c1, c2) = (c1.clamp(low, high), c2.clamp(low, high));
    if rng.bool() {
        (c2, c1)
    } else {
        (c1, c2)
    }
}

/// Simulated binary crossover of two parameter vectors.
///
/// With probability `1 - prob` the parents are copied unchanged; otherwise
/// each variable is recombined with probability one half.
pub fn crossover_sbx(
    rng: &mut Rng,
    p1: &[f64],
    p2: &[f64],
    space: &ParameterSpace,
    prob: f64,
    eta: f64,
) -> (Vec<f64>, Vec<f64>) {
    let mut c1 = p1.to_vec();
    let mut c2 = p2.to_vec();

    if rng.f64() >= prob {
        return (c1, c2);
    }

    for (i, b) in space.bounds().iter().enumerate() {
        if rng.f64() >= VARIABLE_PROB {
            continue;
        }
        let (a, z) = sbx_pair(rng, p1[i], p2[i], b.low, b.high, eta);
        c1[i] = a;
        c2[i] = z;
    }

    space.clip(&mut c1);
    space.clip(&mut c2);
    (c1, c2)
}
