use crate::config::ParameterSpace;
use fastrand::Rng;

/// Default per-variable mutation probability: `min(0.5, 1 / n_vars)`.
pub fn default_variable_prob(n_vars: usize) -> f64 {
    if n_vars == 0 {
        return 0.0;
    }
    (1.0 / n_vars as f64).min(0.5)
}

/// Polynomial mutation of a single value inside `[low, high]`.
pub fn polynomial_step(rng: &mut Rng, x: f64, low: f64, high: f64, eta: f64) -> f64 {
    let span = high - low;
    if span <= 0.0 {
        return x;
    }

    let delta1 = (x - low) / span;
    let delta2 = (high - x) / span;
    let power = 1.0 / (eta + 1.0);
    let u = rng.f64();

    let delta_q = if u < 0.5 {
        let xy = 1.0 - delta1;
        let val = 2.0 * u + (1.0 - 2.0 * u) * xy.powf(eta + 1.0);
        val.powf(power) - 1.0
    } else {
        let xy = 1.0 - delta2;
        let val = 2.0 * (1.0 - u) + 2.0 * (u - 0.5) * xy.powf(eta + 1.0);
        1.0 - val.powf(power)
    };

    (x + delta_q * span).clamp(low, high)
}

/// Applies polynomial mutation to each variable with probability
/// `variable_prob`, then clips the vector into the space.
pub fn mutate_polynomial(
    rng: &mut Rng,
    params: &mut [f64],
    space: &ParameterSpace,
    eta: f64,
    variable_prob: f64,
) {
    for (x, b) in params.iter_mut().zip(space.bounds()) {
        if rng.f64() < variable_prob {
            *x = polynomial_step(rng, *x, b.low, b.high, eta);
        }
    }
    space.clip(params);
}
