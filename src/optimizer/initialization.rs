use crate::config::ParameterSpace;
use fastrand::Rng;

/// Draws one parameter vector uniformly inside the space.
pub fn sample_uniform(rng: &mut Rng, space: &ParameterSpace) -> Vec<f64> {
    space
        .bounds()
        .iter()
        .map(|b| b.clip(b.low + rng.f64() * b.span()))
        .collect()
}
