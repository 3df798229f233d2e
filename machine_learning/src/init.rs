use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::Result;

/// Fills `params` with samples of `U(-1/sqrt(fan_in), 1/sqrt(fan_in))`.
///
/// # Arguments
/// * `params` - The slice to fill.
/// * `fan_in` - The number of inputs feeding each output unit.
/// * `rng` - A random number generator.
pub fn fan_in_uniform<R: Rng + ?Sized>(params: &mut [f32], fan_in: usize, rng: &mut R) -> Result<()> {
    let bound = (fan_in.max(1) as f32).sqrt().recip();
    let distribution = Uniform::new_inclusive(-bound, bound)?;

    for p in params.iter_mut() {
        *p = distribution.sample(rng);
    }

    Ok(())
}
