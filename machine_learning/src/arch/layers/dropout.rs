use ndarray::ArrayD;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{MlErr, Result};

/// Inverted dropout: while training, zeroes each activation with probability `p` and scales the
/// survivors by `1 / (1 - p)`. Outside training it is the identity.
#[derive(Clone, Debug)]
pub struct Dropout {
    p: f32,
    rng: StdRng,

    // Forward metadata
    mask: Option<ArrayD<f32>>,
}

impl Dropout {
    /// Creates a new `Dropout`.
    ///
    /// # Arguments
    /// * `p` - The probability of dropping an activation, clamped to `[0, 1)`.
    /// * `seed` - Seeds the generator the masks are drawn from.
    pub fn new(p: f32, seed: u64) -> Self {
        Self {
            p: p.clamp(0.0, 0.999),
            rng: StdRng::seed_from_u64(seed),
            mask: None,
        }
    }

    pub fn forward(&mut self, x: ArrayD<f32>, training: bool) -> Result<ArrayD<f32>> {
        if !training || self.p == 0.0 {
            self.mask = None;
            return Ok(x);
        }

        let keep = 1.0 / (1.0 - self.p);
        let mask = ArrayD::from_shape_simple_fn(x.raw_dim(), || {
            if self.rng.random::<f32>() < self.p {
                0.0
            } else {
                keep
            }
        });

        let y = &x * &mask;
        self.mask = Some(mask);
        Ok(y)
    }

    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let Some(mask) = self.mask.take() else {
            return Ok(d);
        };

        if d.shape() != mask.shape() {
            return Err(MlErr::GradientShape {
                layer: "dropout",
                got: d.shape().to_vec(),
                expected: mask.shape().to_vec(),
            });
        }

        Ok(d * mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_is_identity() {
        let mut dropout = Dropout::new(0.5, 0);
        let x = ArrayD::from_elem(vec![4, 8], 2.0);
        assert_eq!(dropout.forward(x.clone(), false).unwrap(), x);
    }

    #[test]
    fn training_drops_and_rescales() {
        let mut dropout = Dropout::new(0.5, 7);
        let x = ArrayD::ones(vec![1000]);
        let y = dropout.forward(x, true).unwrap();

        assert!(y.iter().all(|&v| v == 0.0 || v == 2.0));
        let dropped = y.iter().filter(|&&v| v == 0.0).count();
        assert!((300..700).contains(&dropped), "dropped {dropped}");

        let dx = dropout.backward(ArrayD::ones(vec![1000])).unwrap();
        assert_eq!(dx, y);
    }
}
