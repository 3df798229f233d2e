use ndarray::{Array2, ArrayD};
use rand::Rng;

use super::{Model, Sequential, layers::Layer};
use crate::{MlErr, Result};

/// The number of digit classes the classifier scores.
pub const NUM_CLASSES: usize = 10;

/// The shape every input sample must have: one channel of 28x28 pixels.
pub const SAMPLE_SHAPE: [usize; 3] = [1, 28, 28];

/// The dropout probability applied before the classification head.
const DROPOUT: f32 = 0.5;

/// A convolutional classifier for single-channel 28x28 digit images.
///
/// Three `conv 3x3 -> relu -> max pool 2x2` blocks with 32, 64 and 128 channels shrink each
/// image to a 128 feature vector, which goes through dropout and a dense layer producing one
/// logit per class.
#[derive(Clone, Debug)]
pub struct DigitClassifier {
    net: Sequential,
}

impl DigitClassifier {
    /// Creates a new `DigitClassifier`.
    ///
    /// # Arguments
    /// * `seed` - Seeds the dropout masks.
    pub fn new(seed: u64) -> Self {
        let net = Sequential::new([
            Layer::conv2d(1, 32, 3),
            Layer::relu(),
            Layer::max_pool2d(2),
            Layer::conv2d(32, 64, 3),
            Layer::relu(),
            Layer::max_pool2d(2),
            Layer::conv2d(64, 128, 3),
            Layer::relu(),
            Layer::max_pool2d(2),
            Layer::dropout(DROPOUT, seed),
            Layer::flatten(),
            Layer::dense((128, NUM_CLASSES)),
        ]);

        Self { net }
    }

    pub fn is_training(&self) -> bool {
        self.net.is_training()
    }

    fn validate_input(x: &ArrayD<f32>) -> Result<()> {
        if x.ndim() != 4 {
            return Err(MlErr::InvalidInputRank {
                got: x.ndim(),
                expected: 4,
            });
        }

        if x.shape()[1..] != SAMPLE_SHAPE {
            return Err(MlErr::InvalidInputShape {
                got: x.shape()[1..].to_vec(),
                expected: SAMPLE_SHAPE.to_vec(),
            });
        }

        Ok(())
    }
}

impl Default for DigitClassifier {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Model for DigitClassifier {
    fn size(&self) -> usize {
        self.net.size()
    }

    fn param_shapes(&self) -> Vec<(String, Vec<usize>)> {
        self.net.param_shapes()
    }

    fn init_params<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<f32>> {
        self.net.init_params(rng)
    }

    fn set_training(&mut self, training: bool) {
        self.net.set_training(training);
    }

    fn forward(&mut self, params: &[f32], x: ArrayD<f32>) -> Result<Array2<f32>> {
        Self::validate_input(&x)?;
        self.net.forward(params, x)
    }

    fn backward(&mut self, params: &[f32], grad: &mut [f32], d: Array2<f32>) -> Result<()> {
        self.net.backward(params, grad, d)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn single_image_yields_ten_logits() {
        let mut model = DigitClassifier::new(0);
        let params = model.init_params(&mut StdRng::seed_from_u64(0)).unwrap();
        model.set_training(false);

        let logits = model
            .forward(&params, ArrayD::zeros(vec![1, 1, 28, 28]))
            .unwrap();
        assert_eq!(logits.shape(), &[1, NUM_CLASSES]);
    }

    #[test]
    fn rank_other_than_four_is_rejected() {
        let mut model = DigitClassifier::new(0);
        let params = vec![0.0; model.size()];

        let err = model
            .forward(&params, ArrayD::zeros(vec![1, 28, 28]))
            .unwrap_err();
        assert!(matches!(err, MlErr::InvalidInputRank { got: 3, expected: 4 }));
        assert!(err.to_string().contains("4D tensor"));
    }

    #[test]
    fn wrong_sample_shape_is_rejected() {
        let mut model = DigitClassifier::new(0);
        let params = vec![0.0; model.size()];

        let err = model
            .forward(&params, ArrayD::zeros(vec![2, 3, 28, 28]))
            .unwrap_err();
        assert!(matches!(err, MlErr::InvalidInputShape { .. }));
        assert!(err.to_string().contains("[1, 28, 28]"));
    }

    #[test]
    fn parameter_layout_matches_architecture() {
        let model = DigitClassifier::default();
        let shapes = model.param_shapes();

        assert_eq!(shapes.len(), 8);
        assert_eq!(shapes[0], ("layers.0.weight".to_string(), vec![32, 1, 3, 3]));
        assert_eq!(shapes[7], ("layers.11.bias".to_string(), vec![NUM_CLASSES]));

        let total: usize = shapes.iter().map(|(_, s)| s.iter().product::<usize>()).sum();
        assert_eq!(total, model.size());
    }

    #[test]
    fn training_mode_is_toggled() {
        let mut model = DigitClassifier::new(0);
        assert!(model.is_training());
        model.set_training(false);
        assert!(!model.is_training());
    }
}
