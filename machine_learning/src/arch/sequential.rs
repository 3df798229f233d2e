use log::debug;
use ndarray::{Array2, ArrayD, Ix2};
use rand::Rng;

use super::{Model, layers::Layer};
use crate::{MlErr, Result};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// Layer `i` reads the parameters right after those of layers `0..i` in the flat buffer.
#[derive(Clone, Debug)]
pub struct Sequential {
    layers: Vec<Layer>,
    training: bool,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance, in training mode.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        Self {
            layers: layers.into_iter().collect(),
            training: true,
        }
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    fn check_len(&self, what: &'static str, len: usize) -> Result<()> {
        let expected = self.size();
        if len != expected {
            return Err(MlErr::SizeMismatch {
                what,
                got: len,
                expected,
            });
        }

        Ok(())
    }
}

impl Model for Sequential {
    fn size(&self) -> usize {
        self.layers.iter().map(|layer| layer.size()).sum()
    }

    fn param_shapes(&self) -> Vec<(String, Vec<usize>)> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(i, layer)| {
                layer
                    .param_shapes()
                    .into_iter()
                    .map(move |(name, shape)| (format!("layers.{i}.{name}"), shape))
            })
            .collect()
    }

    fn init_params<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<f32>> {
        let mut params = vec![0.0; self.size()];
        let mut rest = params.as_mut_slice();

        for layer in &self.layers {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(layer.size());
            layer.init_params(head, rng)?;
            rest = tail;
        }

        debug!(layers = self.layers.len(), params = params.len(); "initialized parameters");
        Ok(params)
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn forward(&mut self, params: &[f32], x: ArrayD<f32>) -> Result<Array2<f32>> {
        self.check_len("parameters", params.len())?;

        let mut rest = params;
        let mut x = x;

        for layer in self.layers.iter_mut() {
            let (head, tail) = rest.split_at(layer.size());
            x = layer.forward(head, x, self.training)?;
            rest = tail;
        }

        Ok(x.into_dimensionality::<Ix2>()?)
    }

    fn backward(&mut self, params: &[f32], grad: &mut [f32], d: Array2<f32>) -> Result<()> {
        self.check_len("parameters", params.len())?;
        self.check_len("gradient", grad.len())?;

        let mut end = params.len();
        let mut d = d.into_dyn();

        for layer in self.layers.iter_mut().rev() {
            let start = end - layer.size();
            d = layer.backward(&params[start..end], &mut grad[start..end], d)?;
            end = start;
        }

        Ok(())
    }
}
