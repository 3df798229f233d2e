use ndarray::ArrayD;
use rand::Rng;

use super::{Conv2d, Dense, Dropout, Flatten, MaxPool2d, Relu};
use crate::Result;

/// A layer of a sequential network.
///
/// Parametric layers read their weights from the slice handed to them on each pass; the rest
/// have a size of zero and ignore it.
#[derive(Clone, Debug)]
pub enum Layer {
    Conv2d(Conv2d),
    MaxPool2d(MaxPool2d),
    Relu(Relu),
    Dropout(Dropout),
    Flatten(Flatten),
    Dense(Dense),
}
use Layer::*;

impl Layer {
    pub fn conv2d(in_channels: usize, out_channels: usize, kernel: usize) -> Self {
        Self::Conv2d(Conv2d::new(in_channels, out_channels, kernel))
    }

    pub fn max_pool2d(size: usize) -> Self {
        Self::MaxPool2d(MaxPool2d::new(size))
    }

    pub fn relu() -> Self {
        Self::Relu(Relu::new())
    }

    pub fn dropout(p: f32, seed: u64) -> Self {
        Self::Dropout(Dropout::new(p, seed))
    }

    pub fn flatten() -> Self {
        Self::Flatten(Flatten::new())
    }

    pub fn dense(dim: (usize, usize)) -> Self {
        Self::Dense(Dense::new(dim))
    }

    /// Returns the amount of parameters this layer reads from its slice.
    pub fn size(&self) -> usize {
        match self {
            Conv2d(l) => l.size(),
            Dense(l) => l.size(),
            MaxPool2d(_) | Relu(_) | Dropout(_) | Flatten(_) => 0,
        }
    }

    /// Returns the name and shape of each tensor packed in this layer's parameter slice.
    pub fn param_shapes(&self) -> Vec<(&'static str, Vec<usize>)> {
        match self {
            Conv2d(l) => l.param_shapes(),
            Dense(l) => l.param_shapes(),
            MaxPool2d(_) | Relu(_) | Dropout(_) | Flatten(_) => Vec::new(),
        }
    }

    pub fn init_params<R: Rng + ?Sized>(&self, params: &mut [f32], rng: &mut R) -> Result<()> {
        match self {
            Conv2d(l) => l.init_params(params, rng),
            Dense(l) => l.init_params(params, rng),
            MaxPool2d(_) | Relu(_) | Dropout(_) | Flatten(_) => Ok(()),
        }
    }

    /// Makes a forward pass through the layer.
    ///
    /// # Arguments
    /// * `params` - This layer's slice of the model parameters.
    /// * `x` - The layer's input.
    /// * `training` - Whether the pass is part of a training step.
    ///
    /// # Returns
    /// The layer's output or an error if the input doesn't fit it.
    pub fn forward(&mut self, params: &[f32], x: ArrayD<f32>, training: bool) -> Result<ArrayD<f32>> {
        match self {
            Conv2d(l) => l.forward(params, x),
            MaxPool2d(l) => l.forward(x),
            Relu(l) => l.forward(x),
            Dropout(l) => l.forward(x, training),
            Flatten(l) => l.forward(x),
            Dense(l) => l.forward(params, x),
        }
    }

    /// Propagates `d`, the gradient of the loss with respect to this layer's output, backwards.
    ///
    /// # Arguments
    /// * `params` - This layer's slice of the model parameters.
    /// * `grad` - This layer's slice of the gradient buffer, overwritten with its gradient.
    /// * `d` - The gradient with respect to the output of the last forward pass.
    ///
    /// # Returns
    /// The gradient with respect to this layer's input.
    pub fn backward(&mut self, params: &[f32], grad: &mut [f32], d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        match self {
            Conv2d(l) => l.backward(params, grad, d),
            MaxPool2d(l) => l.backward(d),
            Relu(l) => l.backward(d),
            Dropout(l) => l.backward(d),
            Flatten(l) => l.backward(d),
            Dense(l) => l.backward(params, grad, d),
        }
    }
}
