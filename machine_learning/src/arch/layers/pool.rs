use ndarray::{ArrayD, Ix4, prelude::*};

use crate::{MlErr, Result};

/// A 2D max pooling layer whose stride equals its window size.
///
/// Trailing rows and columns that don't fill a whole window are dropped.
#[derive(Clone, Debug)]
pub struct MaxPool2d {
    size: usize,

    // Forward metadata: input shape plus the flat position of each window's maximum.
    input_dim: Option<(usize, usize, usize, usize)>,
    argmax: Array4<usize>,
}

impl MaxPool2d {
    /// Creates a new `MaxPool2d`.
    ///
    /// # Arguments
    /// * `size` - The side of the square pooling window.
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            input_dim: None,
            argmax: Array4::zeros((0, 0, 0, 0)),
        }
    }

    pub fn forward(&mut self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let x = x.into_dimensionality::<Ix4>()?;
        let (n, c, h, w) = x.dim();
        let p = self.size;
        let (oh, ow) = (h / p, w / p);

        let mut y = Array4::from_elem((n, c, oh, ow), f32::NEG_INFINITY);
        let mut argmax = Array4::zeros((n, c, oh, ow));

        for ((b, ch, i, j), out) in y.indexed_iter_mut() {
            // A window with no value above -inf routes its gradient to its own origin.
            argmax[[b, ch, i, j]] = i * p * w + j * p;
            for di in 0..p {
                for dj in 0..p {
                    let (r, col) = (i * p + di, j * p + dj);
                    let v = x[[b, ch, r, col]];
                    if v > *out {
                        *out = v;
                        argmax[[b, ch, i, j]] = r * w + col;
                    }
                }
            }
        }

        self.input_dim = Some((n, c, h, w));
        self.argmax = argmax;
        Ok(y.into_dyn())
    }

    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let (n, c, h, w) = self
            .input_dim
            .take()
            .ok_or(MlErr::BackwardBeforeForward { layer: "max_pool2d" })?;
        let d = d.into_dimensionality::<Ix4>()?;
        if d.dim() != self.argmax.dim() {
            return Err(MlErr::GradientShape {
                layer: "max_pool2d",
                got: d.shape().to_vec(),
                expected: self.argmax.shape().to_vec(),
            });
        }

        let mut dx = Array4::zeros((n, c, h, w));
        for ((b, ch, i, j), &pos) in self.argmax.indexed_iter() {
            dx[[b, ch, pos / w, pos % w]] += d[[b, ch, i, j]];
        }

        Ok(dx.into_dyn())
    }
}
