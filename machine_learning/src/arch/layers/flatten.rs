use ndarray::{ArrayD, IxDyn};

use crate::{MlErr, Result};

/// Collapses every axis but the first, turning `[n, ...]` into `[n, features]`.
#[derive(Clone, Debug, Default)]
pub struct Flatten {
    input_shape: Option<Vec<usize>>,
}

impl Flatten {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward(&mut self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let shape = x.shape().to_vec();
        let n = shape.first().copied().unwrap_or(1);
        let features: usize = shape.iter().skip(1).product();

        let y = x
            .as_standard_layout()
            .into_owned()
            .into_shape_with_order(IxDyn(&[n, features]))?;

        self.input_shape = Some(shape);
        Ok(y)
    }

    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let shape = self
            .input_shape
            .take()
            .ok_or(MlErr::BackwardBeforeForward { layer: "flatten" })?;

        Ok(d.as_standard_layout()
            .into_owned()
            .into_shape_with_order(IxDyn(&shape))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_keeps_batch_axis_and_restores_shape() {
        let mut flatten = Flatten::new();
        let x = ArrayD::from_shape_fn(vec![2, 3, 1, 1], |ix| ix[1] as f32);

        let y = flatten.forward(x.clone()).unwrap();
        assert_eq!(y.shape(), &[2, 3]);

        let dx = flatten.backward(y).unwrap();
        assert_eq!(dx, x);
    }
}
