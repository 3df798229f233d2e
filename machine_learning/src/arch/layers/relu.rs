use ndarray::ArrayD;

use crate::{MlErr, Result};

/// The rectified linear unit, `max(0, x)`.
#[derive(Clone, Debug, Default)]
pub struct Relu {
    x: Option<ArrayD<f32>>,
}

impl Relu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward(&mut self, x: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let y = x.mapv(|v| v.max(0.0));
        self.x = Some(x);
        Ok(y)
    }

    pub fn backward(&mut self, mut d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let x = self
            .x
            .take()
            .ok_or(MlErr::BackwardBeforeForward { layer: "relu" })?;
        if d.shape() != x.shape() {
            return Err(MlErr::GradientShape {
                layer: "relu",
                got: d.shape().to_vec(),
                expected: x.shape().to_vec(),
            });
        }

        d.zip_mut_with(&x, |d, &x| {
            if x <= 0.0 {
                *d = 0.0;
            }
        });

        Ok(d)
    }
}
