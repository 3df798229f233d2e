use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::Result;

/// A loss over a batch of logits `[n, classes]` and their integer class targets `[n]`.
pub trait LossFn {
    /// Returns the mean loss over the batch.
    fn loss(&self, logits: ArrayView2<f32>, targets: ArrayView1<i64>) -> Result<f32>;

    /// Returns the gradient of `loss` with respect to `logits`.
    fn loss_prime(&self, logits: ArrayView2<f32>, targets: ArrayView1<i64>) -> Result<Array2<f32>>;
}
