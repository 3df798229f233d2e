use ndarray::{Array2, ArrayD, ArrayView1};
use rand::Rng;

use super::loss::LossFn;
use crate::{Result, metrics, optimization::Optimizer, stats::StepStats};

/// A trainable model whose parameters live outside of it, in a flat `f32` buffer.
pub trait Model {
    /// Returns the amount of parameters in the model.
    fn size(&self) -> usize;

    /// Returns the name and shape of every parameter tensor, in buffer order.
    fn param_shapes(&self) -> Vec<(String, Vec<usize>)>;

    /// Creates a freshly initialized parameter buffer of length `size()`.
    fn init_params<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<f32>>;

    /// Toggles the layers that behave differently while training, such as dropout.
    fn set_training(&mut self, training: bool);

    /// Makes a forward pass, returning the logits `[n, classes]` for the batch `x`.
    fn forward(&mut self, params: &[f32], x: ArrayD<f32>) -> Result<Array2<f32>>;

    /// Propagates the gradient of the loss with respect to the last logits back through the
    /// model, writing the parameter gradient into `grad`.
    fn backward(&mut self, params: &[f32], grad: &mut [f32], d: Array2<f32>) -> Result<()>;

    /// Runs one optimization step over a batch. **`params` gets updated** according to the
    /// optimization algorithm.
    ///
    /// # Arguments
    /// * `params` - The model's parameters.
    /// * `grad` - A buffer for writing the computed gradient.
    /// * `loss_fn` - The loss function.
    /// * `optimizer` - The optimizer that dictates how to update the parameters.
    /// * `x` - The batch inputs.
    /// * `y` - The batch targets.
    ///
    /// # Returns
    /// The loss and accuracy of the batch, measured before the update.
    fn train_step<L, O>(
        &mut self,
        params: &mut [f32],
        grad: &mut [f32],
        loss_fn: &L,
        optimizer: &mut O,
        x: ArrayD<f32>,
        y: ArrayView1<i64>,
    ) -> Result<StepStats>
    where
        L: LossFn,
        O: Optimizer,
    {
        grad.fill(0.0);

        let logits = self.forward(params, x)?;
        let loss = loss_fn.loss(logits.view(), y)?;
        let correct = metrics::correct_predictions(logits.view(), y);
        let d = loss_fn.loss_prime(logits.view(), y)?;

        self.backward(params, grad, d)?;
        optimizer.update_params(params, grad);

        Ok(StepStats::new(loss, correct, y.len()))
    }
}
