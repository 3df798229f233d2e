/// An algorithm that turns a gradient into a parameter update.
pub trait Optimizer {
    /// Applies one update step to `params` given their `grad`.
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]);
}
