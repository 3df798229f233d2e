use super::Optimizer;

/// The Adam optimization algorithm, with bias corrected moment estimates.
#[derive(Clone, Debug)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    beta1_t: f32,
    beta2_t: f32,
    v: Box<[f32]>,
    s: Box<[f32]>,
    epsilon: f32,
}

impl Adam {
    /// Creates a new `Adam` with explicit hyperparameters.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters being optimized.
    /// * `learning_rate` - The base step size.
    /// * `beta1` - Decay rate of the first moment estimate.
    /// * `beta2` - Decay rate of the second moment estimate.
    /// * `epsilon` - Added to the denominator for stability.
    pub fn new(len: usize, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            beta1_t: 1.,
            beta2_t: 1.,
            v: vec![0.; len].into_boxed_slice(),
            s: vec![0.; len].into_boxed_slice(),
            epsilon,
        }
    }

    /// Creates a new `Adam` with `beta1 = 0.9`, `beta2 = 0.999` and `epsilon = 1e-8`.
    pub fn with_defaults(len: usize, learning_rate: f32) -> Self {
        Self::new(len, learning_rate, 0.9, 0.999, 1e-8)
    }
}

impl Optimizer for Adam {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) {
        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = *self;

        self.beta1_t *= b1;
        self.beta2_t *= b2;

        let bc1 = 1. - self.beta1_t;
        let bc2 = 1. - self.beta2_t;
        let step_size = lr * (bc2.sqrt() / bc1);
        let eps_hat = eps * bc2.sqrt();

        params
            .iter_mut()
            .zip(grad)
            .zip(self.v.iter_mut())
            .zip(self.s.iter_mut())
            .for_each(|(((w, g), v), s)| {
                *v = b1 * *v + (1. - b1) * g;
                *s = b2 * *s + (1. - b2) * g.powi(2);
                *w -= step_size * *v / (s.sqrt() + eps_hat);
            });
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn first_step_moves_each_param_by_learning_rate() {
        let mut adam = Adam::with_defaults(3, 0.01);
        let mut params = [1.0, 1.0, 1.0];
        adam.update_params(&mut params, &[0.5, -2.0, 0.0]);

        assert_abs_diff_eq!(params[0], 0.99, epsilon = 1e-5);
        assert_abs_diff_eq!(params[1], 1.01, epsilon = 1e-5);
        assert_abs_diff_eq!(params[2], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn minimizes_a_quadratic() {
        let mut adam = Adam::with_defaults(1, 0.1);
        let mut params = [5.0f32];
        for _ in 0..500 {
            let grad = [2.0 * (params[0] - 1.0)];
            adam.update_params(&mut params, &grad);
        }

        assert_abs_diff_eq!(params[0], 1.0, epsilon = 5e-2);
    }
}
