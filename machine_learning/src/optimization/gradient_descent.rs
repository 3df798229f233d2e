use super::Optimizer;

/// Plain gradient descent: `w <- w - lr * g`.
#[derive(Clone, Copy, Debug)]
pub struct GradientDescent {
    learning_rate: f32,
}

impl GradientDescent {
    /// Creates a new `GradientDescent`.
    ///
    /// # Arguments
    /// * `learning_rate` - The step size applied to the gradient.
    pub fn new(learning_rate: f32) -> Self {
        Self { learning_rate }
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }
}

impl Optimizer for GradientDescent {
    fn update_params(&mut self, params: &mut [f32], grad: &[f32]) {
        params
            .iter_mut()
            .zip(grad)
            .for_each(|(w, g)| *w -= self.learning_rate * g);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_against_the_gradient() {
        let mut gd = GradientDescent::new(0.5);
        let mut params = [1.0, -1.0];
        gd.update_params(&mut params, &[2.0, -4.0]);
        assert_eq!(params, [0.0, 1.0]);
    }
}
