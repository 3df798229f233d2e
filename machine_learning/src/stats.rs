/// Statistics produced by a single training step over one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepStats {
    loss: f32,
    correct: usize,
    samples: usize,
}

impl StepStats {
    /// Creates a new `StepStats`.
    ///
    /// # Args
    /// * `loss` - The mean loss over the batch.
    /// * `correct` - How many samples of the batch were classified correctly.
    /// * `samples` - The size of the batch.
    pub fn new(loss: f32, correct: usize, samples: usize) -> Self {
        Self {
            loss,
            correct,
            samples,
        }
    }

    /// Returns the mean loss over the batch.
    pub fn loss(&self) -> f32 {
        self.loss
    }

    /// Returns the number of samples processed in the step.
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn correct(&self) -> usize {
        self.correct
    }

    /// Returns the fraction of the batch classified correctly, or `0.0` for an empty batch.
    pub fn accuracy(&self) -> f32 {
        if self.samples == 0 {
            return 0.0;
        }

        self.correct as f32 / self.samples as f32
    }
}
