use ndarray::{Array2, ArrayView1, ArrayView2};

use super::LossFn;
use crate::{MlErr, Result};

/// Softmax cross entropy, averaged over the batch.
#[derive(Clone, Copy, Debug, Default)]
pub struct CrossEntropy;

impl CrossEntropy {
    pub fn new() -> Self {
        Self
    }
}

/// Computes a numerically stable log-softmax along each row.
fn log_softmax(logits: ArrayView2<f32>) -> Array2<f32> {
    let mut out = logits.to_owned();

    for mut row in out.rows_mut() {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        let log_sum = row.mapv(|v| (v - max).exp()).sum().ln() + max;
        row.mapv_inplace(|v| v - log_sum);
    }

    out
}

/// Checks the batch sizes agree and turns every target into a class index.
fn class_indices(logits: ArrayView2<f32>, targets: ArrayView1<i64>) -> Result<Vec<usize>> {
    if logits.nrows() != targets.len() {
        return Err(MlErr::SizeMismatch {
            what: "cross entropy batch",
            got: targets.len(),
            expected: logits.nrows(),
        });
    }

    let classes = logits.ncols();
    targets
        .iter()
        .map(|&target| match usize::try_from(target) {
            Ok(class) if class < classes => Ok(class),
            _ => Err(MlErr::InvalidTarget { target, classes }),
        })
        .collect()
}

impl LossFn for CrossEntropy {
    fn loss(&self, logits: ArrayView2<f32>, targets: ArrayView1<i64>) -> Result<f32> {
        let classes = class_indices(logits, targets)?;
        if classes.is_empty() {
            return Ok(0.0);
        }

        let log_probs = log_softmax(logits);
        let total: f32 = classes
            .iter()
            .enumerate()
            .map(|(i, &class)| -log_probs[[i, class]])
            .sum();

        Ok(total / classes.len() as f32)
    }

    fn loss_prime(&self, logits: ArrayView2<f32>, targets: ArrayView1<i64>) -> Result<Array2<f32>> {
        let classes = class_indices(logits, targets)?;
        let n = classes.len().max(1) as f32;

        let mut d = log_softmax(logits).mapv(f32::exp);
        for (i, &class) in classes.iter().enumerate() {
            d[[i, class]] -= 1.0;
        }

        d /= n;
        Ok(d)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn uniform_logits_give_log_of_classes() {
        let logits = Array2::<f32>::zeros((3, 10));
        let loss = CrossEntropy.loss(logits.view(), array![0, 4, 9].view()).unwrap();
        assert_abs_diff_eq!(loss, 10f32.ln(), epsilon = 1e-5);
    }

    #[test]
    fn large_logits_stay_finite() {
        let logits = array![[1000.0, -1000.0], [-1000.0, 1000.0]];
        let loss = CrossEntropy.loss(logits.view(), array![0, 1].view()).unwrap();
        assert!(loss.is_finite());
        assert_abs_diff_eq!(loss, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let mut logits = array![[0.2, -0.4, 1.0], [0.5, 0.1, -0.3]];
        let targets = array![2, 0];
        let d = CrossEntropy
            .loss_prime(logits.view(), targets.view())
            .unwrap();

        let eps = 1e-3;
        for i in 0..2 {
            for j in 0..3 {
                let orig = logits[[i, j]];
                logits[[i, j]] = orig + eps;
                let up = CrossEntropy.loss(logits.view(), targets.view()).unwrap();
                logits[[i, j]] = orig - eps;
                let down = CrossEntropy.loss(logits.view(), targets.view()).unwrap();
                logits[[i, j]] = orig;

                assert_abs_diff_eq!(d[[i, j]], (up - down) / (2.0 * eps), epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn out_of_range_targets_are_rejected() {
        let logits = Array2::<f32>::zeros((2, 10));
        for bad in [-1, 10] {
            let err = CrossEntropy
                .loss(logits.view(), array![0, bad].view())
                .unwrap_err();
            assert!(matches!(err, MlErr::InvalidTarget { classes: 10, .. }));
        }
    }
}
