use ndarray::{ArrayView1, ArrayView2, Axis};

/// Returns the index of the largest logit on each row. Ties resolve to the lowest index.
pub fn argmax(logits: ArrayView2<f32>) -> Vec<usize> {
    logits
        .axis_iter(Axis(0))
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (i, &v)| {
                    if v > best.1 { (i, v) } else { best }
                })
                .0
        })
        .collect()
}

/// Counts the rows of `logits` whose argmax equals the row's target.
pub fn correct_predictions(logits: ArrayView2<f32>, targets: ArrayView1<i64>) -> usize {
    argmax(logits)
        .into_iter()
        .zip(targets)
        .filter(|&(pred, &target)| i64::try_from(pred).is_ok_and(|p| p == target))
        .count()
}

/// Returns the fraction of rows predicted correctly, or `0.0` for an empty batch.
pub fn accuracy(logits: ArrayView2<f32>, targets: ArrayView1<i64>) -> f32 {
    if targets.is_empty() {
        return 0.0;
    }

    correct_predictions(logits, targets) as f32 / targets.len() as f32
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn argmax_picks_largest_logit() {
        let logits = array![[0.1, 0.9, 0.0], [3.0, -1.0, 2.0], [1.0, 1.0, 0.0]];
        assert_eq!(argmax(logits.view()), vec![1, 0, 0]);
    }

    #[test]
    fn accuracy_counts_matching_rows() {
        let logits = array![[0.1, 0.9], [3.0, -1.0], [0.0, 2.0], [5.0, 4.0]];
        let targets = array![1, 0, 0, 1];
        assert_eq!(correct_predictions(logits.view(), targets.view()), 2);
        assert_eq!(accuracy(logits.view(), targets.view()), 0.5);
    }
}
