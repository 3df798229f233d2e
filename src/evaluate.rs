use std::{num::NonZeroUsize, path::Path};

use log::info;
use machine_learning::{
    arch::{DigitClassifier, Model},
    metrics,
};
use shard_loader::{CorruptMnist, DataLoader, Dataset, SplitKind};

use crate::{Result, checkpoint};

/// Scores a saved `DigitClassifier` on the processed test split.
///
/// # Arguments
/// * `model_path` - The checkpoint written by training.
/// * `processed_dir` - The directory holding the processed test tensors.
/// * `batch_size` - How many samples to run through the model at once.
///
/// # Returns
/// The fraction of test samples classified correctly.
pub fn evaluate(model_path: &Path, processed_dir: &Path, batch_size: NonZeroUsize) -> Result<f32> {
    let mut model = DigitClassifier::default();
    let params = checkpoint::load(model_path, &model)?;
    let test_set = CorruptMnist::from_processed(processed_dir, SplitKind::Test)?;

    let accuracy = evaluate_on(&mut model, &params, &test_set, batch_size)?;
    info!(samples = test_set.len(); "test accuracy: {accuracy:.4}");
    Ok(accuracy)
}

/// Runs `model` in evaluation mode over `dataset` and returns its accuracy, `0.0` when the
/// dataset is empty.
pub fn evaluate_on<M: Model>(
    model: &mut M,
    params: &[f32],
    dataset: &CorruptMnist,
    batch_size: NonZeroUsize,
) -> Result<f32> {
    model.set_training(false);

    let mut correct = 0;
    let mut total = 0;
    for batch in DataLoader::new(dataset, batch_size) {
        let logits = model.forward(params, batch.images.into_dyn())?;
        correct += metrics::correct_predictions(logits.view(), batch.targets.view());
        total += batch.targets.len();
    }

    if total == 0 {
        return Ok(0.0);
    }

    Ok(correct as f32 / total as f32)
}
