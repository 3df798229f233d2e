use std::{num::NonZeroUsize, path::Path};

use approx::assert_abs_diff_eq;
use machine_learning::arch::{DigitClassifier, Model, Sequential, layers::Layer};
use ndarray::{Array1, Array3};
use rand::{SeedableRng, rngs::StdRng};
use shard_loader::{CorruptMnist, Split, SplitKind, preprocess};

use corrupt_mnist::{
    PipelineErr, TrainingConfig, checkpoint, evaluate, evaluate_on, train, train_on,
};

fn tiny_split(n: usize) -> Split {
    let images = Array3::from_shape_fn((n, 28, 28), |(i, j, k)| {
        ((i * 31 + j * 7 + k * 3) % 17) as f32 / 8.0 - 1.0
    });
    let targets = Array1::from_iter((0..n).map(|i| (i % 10) as i64));
    Split::new(images, targets).unwrap()
}

fn config_in(root: &Path) -> TrainingConfig {
    TrainingConfig {
        processed_dir: root.join("data/processed"),
        model_path: root.join("models/model.safetensors"),
        figure_path: root.join("reports/figures/training_statistics.png"),
        epochs: NonZeroUsize::new(1).unwrap(),
        batch_size: NonZeroUsize::new(4).unwrap(),
        seed: Some(0),
        ..Default::default()
    }
}

#[test]
fn one_epoch_writes_model_and_figure() {
    let root = tempfile::tempdir().unwrap();
    let config = config_in(root.path());
    let dataset = CorruptMnist::new(tiny_split(8));

    let stats = train_on(&dataset, &config).unwrap();

    assert_eq!(stats.train_loss.len(), 2);
    assert_eq!(stats.train_accuracy.len(), 2);
    assert!(stats.train_loss.iter().all(|l| l.is_finite()));
    assert!(config.model_path.is_file());
    assert!(config.figure_path.is_file());
}

#[test]
fn train_then_evaluate_from_processed_dir() {
    let root = tempfile::tempdir().unwrap();
    let config = config_in(root.path());
    std::fs::create_dir_all(&config.processed_dir).unwrap();
    preprocess::save_split(&config.processed_dir, SplitKind::Train, &tiny_split(8)).unwrap();
    preprocess::save_split(&config.processed_dir, SplitKind::Test, &tiny_split(6)).unwrap();

    train(&config).unwrap();
    let accuracy = evaluate(
        &config.model_path,
        &config.processed_dir,
        NonZeroUsize::new(4).unwrap(),
    )
    .unwrap();

    assert!((0.0..=1.0).contains(&accuracy));
}

#[test]
fn evaluation_counts_correct_predictions_across_batches() {
    // Zero weights leave the bias as the logits, so every sample is predicted as class 3.
    let mut model = Sequential::new([Layer::flatten(), Layer::dense((784, 10))]);
    let mut params = vec![0.0; model.size()];
    params[784 * 10 + 3] = 1.0;
    let dataset = CorruptMnist::new(tiny_split(6));

    let accuracy =
        evaluate_on(&mut model, &params, &dataset, NonZeroUsize::new(4).unwrap()).unwrap();

    assert_abs_diff_eq!(accuracy, 1.0 / 6.0, epsilon = 1e-6);
}

#[test]
fn empty_dataset_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let config = config_in(root.path());
    let dataset = CorruptMnist::new(tiny_split(0));

    let err = train_on(&dataset, &config).unwrap_err();
    assert!(matches!(err, PipelineErr::EmptyDataset));
    assert!(!config.model_path.exists());
}

#[test]
fn checkpoint_round_trip_restores_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/model.safetensors");
    let model = DigitClassifier::new(0);
    let params = model.init_params(&mut StdRng::seed_from_u64(3)).unwrap();

    checkpoint::save(&path, &model, &params).unwrap();
    let loaded = checkpoint::load(&path, &model).unwrap();

    assert_eq!(loaded, params);
}

#[test]
fn checkpoint_for_another_layout_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mlp.safetensors");
    let mlp = Sequential::new([Layer::flatten(), Layer::dense((784, 10))]);
    let params = vec![0.5; mlp.size()];
    checkpoint::save(&path, &mlp, &params).unwrap();

    let err = checkpoint::load(&path, &DigitClassifier::default()).unwrap_err();
    assert!(matches!(err, PipelineErr::CheckpointLayout { .. }), "got {err:?}");
}
