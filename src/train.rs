use log::{debug, info};
use machine_learning::{
    arch::{DigitClassifier, Model, loss::CrossEntropy},
    optimization::Adam,
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;
use shard_loader::{CorruptMnist, DataLoader, Dataset, corrupt_mnist};

use crate::{PipelineErr, Result, checkpoint, config::TrainingConfig, plot};

/// The loss and accuracy of every training step, in the order the steps ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingStats {
    pub train_loss: Vec<f32>,
    pub train_accuracy: Vec<f32>,
}

/// Trains a `DigitClassifier` on the processed training split of `config.processed_dir`.
///
/// See `train_on` for what a run does and produces.
pub fn train(config: &TrainingConfig) -> Result<TrainingStats> {
    config.validate()?;
    let (train_set, _) = corrupt_mnist(&config.processed_dir)?;
    train_on(&train_set, config)
}

/// Trains a freshly initialized `DigitClassifier` on `dataset`.
///
/// Each epoch visits the samples in a new random order, running one Adam step per batch. When
/// training ends the parameters are saved to `config.model_path` and the per-step statistics
/// are plotted to `config.figure_path`.
///
/// # Arguments
/// * `dataset` - The training samples.
/// * `config` - The hyperparameters and artifact locations.
///
/// # Returns
/// The loss and accuracy recorded at each step.
pub fn train_on(dataset: &CorruptMnist, config: &TrainingConfig) -> Result<TrainingStats> {
    config.validate()?;
    if dataset.is_empty() {
        return Err(PipelineErr::EmptyDataset);
    }

    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    let mut rng = StdRng::seed_from_u64(seed);

    let mut model = DigitClassifier::new(rng.random());
    let mut params = model.init_params(&mut rng)?;
    let mut grad = vec![0.0; model.size()];
    let mut optimizer = Adam::with_defaults(model.size(), config.lr);
    let loss_fn = CrossEntropy::new();

    info!(
        seed = seed, samples = dataset.len(), params = params.len();
        "training for {} epochs with batch size {}",
        config.epochs, config.batch_size
    );

    let mut loader = DataLoader::new(dataset, config.batch_size);
    let mut stats = TrainingStats::default();
    let log_every = config.log_every.get();
    model.set_training(true);

    for epoch in 0..config.epochs.get() {
        loader.shuffle(&mut rng);

        while let Some(batch) = loader.next_batch() {
            let step = model.train_step(
                &mut params,
                &mut grad,
                &loss_fn,
                &mut optimizer,
                batch.images.into_dyn(),
                batch.targets.view(),
            )?;

            stats.train_loss.push(step.loss());
            stats.train_accuracy.push(step.accuracy());

            let steps = stats.train_loss.len();
            if steps % log_every == 0 {
                info!(
                    epoch = epoch, step = steps;
                    "loss: {:.4}, accuracy: {:.4}",
                    step.loss(), step.accuracy()
                );
            }
        }

        debug!(epoch = epoch; "finished epoch");
    }

    info!("training complete after {} steps", stats.train_loss.len());

    checkpoint::save(&config.model_path, &model, &params)?;
    plot::save_training_plot(&stats, &config.figure_path)?;
    Ok(stats)
}
