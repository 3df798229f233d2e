use std::{num::NonZeroUsize, path::PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;

use corrupt_mnist::{TrainingConfig, evaluate, train};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate and merge the raw shards, normalize them and save the processed tensors.
    Preprocess {
        #[arg(default_value = "data/raw")]
        raw_dir: PathBuf,
        #[arg(default_value = "data/processed")]
        processed_dir: PathBuf,
    },
    /// Train the digit classifier on the processed training split.
    Train {
        /// A JSON file with training settings; flags override its values.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        epochs: Option<NonZeroUsize>,
        #[arg(long)]
        batch_size: Option<NonZeroUsize>,
        #[arg(long)]
        lr: Option<f32>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Report the accuracy of a trained model on the processed test split.
    Evaluate {
        model_path: PathBuf,
        #[arg(long, default_value = "data/processed")]
        processed_dir: PathBuf,
        #[arg(long, default_value = "32")]
        batch_size: NonZeroUsize,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    match Args::parse().command {
        Command::Preprocess {
            raw_dir,
            processed_dir,
        } => {
            shard_loader::preprocess_data(&raw_dir, &processed_dir)
                .with_context(|| format!("failed to preprocess {}", raw_dir.display()))?;
        }
        Command::Train {
            config,
            epochs,
            batch_size,
            lr,
            seed,
        } => {
            let mut cfg = match config {
                Some(path) => TrainingConfig::from_json_file(&path)?,
                None => TrainingConfig::default(),
            };

            if let Some(epochs) = epochs {
                cfg.epochs = epochs;
            }
            if let Some(batch_size) = batch_size {
                cfg.batch_size = batch_size;
            }
            if let Some(lr) = lr {
                cfg.lr = lr;
            }
            if seed.is_some() {
                cfg.seed = seed;
            }

            let stats = train(&cfg).context("training failed")?;
            if let (Some(loss), Some(accuracy)) =
                (stats.train_loss.last(), stats.train_accuracy.last())
            {
                info!("final step loss: {loss:.4}, accuracy: {accuracy:.4}");
            }
        }
        Command::Evaluate {
            model_path,
            processed_dir,
            batch_size,
        } => {
            let accuracy = evaluate(&model_path, &processed_dir, batch_size)
                .with_context(|| format!("failed to evaluate {}", model_path.display()))?;
            println!("Test accuracy: {accuracy}");
        }
    }

    Ok(())
}
