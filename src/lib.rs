//! The corrupt MNIST pipeline: preprocess the sharded raw tensors, train a convolutional digit
//! classifier on them and evaluate it on the test split.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod plot;
pub mod train;

pub use config::TrainingConfig;
pub use error::{PipelineErr, Result};
pub use evaluate::{evaluate, evaluate_on};
pub use plot::save_training_plot;
pub use train::{TrainingStats, train, train_on};
