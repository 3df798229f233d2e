use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

use image::ImageError;
use machine_learning::MlErr;
use safetensors::SafeTensorError;
use shard_loader::DataErr;

/// The result type used across the pipeline.
pub type Result<T> = std::result::Result<T, PipelineErr>;

/// All errors that can occur while preparing data, training or evaluating.
#[derive(Debug)]
pub enum PipelineErr {
    /// Loading, validating or persisting the dataset failed.
    Data(DataErr),
    /// The model rejected its input or parameters.
    Ml(MlErr),
    /// A configuration file couldn't be parsed.
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// A configuration value is out of range.
    InvalidConfig(String),
    /// A checkpoint file couldn't be read or written.
    Checkpoint {
        path: PathBuf,
        source: SafeTensorError,
    },
    /// A checkpoint doesn't match the parameter layout of the model.
    CheckpointLayout { path: PathBuf, msg: String },
    /// Training was asked to run over a dataset without samples.
    EmptyDataset,
    /// There is nothing to plot or the plot couldn't be encoded.
    Plot(String),
    Image(ImageError),
    Io(io::Error),
}

impl Display for PipelineErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(e) => write!(f, "data error: {e}"),
            Self::Ml(e) => write!(f, "model error: {e}"),
            Self::Config { path, source } => {
                write!(f, "invalid config file {}: {source}", path.display())
            }
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::Checkpoint { path, source } => {
                write!(f, "checkpoint {} failed: {source}", path.display())
            }
            Self::CheckpointLayout { path, msg } => {
                write!(f, "checkpoint {} doesn't fit the model: {msg}", path.display())
            }
            Self::EmptyDataset => write!(f, "the training dataset has no samples"),
            Self::Plot(msg) => write!(f, "plot error: {msg}"),
            Self::Image(e) => write!(f, "image error: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for PipelineErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Data(e) => Some(e),
            Self::Ml(e) => Some(e),
            Self::Config { source, .. } => Some(source),
            Self::Checkpoint { source, .. } => Some(source),
            Self::Image(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::InvalidConfig(_)
            | Self::CheckpointLayout { .. }
            | Self::EmptyDataset
            | Self::Plot(_) => None,
        }
    }
}

impl From<DataErr> for PipelineErr {
    fn from(e: DataErr) -> Self {
        Self::Data(e)
    }
}

impl From<MlErr> for PipelineErr {
    fn from(e: MlErr) -> Self {
        Self::Ml(e)
    }
}

impl From<ImageError> for PipelineErr {
    fn from(e: ImageError) -> Self {
        Self::Image(e)
    }
}

impl From<io::Error> for PipelineErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
