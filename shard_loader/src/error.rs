use std::{error::Error, fmt, io, path::PathBuf};

use ndarray::ShapeError;
use safetensors::SafeTensorError;

/// The result type used in the entire shard loader.
pub type Result<T> = std::result::Result<T, DataErr>;

/// Failures while discovering, assembling or persisting the dataset.
#[derive(Debug)]
pub enum DataErr {
    /// The raw data directory does not exist or is not a directory.
    MissingRawDir(PathBuf),
    /// A required tensor file is missing.
    MissingFile(PathBuf),
    /// The image and target shard index sets differ.
    ShardMismatch {
        dir: PathBuf,
        missing_images: Vec<u64>,
        missing_targets: Vec<u64>,
    },
    /// Two files of the same kind name the same shard index, e.g. `_1` and `_01`.
    DuplicateShard {
        index: u64,
        first: PathBuf,
        second: PathBuf,
    },
    /// No shard index is present in both categories.
    NoShardsFound { dir: PathBuf },
    /// Images and targets disagree on the number of samples.
    LengthMismatch { images: usize, targets: usize },
    /// A tensor has the wrong number of dimensions.
    InvalidRank {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// A tensor is stored with an element type this loader can't convert.
    UnsupportedDtype { path: PathBuf, dtype: String },
    /// The tensor file holds no usable tensor.
    TensorNotFound { path: PathBuf },
    /// A sample index is out of bounds.
    OutOfBounds { index: usize, len: usize },
    Shape(ShapeError),
    Safetensors {
        path: PathBuf,
        source: SafeTensorError,
    },
    Io(io::Error),
}

impl fmt::Display for DataErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataErr::MissingRawDir(p) => write!(f, "raw data directory not found: {}", p.display()),
            DataErr::MissingFile(p) => write!(f, "tensor file not found: {}", p.display()),
            DataErr::ShardMismatch {
                dir,
                missing_images,
                missing_targets,
            } => write!(
                f,
                "mismatched shard files in {}. Missing train_images shards: {missing_images:?}. \
                 Missing train_target shards: {missing_targets:?}.",
                dir.display()
            ),
            DataErr::DuplicateShard {
                index,
                first,
                second,
            } => write!(
                f,
                "shard index {index} is named by both {} and {}",
                first.display(),
                second.display()
            ),
            DataErr::NoShardsFound { dir } => write!(
                f,
                "no train shards found in {}. Expected train_images_*.safetensors + \
                 train_target_*.safetensors",
                dir.display()
            ),
            DataErr::LengthMismatch { images, targets } => write!(
                f,
                "sample count mismatch: {images} images vs {targets} targets"
            ),
            DataErr::InvalidRank {
                what,
                got,
                expected,
            } => write!(f, "{what} must have rank {expected}, got rank {got}"),
            DataErr::UnsupportedDtype { path, dtype } => {
                write!(f, "unsupported dtype {dtype} in {}", path.display())
            }
            DataErr::TensorNotFound { path } => {
                write!(f, "no tensor to load in {}", path.display())
            }
            DataErr::OutOfBounds { index, len } => {
                write!(f, "sample index {index} is out of bounds for length {len}")
            }
            DataErr::Shape(e) => write!(f, "shape error: {e}"),
            DataErr::Safetensors { path, source } => {
                write!(f, "invalid safetensors file {}: {source}", path.display())
            }
            DataErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for DataErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DataErr::Shape(e) => Some(e),
            DataErr::Safetensors { source, .. } => Some(source),
            DataErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DataErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ShapeError> for DataErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}
