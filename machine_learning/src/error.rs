use std::{
    error::Error,
    fmt::{self, Display},
};

use ndarray::ShapeError;
use rand_distr::uniform::Error as UniformError;

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    InvalidInputRank {
        got: usize,
        expected: usize,
    },
    InvalidInputShape {
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    InvalidTarget {
        target: i64,
        classes: usize,
    },
    BackwardBeforeForward {
        layer: &'static str,
    },
    GradientShape {
        layer: &'static str,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    Init(UniformError),
    Shape(ShapeError),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::InvalidInputRank { got, expected } => write!(
                f,
                "expected input to be a {expected}D tensor, got a {got}D tensor"
            ),
            MlErr::InvalidInputShape { got, expected } => write!(
                f,
                "expected each sample to have shape {expected:?}, got {got:?}"
            ),
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::InvalidTarget { target, classes } => write!(
                f,
                "target {target} is out of range for {classes} classes"
            ),
            MlErr::BackwardBeforeForward { layer } => {
                write!(f, "backward called on {layer} before a forward pass")
            }
            MlErr::GradientShape {
                layer,
                got,
                expected,
            } => write!(
                f,
                "gradient reaching {layer} has shape {got:?}, expected {expected:?}"
            ),
            MlErr::Init(e) => write!(f, "failed to initialize parameters: {e}"),
            MlErr::Shape(e) => write!(f, "shape error: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Init(e) => Some(e),
            MlErr::Shape(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ShapeError> for MlErr {
    fn from(value: ShapeError) -> Self {
        Self::Shape(value)
    }
}

impl From<UniformError> for MlErr {
    fn from(value: UniformError) -> Self {
        Self::Init(value)
    }
}
