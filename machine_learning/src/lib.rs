//! A small convolutional network library over flat parameter buffers.
//!
//! Models own no weights: they declare how many parameters they need and every layer views its
//! contiguous slice of a caller-owned `&[f32]` buffer, writing gradients into a matching buffer.

pub mod arch;
pub mod error;
mod init;
pub mod metrics;
pub mod optimization;
pub mod stats;
mod test;

pub use error::{MlErr, Result};
pub use stats::StepStats;
