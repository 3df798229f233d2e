//! Discovery, validation and assembly of the sharded corrupt MNIST tensors.
//!
//! The raw directory holds `train_images_<N>.safetensors` / `train_target_<N>.safetensors`
//! shard pairs plus a fixed-name `test_images` / `test_target` pair. This crate checks that
//! the shards pair up, concatenates them in index order, normalizes the images and hands the
//! result back in memory or persists it to a processed directory.

pub mod assemble;
pub mod dataloader;
pub mod dataset;
pub mod error;
pub mod preprocess;
pub mod shard;
pub mod tensor;

pub use assemble::{Split, normalize};
pub use dataloader::{Batch, DataLoader};
pub use dataset::{CorruptMnist, Dataset, corrupt_mnist};
pub use error::{DataErr, Result};
pub use preprocess::{SplitKind, preprocess_data};
pub use shard::{ShardPair, discover_train_shards, find_train_shards, parse_shard_index};
