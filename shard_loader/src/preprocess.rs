use std::{
    fs,
    path::{Path, PathBuf},
};

use log::info;
use ndarray::{Ix1, Ix4};

use crate::{
    DataErr, Result,
    assemble::{self, Split},
    shard::EXTENSION,
    tensor,
};

/// The two splits written to the processed directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitKind {
    Train,
    Test,
}

impl SplitKind {
    pub fn name(self) -> &'static str {
        match self {
            SplitKind::Train => "train",
            SplitKind::Test => "test",
        }
    }

    /// Returns the path of this split's image tensor inside `dir`.
    pub fn images_path(self, dir: &Path) -> PathBuf {
        dir.join(format!("{}_images.{EXTENSION}", self.name()))
    }

    /// Returns the path of this split's target tensor inside `dir`.
    pub fn targets_path(self, dir: &Path) -> PathBuf {
        dir.join(format!("{}_target.{EXTENSION}", self.name()))
    }
}

/// Processes the raw sharded train split and the raw test split and saves both, normalized,
/// to `processed_dir`.
///
/// Every input is loaded and validated before `processed_dir` is touched, so a failure leaves
/// no artifacts behind. A successful run replaces the previous artifacts wholesale.
///
/// # Arguments
/// * `raw_dir` - The directory holding the shards and the test files.
/// * `processed_dir` - The directory the four processed tensors are written to, created if
///   needed.
///
/// # Returns
/// The processed `(train, test)` splits.
pub fn preprocess_data(raw_dir: &Path, processed_dir: &Path) -> Result<(Split, Split)> {
    let train = assemble::load_train(raw_dir)?.normalized();
    let test = assemble::load_test(raw_dir)?.normalized();
    info!(
        "assembled {} train and {} test samples from {}",
        train.len(),
        test.len(),
        raw_dir.display()
    );

    fs::create_dir_all(processed_dir)?;
    save_split(processed_dir, SplitKind::Train, &train)?;
    save_split(processed_dir, SplitKind::Test, &test)?;
    info!("saved processed data to {}", processed_dir.display());

    Ok((train, test))
}

/// Writes a split's images and targets to `dir`.
pub fn save_split(dir: &Path, kind: SplitKind, split: &Split) -> Result<()> {
    tensor::write_tensor(&kind.images_path(dir), split.images.view())?;
    tensor::write_tensor(&kind.targets_path(dir), split.targets.view())
}

/// Reads a processed split back from `dir`.
///
/// # Arguments
/// * `dir` - The processed data directory.
/// * `kind` - Which split to read.
///
/// # Returns
/// The split, or an error if a file is missing or its tensor has the wrong rank.
pub fn load_split(dir: &Path, kind: SplitKind) -> Result<Split> {
    let x = tensor::read_tensor(&kind.images_path(dir))?;
    let y = tensor::read_tensor(&kind.targets_path(dir))?;

    let images = x
        .to_f32()
        .into_dimensionality::<Ix4>()
        .map_err(|_| DataErr::InvalidRank {
            what: "processed images",
            got: x.ndim(),
            expected: 4,
        })?;
    let targets = y
        .to_i64()
        .into_dimensionality::<Ix1>()
        .map_err(|_| DataErr::InvalidRank {
            what: "processed targets",
            got: y.ndim(),
            expected: 1,
        })?;

    if images.shape()[0] != targets.len() {
        return Err(DataErr::LengthMismatch {
            images: images.shape()[0],
            targets: targets.len(),
        });
    }

    Ok(Split { images, targets })
}
