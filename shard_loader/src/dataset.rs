use std::path::Path;

use ndarray::{Array1, Array3, Array4, ArrayView3, Axis};

use crate::{
    DataErr, Result,
    assemble::{self, Split},
    preprocess::{self, SplitKind},
};

/// A collection of samples addressable by index.
///
/// A `Dataset` only provides access to samples, batching and shuffling are left to the
/// `DataLoader`.
pub trait Dataset {
    /// Sample type produced by this dataset.
    type Sample;

    /// Returns the total number of samples.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetches a sample by index.
    ///
    /// # Errors
    /// Returns `DataErr::OutOfBounds` if `index` is invalid.
    fn get(&self, index: usize) -> Result<Self::Sample>;
}

/// The corrupt MNIST data held in memory: images `[N, 1, 28, 28]` and integer labels `[N]`.
#[derive(Debug, Clone)]
pub struct CorruptMnist {
    split: Split,
}

impl CorruptMnist {
    /// Wraps an already assembled split.
    pub fn new(split: Split) -> Self {
        Self { split }
    }

    /// Builds the training dataset straight from the raw shards of `raw_dir`.
    ///
    /// Shards are validated and concatenated in index order; images get their channel
    /// dimension and are cast to `f32` but are not normalized.
    ///
    /// # Arguments
    /// * `raw_dir` - The raw data directory.
    pub fn from_raw_dir(raw_dir: &Path) -> Result<Self> {
        assemble::load_train(raw_dir).map(Self::new)
    }

    /// Loads one processed split from `processed_dir`.
    pub fn from_processed(processed_dir: &Path, kind: SplitKind) -> Result<Self> {
        preprocess::load_split(processed_dir, kind).map(Self::new)
    }

    pub fn images(&self) -> &Array4<f32> {
        &self.split.images
    }

    pub fn targets(&self) -> &Array1<i64> {
        &self.split.targets
    }

    /// Returns a borrowed view of the sample at `index`, if any.
    pub fn sample_view(&self, index: usize) -> Option<(ArrayView3<'_, f32>, i64)> {
        let target = *self.split.targets.get(index)?;
        Some((self.split.images.index_axis(Axis(0), index), target))
    }

    /// Gathers the samples at `indices` into a contiguous batch.
    ///
    /// # Panics
    /// If any index is out of bounds.
    pub fn select(&self, indices: &[usize]) -> (Array4<f32>, Array1<i64>) {
        (
            self.split.images.select(Axis(0), indices),
            self.split.targets.select(Axis(0), indices),
        )
    }
}

impl Dataset for CorruptMnist {
    type Sample = (Array3<f32>, i64);

    fn len(&self) -> usize {
        self.split.len()
    }

    fn get(&self, index: usize) -> Result<Self::Sample> {
        let (image, target) = self.sample_view(index).ok_or(DataErr::OutOfBounds {
            index,
            len: self.len(),
        })?;

        Ok((image.to_owned(), target))
    }
}

/// Loads the processed train and test datasets from `processed_dir`.
///
/// # Arguments
/// * `processed_dir` - The directory written by `preprocess_data`.
///
/// # Returns
/// The `(train, test)` datasets.
pub fn corrupt_mnist(processed_dir: &Path) -> Result<(CorruptMnist, CorruptMnist)> {
    let train = CorruptMnist::from_processed(processed_dir, SplitKind::Train)?;
    let test = CorruptMnist::from_processed(processed_dir, SplitKind::Test)?;
    Ok((train, test))
}
