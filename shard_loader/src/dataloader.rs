use std::num::NonZeroUsize;

use ndarray::{Array1, Array4};
use rand::{Rng, seq::SliceRandom};

use crate::dataset::{CorruptMnist, Dataset};

/// An owned mini-batch of samples.
#[derive(Debug, Clone)]
pub struct Batch {
    pub images: Array4<f32>,
    pub targets: Array1<i64>,
}

impl Batch {
    #[inline]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Yields the samples of a dataset in batches of at most `batch_size`, in either index order
/// or a shuffled order.
#[derive(Debug, Clone)]
pub struct DataLoader<'a> {
    dataset: &'a CorruptMnist,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl<'a> DataLoader<'a> {
    /// Creates a new `DataLoader` that walks the dataset in index order.
    ///
    /// # Arguments
    /// * `dataset` - The dataset to batch.
    /// * `batch_size` - The maximum amount of samples per batch.
    pub fn new(dataset: &'a CorruptMnist, batch_size: NonZeroUsize) -> Self {
        Self {
            dataset,
            order: (0..dataset.len()).collect(),
            batch_size: batch_size.get(),
            cursor: 0,
        }
    }

    /// Returns the amount of batches in a full pass.
    pub fn num_batches(&self) -> usize {
        self.order.len().div_ceil(self.batch_size)
    }

    /// Draws a new sample order and rewinds to the first batch.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.order.shuffle(rng);
        self.reset();
    }

    #[inline]
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Returns the next batch, or `None` once the pass is exhausted.
    pub fn next_batch(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            return None;
        }

        let end = (self.cursor + self.batch_size).min(self.order.len());
        let (images, targets) = self.dataset.select(&self.order[self.cursor..end]);

        self.cursor = end;
        Some(Batch { images, targets })
    }
}

impl Iterator for DataLoader<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch()
    }
}
