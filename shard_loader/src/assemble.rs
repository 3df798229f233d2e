use std::path::Path;

use log::debug;
use ndarray::{Array, Array1, Array3, Array4, ArrayView1, ArrayView3, Axis, Dimension, Ix1, Ix3};

use crate::{
    DataErr, Result,
    shard::{self, EXTENSION},
    tensor::{self, Tensor},
};

/// The fixed file stems of the unsharded test split.
pub const TEST_IMAGES: &str = "test_images";
pub const TEST_TARGET: &str = "test_target";

/// The images and targets of one data split, ready to be consumed by a model.
///
/// Images have shape `[N, 1, H, W]` and targets shape `[N]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub images: Array4<f32>,
    pub targets: Array1<i64>,
}

impl Split {
    /// Builds a split from assembled images `[N, H, W]` and targets `[N]`, inserting the
    /// channel dimension.
    ///
    /// # Arguments
    /// * `images` - The images, one per sample.
    /// * `targets` - The labels, one per sample.
    ///
    /// # Returns
    /// The split, or `LengthMismatch` if the sample counts differ.
    pub fn new(images: Array3<f32>, targets: Array1<i64>) -> Result<Self> {
        if images.len_of(Axis(0)) != targets.len() {
            return Err(DataErr::LengthMismatch {
                images: images.len_of(Axis(0)),
                targets: targets.len(),
            });
        }

        Ok(Self {
            images: images.insert_axis(Axis(1)),
            targets,
        })
    }

    /// Returns the amount of samples in the split.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Normalizes the images with their global mean and standard deviation.
    pub fn normalized(self) -> Self {
        Self {
            images: normalize(self.images),
            ..self
        }
    }
}

/// Rescales `x` to zero mean and unit standard deviation using a single scalar mean and a
/// single scalar (sample) standard deviation computed over every element.
///
/// A tensor with a zero or undefined standard deviation is only centred.
///
/// # Arguments
/// * `x` - The tensor to normalize.
///
/// # Returns
/// The normalized tensor.
pub fn normalize<D: Dimension>(mut x: Array<f32, D>) -> Array<f32, D> {
    let wide = x.mapv(f64::from);
    let Some(mean) = wide.mean() else {
        return x;
    };

    let std = if x.len() > 1 { wide.std(1.0) } else { 0.0 };
    if std.is_finite() && std > 0.0 {
        x.mapv_inplace(|v| ((f64::from(v) - mean) / std) as f32);
    } else {
        x.mapv_inplace(|v| (f64::from(v) - mean) as f32);
    }

    x
}

/// Discovers, validates and concatenates the training shards of `raw_dir` in ascending
/// shard index order.
///
/// The result is not normalized.
///
/// # Arguments
/// * `raw_dir` - The raw data directory.
///
/// # Returns
/// The assembled training split or the first error found.
pub fn load_train(raw_dir: &Path) -> Result<Split> {
    let pairs = shard::discover_train_shards(raw_dir)?;

    let mut images = Vec::with_capacity(pairs.len());
    let mut targets = Vec::with_capacity(pairs.len());

    for pair in &pairs {
        let x = tensor::read_tensor(&pair.images)?;
        let y = tensor::read_tensor(&pair.targets)?;
        debug!(shard = pair.index; "loaded shard with image shape {:?}", x.shape());

        images.push(image_block(&x)?);
        targets.push(target_block(&y)?);
    }

    let images = concat_images(&images)?;
    let targets = concat_targets(&targets)?;
    Split::new(images, targets)
}

/// Loads the fixed-name test split of `raw_dir`.
///
/// The result is not normalized.
///
/// # Arguments
/// * `raw_dir` - The raw data directory.
///
/// # Returns
/// The test split or an error if either file is missing or malformed.
pub fn load_test(raw_dir: &Path) -> Result<Split> {
    if !raw_dir.is_dir() {
        return Err(DataErr::MissingRawDir(raw_dir.to_path_buf()));
    }

    let x = tensor::read_tensor(&raw_dir.join(format!("{TEST_IMAGES}.{EXTENSION}")))?;
    let y = tensor::read_tensor(&raw_dir.join(format!("{TEST_TARGET}.{EXTENSION}")))?;

    Split::new(image_block(&x)?, target_block(&y)?)
}

fn image_block(x: &Tensor) -> Result<Array3<f32>> {
    let got = x.ndim();
    x.to_f32()
        .into_dimensionality::<Ix3>()
        .map_err(|_| DataErr::InvalidRank {
            what: "image shard",
            got,
            expected: 3,
        })
}

fn target_block(y: &Tensor) -> Result<Array1<i64>> {
    let got = y.ndim();
    y.to_i64()
        .into_dimensionality::<Ix1>()
        .map_err(|_| DataErr::InvalidRank {
            what: "target shard",
            got,
            expected: 1,
        })
}

fn concat_images(blocks: &[Array3<f32>]) -> Result<Array3<f32>> {
    let views: Vec<ArrayView3<f32>> = blocks.iter().map(|b| b.view()).collect();
    Ok(ndarray::concatenate(Axis(0), &views)?)
}

fn concat_targets(blocks: &[Array1<i64>]) -> Result<Array1<i64>> {
    let views: Vec<ArrayView1<i64>> = blocks.iter().map(|b| b.view()).collect();
    Ok(ndarray::concatenate(Axis(0), &views)?)
}
