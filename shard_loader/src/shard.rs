use std::{
    collections::{BTreeMap, BTreeSet, btree_map::Entry},
    fs,
    path::{Path, PathBuf},
};

use log::debug;

use crate::{DataErr, Result};

/// The extension every tensor file carries.
pub const EXTENSION: &str = "safetensors";

/// The two categories a training shard can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardKind {
    Images,
    Targets,
}

impl ShardKind {
    /// Returns the file name prefix shared by every shard of this kind.
    pub fn prefix(self) -> &'static str {
        match self {
            ShardKind::Images => "train_images_",
            ShardKind::Targets => "train_target_",
        }
    }

    /// Builds the path of the shard with the given index inside `dir`.
    ///
    /// # Arguments
    /// * `dir` - The raw data directory.
    /// * `index` - The shard index.
    ///
    /// # Returns
    /// The path `dir/<prefix><index>.safetensors`.
    pub fn path(self, dir: &Path, index: u64) -> PathBuf {
        dir.join(format!("{}{index}.{EXTENSION}", self.prefix()))
    }
}

/// Extracts the shard index from a shard file name.
///
/// Any decimal integer suffix is accepted, so `"1"`, `"01"` and `"+1"` all name index 1.
///
/// # Arguments
/// * `file_name` - The file name, without any directory component.
/// * `prefix` - The expected prefix, e.g. `"train_images_"`.
///
/// # Returns
/// The shard index, or `None` if the name doesn't follow the `<prefix><index>.safetensors`
/// pattern.
pub fn parse_shard_index(file_name: &str, prefix: &str) -> Option<u64> {
    let stem = file_name
        .strip_suffix(EXTENSION)?
        .strip_suffix('.')?
        .strip_prefix(prefix)?;

    let digits = stem.strip_prefix('+').unwrap_or(stem);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    digits.parse().ok()
}

/// A validated (image, target) shard pair as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardPair {
    pub index: u64,
    pub images: PathBuf,
    pub targets: PathBuf,
}

/// Records the shard at `path` under `index`, rejecting a second file for the same index.
fn insert_shard(shards: &mut BTreeMap<u64, PathBuf>, index: u64, path: PathBuf) -> Result<()> {
    match shards.entry(index) {
        Entry::Vacant(slot) => {
            slot.insert(path);
            Ok(())
        }
        Entry::Occupied(slot) => {
            let (first, second) = if slot.get() <= &path {
                (slot.get().clone(), path)
            } else {
                (path, slot.get().clone())
            };
            Err(DataErr::DuplicateShard {
                index,
                first,
                second,
            })
        }
    }
}

/// Scans `raw_dir` for training shards and pairs every image shard with its target shard.
///
/// Files that don't parse as shards are ignored.
///
/// # Arguments
/// * `raw_dir` - The raw data directory.
///
/// # Returns
/// The shard pairs in ascending index order, or an error if the directory is missing, two
/// files of the same kind share an index, the two index sets differ or no shard is present
/// at all.
pub fn discover_train_shards(raw_dir: &Path) -> Result<Vec<ShardPair>> {
    if !raw_dir.is_dir() {
        return Err(DataErr::MissingRawDir(raw_dir.to_path_buf()));
    }

    let mut images = BTreeMap::new();
    let mut targets = BTreeMap::new();

    for entry in fs::read_dir(raw_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };

        if let Some(i) = parse_shard_index(name, ShardKind::Images.prefix()) {
            insert_shard(&mut images, i, path)?;
        } else if let Some(i) = parse_shard_index(name, ShardKind::Targets.prefix()) {
            insert_shard(&mut targets, i, path)?;
        }
    }

    let image_idxs: BTreeSet<u64> = images.keys().copied().collect();
    let target_idxs: BTreeSet<u64> = targets.keys().copied().collect();
    debug!(
        "scanned {}: images={image_idxs:?} targets={target_idxs:?}",
        raw_dir.display()
    );

    let idxs = validate_shard_sets(raw_dir, &image_idxs, &target_idxs)?;
    Ok(idxs
        .into_iter()
        .filter_map(|index| {
            Some(ShardPair {
                index,
                images: images.remove(&index)?,
                targets: targets.remove(&index)?,
            })
        })
        .collect())
}

/// Scans `raw_dir` for training shards and validates that every image shard has its target
/// shard and vice versa.
///
/// # Arguments
/// * `raw_dir` - The raw data directory.
///
/// # Returns
/// The ascending list of shard indices, failing as [`discover_train_shards`] does.
pub fn find_train_shards(raw_dir: &Path) -> Result<Vec<u64>> {
    let pairs = discover_train_shards(raw_dir)?;
    Ok(pairs.into_iter().map(|pair| pair.index).collect())
}

/// Checks that two shard index sets describe complete (image, target) pairs.
///
/// # Arguments
/// * `dir` - The directory the sets were read from, used in error messages.
/// * `images` - The indices of the image shards.
/// * `targets` - The indices of the target shards.
///
/// # Returns
/// The ascending list of common indices.
///
/// # Errors
/// `NoShardsFound` if no index is shared by both sets, `ShardMismatch` naming the missing
/// indices on each side otherwise.
pub fn validate_shard_sets(
    dir: &Path,
    images: &BTreeSet<u64>,
    targets: &BTreeSet<u64>,
) -> Result<Vec<u64>> {
    let common: Vec<u64> = images.intersection(targets).copied().collect();
    if common.is_empty() {
        return Err(DataErr::NoShardsFound {
            dir: dir.to_path_buf(),
        });
    }

    let missing_images: Vec<u64> = targets.difference(images).copied().collect();
    let missing_targets: Vec<u64> = images.difference(targets).copied().collect();

    if !missing_images.is_empty() || !missing_targets.is_empty() {
        return Err(DataErr::ShardMismatch {
            dir: dir.to_path_buf(),
            missing_images,
            missing_targets,
        });
    }

    Ok(common)
}
