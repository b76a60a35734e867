/// Dataset directory validation and train/val/test splitting
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::utils::{filenames_and_exts, list_visible_entries};
use crate::SegError;

/// Folder holding the input images
pub const IMAGES_DIR: &str = "images";
/// Folder holding the label masks
pub const MASKS_DIR: &str = "masks";

/// Split fractions as (numerator, denominator): 0.6 / 0.2 / 0.2.
pub const TRAIN_FRACTION: (usize, usize) = (3, 5);
pub const VAL_FRACTION: (usize, usize) = (1, 5);
pub const TEST_FRACTION: (usize, usize) = (1, 5);

/// One of the three dataset subsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetName {
    Train,
    Val,
    Test,
}

impl SetName {
    pub const ALL: [SetName; 3] = [SetName::Train, SetName::Val, SetName::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            SetName::Train => "train",
            SetName::Val => "val",
            SetName::Test => "test",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            SetName::Train => 0,
            SetName::Val => 1,
            SetName::Test => 2,
        }
    }
}

impl fmt::Display for SetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SetName {
    type Err = SegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(SetName::Train),
            "val" => Ok(SetName::Val),
            "test" => Ok(SetName::Test),
            other => Err(SegError::Config(format!(
                "unknown subset '{}', expected one of train, val, test",
                other
            ))),
        }
    }
}

/// Disjoint train/val/test partition of the valid stems
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSplits {
    pub train: Vec<String>,
    pub val: Vec<String>,
    pub test: Vec<String>,
}

impl DatasetSplits {
    pub fn get(&self, set: SetName) -> &[String] {
        match set {
            SetName::Train => &self.train,
            SetName::Val => &self.val,
            SetName::Test => &self.test,
        }
    }

    pub fn get_mut(&mut self, set: SetName) -> &mut Vec<String> {
        match set {
            SetName::Train => &mut self.train,
            SetName::Val => &mut self.val,
            SetName::Test => &mut self.test,
        }
    }

    /// Total number of stems across the three subsets
    pub fn len(&self) -> usize {
        self.train.len() + self.val.len() + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Check the dataset layout and return the stems present in both folders.
///
/// The directory must contain exactly `images` and `masks` (hidden entries
/// ignored), both folders must hold the same stems, and each folder must use
/// a single file extension. Stems come back in `images` listing order.
pub fn validate_and_parse(dir: &Path) -> crate::Result<Vec<String>> {
    let structure_err = |msg: String| SegError::Structure {
        path: dir.to_path_buf(),
        msg,
    };

    let found = list_visible_entries(dir)?;
    if found != [IMAGES_DIR, MASKS_DIR] {
        return Err(structure_err(format!(
            "expected exactly [\"{}\", \"{}\"], found {:?}",
            IMAGES_DIR, MASKS_DIR, found
        )));
    }

    let (image_stems, image_exts) = filenames_and_exts(&dir.join(IMAGES_DIR))?;
    let (mask_stems, mask_exts) = filenames_and_exts(&dir.join(MASKS_DIR))?;

    let mut sorted_images = image_stems.clone();
    let mut sorted_masks = mask_stems;
    sorted_images.sort();
    sorted_masks.sort();
    if sorted_images != sorted_masks {
        let images: BTreeSet<_> = sorted_images.iter().collect();
        let masks: BTreeSet<_> = sorted_masks.iter().collect();
        let only_images: Vec<_> = images.difference(&masks).collect();
        let only_masks: Vec<_> = masks.difference(&images).collect();
        return Err(structure_err(format!(
            "image and mask stems differ (only in images: {:?}, only in masks: {:?})",
            only_images, only_masks
        )));
    }

    for (folder, exts) in [(IMAGES_DIR, &image_exts), (MASKS_DIR, &mask_exts)] {
        let distinct: BTreeSet<&str> = exts.iter().map(String::as_str).collect();
        if distinct.len() != 1 {
            return Err(structure_err(format!(
                "'{}' must hold files of exactly one extension, found {:?}",
                folder, distinct
            )));
        }
    }

    log::info!(
        "Validated dataset at {:?}: {} image/mask pairs",
        dir,
        image_stems.len()
    );

    Ok(image_stems)
}

fn exact_share(total: usize, (num, den): (usize, usize)) -> Option<usize> {
    let scaled = total * num;
    (scaled % den == 0).then_some(scaled / den)
}

/// Shuffle `valid` in place and cut it into 60/20/20 train/val/test blocks.
///
/// Fails unless every share of `valid.len()` is a whole number.
pub fn split<R: Rng + ?Sized>(valid: &mut [String], rng: &mut R) -> crate::Result<DatasetSplits> {
    let total = valid.len();
    let shares: Option<Vec<usize>> = [TRAIN_FRACTION, VAL_FRACTION, TEST_FRACTION]
        .into_iter()
        .map(|fraction| exact_share(total, fraction))
        .collect();
    let (num_train, num_val) = match shares.as_deref() {
        Some(&[train, val, _]) => (train, val),
        _ => return Err(SegError::SplitInfeasible { total }),
    };

    valid.shuffle(rng);
    let splits = DatasetSplits {
        train: valid[..num_train].to_vec(),
        val: valid[num_train..num_train + num_val].to_vec(),
        test: valid[num_train + num_val..].to_vec(),
    };

    log::info!(
        "Split {} stems into train={}, val={}, test={}",
        total,
        splits.train.len(),
        splits.val.len(),
        splits.test.len()
    );

    Ok(splits)
}
