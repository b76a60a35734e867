/// Spine dataset decoder: grayscale PNG images and NPY label masks
use std::fs::File;
use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3, Axis};
use ndarray_npy::ReadNpyExt;

use super::decoder::SampleDecoder;
use super::splitter::{IMAGES_DIR, MASKS_DIR};
use crate::SegError;

/// Background label in spine masks
pub const LABEL_BACKGROUND: i64 = 0;
/// Intervertebral disc label
pub const LABEL_DISC: i64 = 1;
/// Vertebra label
pub const LABEL_VERTEBRA: i64 = 2;

/// Side length of the reference spine scans
pub const SPINE_SIDE: usize = 256;

/// Reads `images/<stem>.png` and `masks/<stem>.npy` under a dataset root.
///
/// Images become `(H, W, 1)` `f32` arrays scaled to `[0, 1]`; masks become
/// `(H, W, 1)` `i64` arrays of [`LABEL_BACKGROUND`], [`LABEL_DISC`] and
/// [`LABEL_VERTEBRA`].
///
/// Images are `f32`, not `f64`, so stacked batches feed candle's default
/// float dtype directly; widen with `mapv(f64::from)` if needed.
#[derive(Debug, Clone)]
pub struct SpineDecoder {
    root: PathBuf,
    expected_hw: Option<(usize, usize)>,
}

impl SpineDecoder {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            expected_hw: None,
        }
    }

    /// Reject images and masks whose height and width differ from `(height, width)`
    pub fn with_expected_size(mut self, height: usize, width: usize) -> Self {
        self.expected_hw = Some((height, width));
        self
    }

    pub fn image_path(&self, stem: &str) -> PathBuf {
        self.root.join(IMAGES_DIR).join(format!("{}.png", stem))
    }

    pub fn mask_path(&self, stem: &str) -> PathBuf {
        self.root.join(MASKS_DIR).join(format!("{}.npy", stem))
    }

    fn check_size(&self, path: &Path, hw: (usize, usize)) -> crate::Result<()> {
        match self.expected_hw {
            Some(expected) if expected != hw => Err(SegError::Shape {
                what: path.display().to_string(),
                expected: vec![expected.0, expected.1, 1],
                found: vec![hw.0, hw.1, 1],
            }),
            _ => Ok(()),
        }
    }
}

impl SampleDecoder for SpineDecoder {
    type Image = Array3<f32>;
    type Mask = Array3<i64>;

    fn resolve_image(&self, stem: &str) -> crate::Result<Array3<f32>> {
        let path = self.image_path(stem);
        let gray = image::open(&path)
            .map_err(|source| SegError::Image {
                path: path.clone(),
                source,
            })?
            .to_luma8();

        let (width, height) = gray.dimensions();
        let hw = (height as usize, width as usize);
        self.check_size(&path, hw)?;

        let pixels: Vec<f32> = gray.into_raw().into_iter().map(|p| p as f32 / 255.0).collect();
        Ok(Array3::from_shape_vec((hw.0, hw.1, 1), pixels)?)
    }

    fn resolve_mask(&self, stem: &str) -> crate::Result<Array3<i64>> {
        let path = self.mask_path(stem);
        let file = File::open(&path).map_err(|source| SegError::Io {
            path: path.clone(),
            source,
        })?;
        let labels = Array2::<i64>::read_npy(file).map_err(|source| SegError::Npy {
            path: path.clone(),
            source,
        })?;

        let (height, width) = labels.dim();
        self.check_size(&path, (height, width))?;

        Ok(labels.insert_axis(Axis(2)))
    }
}
