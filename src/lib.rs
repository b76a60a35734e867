//! Segmentation data pipeline
//!
//! Discovers paired image/mask files on disk, splits them into
//! train/validation/test subsets and yields fixed-size batches for a
//! training loop.
//!
//! # Layout
//!
//! A dataset directory holds exactly two folders, `images` and `masks`,
//! whose files share stems (`images/0.png` pairs with `masks/0.npy`).
//!
//! # Example
//!
//! ```ignore
//! use segmentation_pipeline::{LoaderConfig, SetName, SegmentationDataLoader};
//! use segmentation_pipeline::data::SpineDecoder;
//!
//! let decoder = SpineDecoder::new("data/spine");
//! let mut loader = SegmentationDataLoader::new("data/spine", LoaderConfig::default(), decoder)?;
//! for batch in loader.batch_stream(SetName::Train).take(100) {
//!     let (images, masks) = batch?.stack()?;
//! }
//! ```

use std::path::PathBuf;

pub mod config;
pub mod data;
pub mod utils;

// Re-export commonly used items
pub use config::{CursorMode, IndexSpace, LoaderConfig};
pub use data::{
    BatchDataLoader, BatchStream, DatasetSplits, SampleBatch, SampleDecoder,
    SegmentationDataLoader, SetName,
};

/// Library error types
#[derive(Debug, thiserror::Error)]
pub enum SegError {
    #[error("invalid dataset structure at {path}: {msg}")]
    Structure { path: PathBuf, msg: String },

    #[error("{total} stems cannot be split 60/20/20 into whole subsets")]
    SplitInfeasible { total: usize },

    #[error("batch size {batch_size} exceeds the {available} stems of the {set} subset")]
    BatchSize {
        set: SetName,
        batch_size: usize,
        available: usize,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image decode error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("npy read error at {path}: {source}")]
    Npy {
        path: PathBuf,
        #[source]
        source: ndarray_npy::ReadNpyError,
    },

    #[error("unexpected shape for {what}: expected {expected:?}, found {found:?}")]
    Shape {
        what: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Array error: {0}")]
    Ndarray(#[from] ndarray::ShapeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SegError>;
