/// Configuration for the segmentation data loader
///
/// Split fractions are fixed constants (see `data::splitter`) and are not
/// part of this struct.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// How batch cursors are tracked across subsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorMode {
    /// One independent cursor per subset.
    PerSubset,
    /// A single cursor shared by train, val and test. Interleaving subsets
    /// on one loader moves the same offset.
    Shared,
}

/// Which filename ordering batches are sliced and backfilled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexSpace {
    /// The requested subset's own ordering.
    Subset,
    /// The full (shuffled) valid-filename ordering, whatever the subset.
    Valid,
}

/// Loader configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Stems per batch
    pub batch_size: usize,

    /// Seed for shuffling and overflow draws; entropy when unset
    pub seed: Option<u64>,

    /// Cursor bookkeeping across subsets
    pub cursor_mode: CursorMode,

    /// Ordering used for primary slices and overflow draws
    pub index_space: IndexSpace,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 4,
            seed: None,
            cursor_mode: CursorMode::PerSubset,
            index_space: IndexSpace::Subset,
        }
    }
}

impl LoaderConfig {
    /// Config with the given batch size and defaults elsewhere
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            batch_size,
            ..Self::default()
        }
    }

    /// Behavior of the original loader: one shared cursor, slicing and
    /// backfilling from the full valid-filename ordering.
    pub fn legacy(batch_size: usize) -> Self {
        Self {
            batch_size,
            seed: None,
            cursor_mode: CursorMode::Shared,
            index_space: IndexSpace::Valid,
        }
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| crate::SegError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.batch_size == 0 {
            return Err(crate::SegError::Config(
                "batch_size must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}
