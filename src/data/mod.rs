/// Dataset discovery, splitting and batching for segmentation training
pub mod decoder;
pub mod loader;
pub mod sampler;
pub mod spine;
pub mod splitter;

pub use decoder::{SampleBatch, SampleDecoder};
pub use loader::{BatchStream, SegmentationDataLoader};
pub use sampler::BatchSampler;
pub use spine::SpineDecoder;
pub use splitter::{split, validate_and_parse, DatasetSplits, SetName};

use candle_core::{Device, Tensor};

/// Generic data loader trait
pub trait BatchDataLoader {
    /// Get next batch of (image, mask) tensors from `set`
    fn next_batch(&mut self, set: SetName, device: &Device) -> crate::Result<(Tensor, Tensor)>;

    /// Rewind all cursors
    fn reset(&mut self);

    /// Get number of whole batches per pass over `set`
    fn num_batches(&self, set: SetName) -> usize;
}
