/// Decoding of a stem into its image and mask arrays
use candle_core::{Device, Tensor};
use ndarray::{Array3, Array4, ArrayView3, Axis};

use crate::SegError;

/// Format-specific loader for one image/mask pair.
///
/// The loader hands each stem of a batch to `resolve_image` and then
/// `resolve_mask`; errors are returned to the caller unchanged. Array
/// dimensions and label semantics are defined by the implementation.
pub trait SampleDecoder {
    type Image;
    type Mask;

    /// Decode the image stored under `stem` (e.g. `X` in `images/X.png`)
    fn resolve_image(&self, stem: &str) -> crate::Result<Self::Image>;

    /// Decode the mask stored under `stem` (e.g. `Y` in `masks/Y.npy`)
    fn resolve_mask(&self, stem: &str) -> crate::Result<Self::Mask>;
}

impl<D: SampleDecoder + ?Sized> SampleDecoder for &D {
    type Image = D::Image;
    type Mask = D::Mask;

    fn resolve_image(&self, stem: &str) -> crate::Result<Self::Image> {
        (**self).resolve_image(stem)
    }

    fn resolve_mask(&self, stem: &str) -> crate::Result<Self::Mask> {
        (**self).resolve_mask(stem)
    }
}

/// One decoded batch: `images[i]` and `masks[i]` belong to `stems[i]`.
#[derive(Debug, Clone)]
pub struct SampleBatch<I, M> {
    pub stems: Vec<String>,
    pub images: Vec<I>,
    pub masks: Vec<M>,
}

impl<I, M> SampleBatch<I, M> {
    /// Decode every stem, images first, failing on the first error
    pub fn decode<D>(stems: Vec<String>, decoder: &D) -> crate::Result<Self>
    where
        D: SampleDecoder<Image = I, Mask = M> + ?Sized,
    {
        let images = stems
            .iter()
            .map(|stem| decoder.resolve_image(stem))
            .collect::<crate::Result<Vec<_>>>()?;
        let masks = stems
            .iter()
            .map(|stem| decoder.resolve_mask(stem))
            .collect::<crate::Result<Vec<_>>>()?;

        Ok(Self {
            stems,
            images,
            masks,
        })
    }

    pub fn len(&self) -> usize {
        self.stems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }
}

fn stack_samples<T: Clone>(what: &str, samples: &[Array3<T>]) -> crate::Result<Array4<T>> {
    let first = samples.first().ok_or_else(|| SegError::Shape {
        what: format!("{} batch", what),
        expected: vec![1],
        found: vec![0],
    })?;
    if let Some(odd) = samples.iter().find(|s| s.shape() != first.shape()) {
        return Err(SegError::Shape {
            what: format!("{} in batch", what),
            expected: first.shape().to_vec(),
            found: odd.shape().to_vec(),
        });
    }

    let views: Vec<ArrayView3<T>> = samples.iter().map(|s| s.view()).collect();
    Ok(ndarray::stack(Axis(0), &views)?)
}

fn to_tensor<T: candle_core::WithDType>(array: Array4<T>, device: &Device) -> crate::Result<Tensor> {
    let shape = array.shape().to_vec();
    let data: Vec<T> = array.iter().copied().collect();
    Ok(Tensor::from_vec(data, shape, device)?)
}

impl SampleBatch<Array3<f32>, Array3<i64>> {
    /// Stack into `(B, H, W, C)` image and mask arrays
    pub fn stack(&self) -> crate::Result<(Array4<f32>, Array4<i64>)> {
        Ok((
            stack_samples("image", &self.images)?,
            stack_samples("mask", &self.masks)?,
        ))
    }

    /// Stack and move to `device` as `(B, H, W, C)` tensors
    pub fn to_tensors(&self, device: &Device) -> crate::Result<(Tensor, Tensor)> {
        let (images, masks) = self.stack()?;
        Ok((to_tensor(images, device)?, to_tensor(masks, device)?))
    }
}
