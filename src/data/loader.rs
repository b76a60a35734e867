/// Segmentation data loader: validated splits plus an endless batch stream
use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::decoder::{SampleBatch, SampleDecoder};
use super::sampler::BatchSampler;
use super::splitter::{self, DatasetSplits, SetName};
use crate::config::LoaderConfig;

/// Loads images and masks from a dataset directory in fixed-size batches.
///
/// Construction validates the directory, splits its stems 60/20/20 and fails
/// if either step does. Batch requests take `&mut self`: the cursors and the
/// train ordering belong to exactly one caller.
pub struct SegmentationDataLoader<D, R = StdRng> {
    data_dir: PathBuf,
    decoder: D,
    sampler: BatchSampler,
    rng: R,
    num_train_steps: usize,
    num_val_steps: usize,
}

impl<D: SampleDecoder> SegmentationDataLoader<D, StdRng> {
    /// Create a loader seeded from `config.seed`, or from entropy when unset
    pub fn new<P: AsRef<Path>>(data_dir: P, config: LoaderConfig, decoder: D) -> crate::Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(data_dir, config, decoder, rng)
    }
}

impl<D: SampleDecoder, R: Rng> SegmentationDataLoader<D, R> {
    /// Create a loader drawing all randomness from `rng`
    pub fn with_rng<P: AsRef<Path>>(
        data_dir: P,
        config: LoaderConfig,
        decoder: D,
        mut rng: R,
    ) -> crate::Result<Self> {
        config.validate()?;
        let data_dir = data_dir.as_ref().to_path_buf();

        log::info!("Loading segmentation dataset from: {:?}", data_dir);

        let mut valid = splitter::validate_and_parse(&data_dir)?;
        let splits = splitter::split(&mut valid, &mut rng)?;
        let sampler = BatchSampler::new(valid, splits, &config);

        let num_train_steps = sampler.num_steps(SetName::Train);
        let num_val_steps = sampler.num_steps(SetName::Val);

        log::info!(
            "Data loader ready: batch_size={}, train steps={}, val steps={}",
            config.batch_size,
            num_train_steps,
            num_val_steps
        );

        Ok(Self {
            data_dir,
            decoder,
            sampler,
            rng,
            num_train_steps,
            num_val_steps,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn batch_size(&self) -> usize {
        self.sampler.batch_size()
    }

    /// All validated stems, in their post-split shuffled order
    pub fn valid_fnames(&self) -> &[String] {
        self.sampler.valid_fnames()
    }

    pub fn num_valid_fnames(&self) -> usize {
        self.sampler.valid_fnames().len()
    }

    pub fn splits(&self) -> &DatasetSplits {
        self.sampler.splits()
    }

    pub fn subset(&self, set: SetName) -> &[String] {
        self.sampler.splits().get(set)
    }

    /// Whole train batches per pass, `floor(len(train) / batch_size)`
    pub fn num_train_steps(&self) -> usize {
        self.num_train_steps
    }

    /// Whole val batches per pass, `floor(len(val) / batch_size)`
    pub fn num_val_steps(&self) -> usize {
        self.num_val_steps
    }

    pub fn num_test_steps(&self) -> usize {
        self.sampler.num_steps(SetName::Test)
    }

    pub fn num_steps(&self, set: SetName) -> usize {
        self.sampler.num_steps(set)
    }

    /// Current cursor position used for `set`
    pub fn cursor(&self, set: SetName) -> usize {
        self.sampler.cursor(set)
    }

    /// Next `batch_size` stems from `set`
    pub fn next_batch_filenames(&mut self, set: SetName) -> crate::Result<Vec<String>> {
        self.sampler.next_batch_filenames(set, &mut self.rng)
    }

    /// Next batch of stems from `set`, decoded into images and masks
    pub fn next_sample_batch(
        &mut self,
        set: SetName,
    ) -> crate::Result<SampleBatch<D::Image, D::Mask>> {
        let stems = self.next_batch_filenames(set)?;
        SampleBatch::decode(stems, &self.decoder)
    }

    /// Endless stream of decoded batches from `set`.
    ///
    /// The stream never ends on its own; stop pulling (e.g. `.take(n)`) to
    /// stop. An error item means that batch failed as a whole.
    pub fn batch_stream(&mut self, set: SetName) -> BatchStream<'_, D, R> {
        BatchStream { loader: self, set }
    }
}

/// Iterator returned by [`SegmentationDataLoader::batch_stream`]
pub struct BatchStream<'a, D, R = StdRng> {
    loader: &'a mut SegmentationDataLoader<D, R>,
    set: SetName,
}

impl<'a, D: SampleDecoder, R: Rng> BatchStream<'a, D, R> {
    pub fn set(&self) -> SetName {
        self.set
    }
}

impl<'a, D: SampleDecoder, R: Rng> Iterator for BatchStream<'a, D, R> {
    type Item = crate::Result<SampleBatch<D::Image, D::Mask>>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.loader.next_sample_batch(self.set))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

impl<D, R> super::BatchDataLoader for SegmentationDataLoader<D, R>
where
    D: SampleDecoder<Image = Array3<f32>, Mask = Array3<i64>>,
    R: Rng,
{
    fn next_batch(&mut self, set: SetName, device: &Device) -> crate::Result<(Tensor, Tensor)> {
        self.next_sample_batch(set)?.to_tensors(device)
    }

    fn reset(&mut self) {
        self.sampler.reset()
    }

    fn num_batches(&self, set: SetName) -> usize {
        self.num_steps(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CursorMode, IndexSpace};
    use crate::SegError;
    use std::collections::HashSet;
    use std::fs;

    /// Decoder that hands back the stem itself as the image
    struct EchoDecoder {
        fail_images: bool,
    }

    impl SampleDecoder for EchoDecoder {
        type Image = String;
        type Mask = usize;

        fn resolve_image(&self, stem: &str) -> crate::Result<String> {
            if self.fail_images {
                return Err(SegError::Config(format!("cannot decode {}", stem)));
            }
            Ok(stem.to_string())
        }

        fn resolve_mask(&self, stem: &str) -> crate::Result<usize> {
            Ok(stem.len())
        }
    }

    fn echo() -> EchoDecoder {
        EchoDecoder { fail_images: false }
    }

    fn stem_dir(n: usize) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("images")).unwrap();
        fs::create_dir(dir.path().join("masks")).unwrap();
        for i in 0..n {
            fs::write(dir.path().join("images").join(format!("{}.png", i)), b"").unwrap();
            fs::write(dir.path().join("masks").join(format!("{}.npy", i)), b"").unwrap();
        }
        dir
    }

    fn seeded(batch_size: usize, seed: u64) -> LoaderConfig {
        LoaderConfig {
            seed: Some(seed),
            ..LoaderConfig::with_batch_size(batch_size)
        }
    }

    #[test]
    fn test_ten_stem_scenario() {
        let dir = stem_dir(10);
        let mut loader = SegmentationDataLoader::new(dir.path(), seeded(4, 0), echo()).unwrap();

        assert_eq!(loader.num_valid_fnames(), 10);
        assert_eq!(loader.subset(SetName::Train).len(), 6);
        assert_eq!(loader.subset(SetName::Val).len(), 2);
        assert_eq!(loader.subset(SetName::Test).len(), 2);
        assert_eq!(loader.num_train_steps(), 1);
        assert_eq!(loader.num_val_steps(), 0);

        let train = loader.subset(SetName::Train).to_vec();
        let first = loader.next_batch_filenames(SetName::Train).unwrap();
        assert_eq!(first, train[..4].to_vec());

        let second = loader.next_batch_filenames(SetName::Train).unwrap();
        assert_eq!(second[..2], train[4..]);
        let overflow: HashSet<_> = second[2..].iter().collect();
        assert_eq!(overflow.len(), 2);
        assert!(overflow.iter().all(|s| train[..4].contains(*s)));
        assert_eq!(loader.cursor(SetName::Train), 0);
    }

    #[test]
    fn test_same_seed_same_split() {
        let dir = stem_dir(10);
        let a = SegmentationDataLoader::new(dir.path(), seeded(2, 17), echo()).unwrap();
        let b = SegmentationDataLoader::new(dir.path(), seeded(2, 17), echo()).unwrap();
        assert_eq!(a.splits(), b.splits());
    }

    #[test]
    fn test_with_injected_rng() {
        let dir = stem_dir(5);
        let rng = StdRng::seed_from_u64(99);
        let mut loader =
            SegmentationDataLoader::with_rng(dir.path(), LoaderConfig::with_batch_size(1), echo(), rng)
                .unwrap();

        assert_eq!(loader.subset(SetName::Train).len(), 3);
        let test = loader.next_batch_filenames(SetName::Test).unwrap();
        assert_eq!(test, loader.subset(SetName::Test).to_vec());
    }

    #[test]
    fn test_split_infeasible_construction() {
        let dir = stem_dir(7);
        let result = SegmentationDataLoader::new(dir.path(), seeded(1, 0), echo());
        assert!(matches!(result, Err(SegError::SplitInfeasible { total: 7 })));
    }

    #[test]
    fn test_invalid_config_construction() {
        let dir = stem_dir(5);
        let result = SegmentationDataLoader::new(dir.path(), seeded(0, 0), echo());
        assert!(matches!(result, Err(SegError::Config(_))));
    }

    #[test]
    fn test_batch_size_error_on_request() {
        let dir = stem_dir(10);
        let mut loader = SegmentationDataLoader::new(dir.path(), seeded(4, 3), echo()).unwrap();

        assert!(matches!(
            loader.next_batch_filenames(SetName::Val),
            Err(SegError::BatchSize { available: 2, .. })
        ));
        assert!(loader.batch_stream(SetName::Test).next().unwrap().is_err());
        assert!(loader.next_batch_filenames(SetName::Train).is_ok());
    }

    #[test]
    fn test_batch_stream_is_endless() {
        let dir = stem_dir(10);
        let mut loader = SegmentationDataLoader::new(dir.path(), seeded(4, 5), echo()).unwrap();
        let train: HashSet<String> = loader.subset(SetName::Train).iter().cloned().collect();

        let batches: Vec<_> = loader
            .batch_stream(SetName::Train)
            .take(25)
            .collect::<crate::Result<_>>()
            .unwrap();

        assert_eq!(batches.len(), 25);
        for batch in &batches {
            assert_eq!(batch.len(), 4);
            assert_eq!(batch.images, batch.stems);
            assert!(batch.masks.iter().all(|&m| m == 1));
            assert!(batch.stems.iter().all(|s| train.contains(s)));
        }
    }

    #[test]
    fn test_batch_stream_surfaces_decode_error() {
        let dir = stem_dir(5);
        let decoder = EchoDecoder { fail_images: true };
        let mut loader = SegmentationDataLoader::new(dir.path(), seeded(3, 0), decoder).unwrap();
        let first_stem = loader.subset(SetName::Train)[0].clone();

        let first = loader.batch_stream(SetName::Train).next().unwrap();
        match first {
            Err(SegError::Config(msg)) => assert_eq!(msg, format!("cannot decode {}", first_stem)),
            other => panic!("expected decode failure, got {:?}", other.map(|b| b.stems)),
        }
    }

    #[test]
    fn test_legacy_mode_shares_cursor() {
        let dir = stem_dir(10);
        let config = LoaderConfig {
            seed: Some(4),
            ..LoaderConfig::legacy(2)
        };
        assert_eq!(config.cursor_mode, CursorMode::Shared);
        assert_eq!(config.index_space, IndexSpace::Valid);
        let mut loader = SegmentationDataLoader::new(dir.path(), config, echo()).unwrap();

        let valid = loader.valid_fnames().to_vec();
        let train = loader.next_batch_filenames(SetName::Train).unwrap();
        assert_eq!(train, valid[..2].to_vec());
        assert_eq!(loader.cursor(SetName::Test), 2);
    }
}
