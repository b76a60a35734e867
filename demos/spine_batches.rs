/// Spine segmentation batches - walk one epoch of train and val batches
///
/// Usage: cargo run --example spine_batches -- <dataset_dir> [batch_size]
use segmentation_pipeline::data::spine::SPINE_SIDE;
use segmentation_pipeline::data::SpineDecoder;
use segmentation_pipeline::{LoaderConfig, SegmentationDataLoader, SetName};

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let data_dir = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: spine_batches <dataset_dir> [batch_size]"))?;
    let batch_size = match args.next() {
        Some(raw) => raw.parse()?,
        None => LoaderConfig::default().batch_size,
    };

    log::info!("=== Spine segmentation batches ===");

    let decoder = SpineDecoder::new(&data_dir).with_expected_size(SPINE_SIDE, SPINE_SIDE);
    let mut loader =
        SegmentationDataLoader::new(&data_dir, LoaderConfig::with_batch_size(batch_size), decoder)?;

    log::info!("Dataset loaded:");
    log::info!("  - Total pairs: {}", loader.num_valid_fnames());
    for set in SetName::ALL {
        log::info!("  - {}: {} stems", set, loader.subset(set).len());
    }

    let num_train_steps = loader.num_train_steps();
    log::info!("Walking {} train steps", num_train_steps);
    for (step, batch) in loader
        .batch_stream(SetName::Train)
        .take(num_train_steps)
        .enumerate()
    {
        let (images, masks) = batch?.stack()?;
        let foreground = masks.iter().filter(|&&label| label != 0).count();
        log::info!(
            "Step {}: images {:?}, masks {:?}, foreground pixels {}",
            step + 1,
            images.shape(),
            masks.shape(),
            foreground
        );
    }

    let num_val_steps = loader.num_val_steps();
    if num_val_steps == 0 {
        log::warn!("Validation subset is smaller than one batch; skipping");
        return Ok(());
    }

    for batch in loader.batch_stream(SetName::Val).take(num_val_steps) {
        let batch = batch?;
        log::info!("Val batch: {:?}", batch.stems);
    }

    Ok(())
}
