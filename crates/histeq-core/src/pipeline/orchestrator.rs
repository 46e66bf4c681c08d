use std::sync::Arc;

use tracing::{debug, info};

use crate::buffer::{ChannelLayout, ImageBuffer, SampleLayout};
use crate::compute::{create_backend, ComputeBackend, DeviceBuffer};
use crate::equalize::{effective_max_intensity, validate_num_bins, BinMapping};
use crate::error::{HisteqError, Result};
use crate::io::{load_image, save_image};

use super::config::PipelineConfig;
use super::types::{EqualizationOutput, PipelineOutput, PipelineStage, ProgressReporter};

/// Run one stage between `begin_stage` and `finish_stage`. A failing stage
/// aborts the run; `finish_stage` is not reported for it.
fn stage<T>(
    reporter: &dyn ProgressReporter,
    stage: PipelineStage,
    total_items: Option<usize>,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    reporter.begin_stage(stage, total_items);
    let value = f()?;
    reporter.finish_stage();
    debug!(%stage, "Stage complete");
    Ok(value)
}

/// Equalize `image` with `num_bins` histogram bins on `backend`.
///
/// Grayscale images are histogrammed directly. RGB images are histogrammed
/// over their luma and every channel is remapped through the same table.
/// RGBA images are histogrammed over their colour samples and alpha is
/// passed through.
pub fn equalize(
    image: &ImageBuffer,
    num_bins: usize,
    backend: &dyn ComputeBackend,
    reporter: &dyn ProgressReporter,
) -> Result<EqualizationOutput> {
    validate_num_bins(num_bins)?;
    let layout = image.layout();
    info!(
        width = image.width(),
        height = image.height(),
        %layout,
        num_bins,
        device = backend.name(),
        "Equalizing image"
    );

    let input = stage(reporter, PipelineStage::Loaded, Some(image.size()), || {
        backend.upload_samples(image.samples())
    })?;

    // The branch fixes which buffer is histogrammed and how it is read.
    let (reduced, counted_layout, mapping, sample_count) =
        stage(reporter, PipelineStage::ColorResolved, None, || {
            let (reduced, counted_layout) = match layout {
                ChannelLayout::Grayscale => (None, SampleLayout::SINGLE),
                ChannelLayout::Rgb => (
                    Some(backend.reduce_color(&input, layout.channels())?),
                    SampleLayout::SINGLE,
                ),
                ChannelLayout::Rgba => (None, layout.sample_layout()),
            };
            let counted = reduced.as_ref().unwrap_or(&input);
            let max_sample = backend.max_sample(counted, counted_layout)?;
            let mapping = BinMapping::new(effective_max_intensity(max_sample), num_bins)?;
            let sample_count = counted_layout.counted_samples(counted.len());
            debug!(
                max_sample,
                max_intensity = mapping.max_intensity,
                sample_count,
                "Color branch resolved"
            );
            Ok((reduced, counted_layout, mapping, sample_count))
        })?;
    let counted: &DeviceBuffer = reduced.as_ref().unwrap_or(&input);
    let total = u32::try_from(sample_count).map_err(|_| {
        HisteqError::Device(format!("{sample_count} samples exceed the u32 histogram range"))
    })?;

    let histogram = stage(
        reporter,
        PipelineStage::Histogrammed,
        Some(counted.len()),
        || backend.histogram(counted, counted_layout, mapping),
    )?;
    let cdf = stage(reporter, PipelineStage::Scanned, Some(num_bins), || {
        backend.inclusive_scan(&histogram)
    })?;
    let normalized = stage(reporter, PipelineStage::Normalized, Some(num_bins), || {
        backend.normalize(&cdf, total)
    })?;
    let lut = stage(reporter, PipelineStage::Scaled, Some(num_bins), || {
        backend.scale(&normalized)
    })?;
    let output = stage(
        reporter,
        PipelineStage::BackProjected,
        Some(image.size()),
        || backend.back_project(&input, &lut, layout.sample_layout(), mapping),
    )?;

    stage(reporter, PipelineStage::Done, None, || {
        let samples = backend.download_samples(&output)?;
        Ok(EqualizationOutput {
            image: ImageBuffer::new(image.width(), image.height(), image.channels(), samples)?,
            layout,
            max_intensity: mapping.max_intensity,
            sample_count,
            histogram: backend.download_counts(&histogram)?,
            cdf: backend.download_counts(&cdf)?,
            normalized: backend.download_levels(&normalized)?,
            lut: backend.download_counts(&lut)?,
        })
    })
}

/// Load, equalize and optionally encode on an already created backend.
pub fn run_pipeline_reported(
    config: &PipelineConfig,
    backend: Arc<dyn ComputeBackend>,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<PipelineOutput> {
    config.validate()?;
    let image = load_image(&config.input)?;
    info!(
        input = %config.input.display(),
        size = image.size(),
        "Image loaded"
    );

    let equalization = equalize(&image, config.num_bins, backend.as_ref(), reporter.as_ref())?;

    if let Some(path) = &config.output {
        save_image(&equalization.image, path)?;
        info!(output = %path.display(), "Equalized image written");
    }

    Ok(PipelineOutput {
        backend: backend.name().to_string(),
        equalization,
        written_to: config.output.clone(),
    })
}

/// Run the full pipeline on the device named by `config.device`.
///
/// Configuration errors (bin count, platform or device index, unreadable
/// input) are reported before the first stage is dispatched.
pub fn run_pipeline(
    config: &PipelineConfig,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<PipelineOutput> {
    config.validate()?;
    let backend = create_backend(config.device)?;
    run_pipeline_reported(config, backend, reporter)
}
