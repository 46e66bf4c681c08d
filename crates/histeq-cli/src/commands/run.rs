use std::sync::Arc;

use anyhow::{Context, Result};
use histeq_core::compute::open_device;
use histeq_core::pipeline::config::PipelineConfig;
use histeq_core::pipeline::{run_pipeline_reported, PipelineStage, ProgressReporter};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::summary::{print_equalization, print_run_summary};

/// Number of stages `equalize` reports.
const STAGE_COUNT: u64 = 8;

/// Drives an indicatif bar, one step per pipeline stage.
struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    fn new() -> Result<Self> {
        let bar = ProgressBar::new(STAGE_COUNT);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg:24} [{bar:40}] {pos}/{len}")?
                .progress_chars("=> "),
        );
        Ok(Self { bar })
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        if let (PipelineStage::Loaded, Some(size)) = (stage, total_items) {
            self.bar.println(format!("Image Size: {size} bytes"));
        }
        self.bar.set_message(stage.to_string());
    }

    fn finish_stage(&self) {
        self.bar.inc(1);
    }
}

pub fn run(config: &PipelineConfig) -> Result<()> {
    let opened = open_device(config.device).context("Failed to select compute device")?;
    println!("Running on {}, {}", opened.platform, opened.device);
    info!(backend = opened.backend.name(), "Backend ready");

    print_run_summary(config, &opened.device);

    let reporter = Arc::new(BarReporter::new()?);
    let result = run_pipeline_reported(config, opened.backend, reporter.clone())
        .with_context(|| format!("Failed to equalize {}", config.input.display()))?;
    reporter.bar.finish_with_message("Done");
    println!();

    print_equalization(&result.equalization);

    if let Some(ref path) = result.written_to {
        println!("\nOutput saved to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use histeq_core::buffer::ImageBuffer;
    use histeq_core::compute::{list_platforms, DeviceSelection};
    use histeq_core::io::{load_image, save_image};

    use super::*;

    fn host() -> DeviceSelection {
        DeviceSelection {
            platform: list_platforms().len() - 1,
            device: 0,
        }
    }

    #[test]
    fn run_writes_equalized_image() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.png");
        let samples: Vec<u8> = (0..64u32).map(|i| (i * 2) as u8).collect();
        save_image(&ImageBuffer::new(8, 8, 1, samples).unwrap(), &input).unwrap();

        let config = PipelineConfig {
            input,
            output: Some(output.clone()),
            num_bins: 16,
            device: host(),
        };
        run(&config).unwrap();

        let written = load_image(&output).unwrap();
        assert_eq!(written.size(), 64);
        assert_eq!(written.samples().iter().max(), Some(&255));
    }

    #[test]
    fn bad_device_fails_before_loading() {
        let config = PipelineConfig {
            input: "missing.pgm".into(),
            device: DeviceSelection {
                device: 7,
                ..host()
            },
            ..PipelineConfig::default()
        };
        let err = run(&config).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to select compute device"));
    }
}
