use std::path::PathBuf;

use crate::buffer::{ChannelLayout, ImageBuffer};

/// Equalization stage, used for progress reporting. Each variant names the
/// state the pipeline is in once the stage has finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineStage {
    Loaded,
    ColorResolved,
    Histogrammed,
    Scanned,
    Normalized,
    Scaled,
    BackProjected,
    Done,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded => write!(f, "Uploading image"),
            Self::ColorResolved => write!(f, "Resolving color branch"),
            Self::Histogrammed => write!(f, "Building histogram"),
            Self::Scanned => write!(f, "Scanning histogram"),
            Self::Normalized => write!(f, "Normalizing"),
            Self::Scaled => write!(f, "Scaling lookup table"),
            Self::BackProjected => write!(f, "Back-projecting"),
            Self::Done => write!(f, "Reading back results"),
        }
    }
}

/// Output image plus every intermediate of one equalization run.
#[derive(Clone, Debug)]
pub struct EqualizationOutput {
    pub image: ImageBuffer,
    pub layout: ChannelLayout,
    pub max_intensity: u32,
    /// Number of samples that were histogrammed (N).
    pub sample_count: usize,
    pub histogram: Vec<u32>,
    pub cdf: Vec<u32>,
    pub normalized: Vec<f32>,
    pub lut: Vec<u32>,
}

#[derive(Clone, Debug)]
pub struct PipelineOutput {
    /// Name of the backend the run executed on.
    pub backend: String,
    pub equalization: EqualizationOutput,
    /// Set when the image was encoded to disk.
    pub written_to: Option<PathBuf>,
}

/// Thread-safe progress reporting for the pipeline.
///
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of samples or
    /// bins the stage processes, if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

pub struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
