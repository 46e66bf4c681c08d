use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::compute::DeviceSelection;
use crate::consts::{DEFAULT_INPUT_FILE, DEFAULT_NUM_BINS};
use crate::equalize::validate_num_bins;
use crate::error::Result;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_input")]
    pub input: PathBuf,
    /// Where to encode the equalized image. Nothing is written when unset.
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default = "default_num_bins")]
    pub num_bins: usize,
    #[serde(default)]
    pub device: DeviceSelection,
}

fn default_input() -> PathBuf {
    PathBuf::from(DEFAULT_INPUT_FILE)
}

fn default_num_bins() -> usize {
    DEFAULT_NUM_BINS
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            output: None,
            num_bins: default_num_bins(),
            device: DeviceSelection::default(),
        }
    }
}

impl PipelineConfig {
    /// Checks that need no device or file access.
    pub fn validate(&self) -> Result<()> {
        validate_num_bins(self.num_bins)
    }
}
