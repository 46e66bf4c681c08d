use thiserror::Error;

#[derive(Error, Debug)]
pub enum HisteqError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Invalid image dimensions: {width}x{height}x{channels} does not hold {len} samples")]
    InvalidDimensions {
        width: usize,
        height: usize,
        channels: usize,
        len: usize,
    },

    #[error("Unsupported channel count: {0} (expected 1, 3 or 4)")]
    UnsupportedChannels(usize),

    #[error("Color reduction is not defined for {0}-channel sources")]
    ReductionUnsupported(usize),

    #[error("Invalid bin count {0} (expected 1..=65536)")]
    InvalidBinCount(usize),

    #[error("Platform index {index} out of range (available: {available})")]
    InvalidPlatform { index: usize, available: usize },

    #[error("Device index {index} out of range for platform {platform} (available: {available})")]
    InvalidDevice {
        platform: usize,
        index: usize,
        available: usize,
    },

    #[error("Kernel `{kernel}` failed to build\nBuild Status: {status}\nBuild Options: {options}\nBuild Log:\n{log}")]
    Build {
        kernel: String,
        status: String,
        options: String,
        log: String,
    },

    #[error("Device error: {0}")]
    Device(String),
}

pub type Result<T> = std::result::Result<T, HisteqError>;
