use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::error::{HisteqError, Result};

/// Channel arrangement of an interleaved 8-bit image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelLayout {
    Grayscale,
    Rgb,
    Rgba,
}

impl ChannelLayout {
    pub fn from_channels(channels: usize) -> Result<Self> {
        match channels {
            1 => Ok(Self::Grayscale),
            3 => Ok(Self::Rgb),
            4 => Ok(Self::Rgba),
            other => Err(HisteqError::UnsupportedChannels(other)),
        }
    }

    pub fn channels(self) -> usize {
        match self {
            Self::Grayscale => 1,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, Self::Rgba)
    }

    /// Layout used when remapping the full image through the lookup table.
    /// Alpha is passed through untouched.
    pub fn sample_layout(self) -> SampleLayout {
        SampleLayout {
            channels: self.channels() as u32,
            skip_alpha: self.has_alpha(),
        }
    }
}

impl std::fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grayscale => write!(f, "Grayscale"),
            Self::Rgb => write!(f, "RGB"),
            Self::Rgba => write!(f, "RGBA"),
        }
    }
}

/// Which samples of an interleaved buffer take part in histogramming and
/// back-projection. With `skip_alpha` the last channel of every pixel is
/// excluded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleLayout {
    pub channels: u32,
    pub skip_alpha: bool,
}

impl SampleLayout {
    /// One intensity sample per pixel, every sample counted.
    pub const SINGLE: SampleLayout = SampleLayout {
        channels: 1,
        skip_alpha: false,
    };

    #[inline]
    pub fn is_counted(&self, index: usize) -> bool {
        let channels = self.channels as usize;
        !self.skip_alpha || index % channels != channels - 1
    }

    /// Number of counted samples in a buffer of `len` samples.
    pub fn counted_samples(&self, len: usize) -> usize {
        if self.skip_alpha {
            let channels = self.channels as usize;
            let pixels = len / channels;
            let tail = len % channels;
            pixels * (channels - 1) + tail.min(channels - 1)
        } else {
            len
        }
    }
}

/// An 8-bit interleaved image. Samples are stored row-major with shape
/// `(height, width, channels)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageBuffer {
    data: Array3<u8>,
    layout: ChannelLayout,
}

impl ImageBuffer {
    pub fn new(width: usize, height: usize, channels: usize, samples: Vec<u8>) -> Result<Self> {
        let layout = ChannelLayout::from_channels(channels)?;
        let len = samples.len();
        let data = Array3::from_shape_vec((height, width, channels), samples).map_err(|_| {
            HisteqError::InvalidDimensions {
                width,
                height,
                channels,
                len,
            }
        })?;
        Ok(Self { data, layout })
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn pixel_count(&self) -> usize {
        self.width() * self.height()
    }

    /// Total sample count, `width * height * channels`.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &Array3<u8> {
        &self.data
    }

    /// Interleaved samples in row-major order.
    pub fn samples(&self) -> &[u8] {
        self.data
            .as_slice()
            .expect("image buffer is built in standard layout")
    }
}
