use rayon::prelude::*;

use crate::buffer::SampleLayout;
use crate::consts::{MAX_BINS, MAX_EFFECTIVE_INTENSITY, OUTPUT_LEVELS, PARALLEL_SAMPLE_THRESHOLD};
use crate::error::{HisteqError, Result};

/// Bin index of `value` for an image whose effective max intensity is
/// `max_intensity`: `floor(value * num_bins / max_intensity)`, clamped to the
/// last bin.
///
/// Integer arithmetic only, so histogram construction and back-projection
/// agree on every backend. `value * num_bins` fits in `u32` for every 8-bit
/// sample and `num_bins <= 65536`.
#[inline]
pub fn bin_of(value: u32, max_intensity: u32, num_bins: u32) -> u32 {
    (value * num_bins / max_intensity).min(num_bins - 1)
}

/// Smallest power of two strictly greater than `max_sample`, capped at 2^16.
pub fn effective_max_intensity(max_sample: u32) -> u32 {
    (max_sample + 1)
        .next_power_of_two()
        .min(MAX_EFFECTIVE_INTENSITY)
}

/// Ratio between the 256 native output levels and the bin count.
///
/// Fractional for bin counts that do not divide 256. The lookup table
/// already holds final output levels, so this is informational only.
pub fn scale_factor(num_bins: usize) -> f64 {
    OUTPUT_LEVELS as f64 / num_bins as f64
}

/// Reject bin counts outside `1..=65536`.
pub fn validate_num_bins(num_bins: usize) -> Result<()> {
    if num_bins == 0 || num_bins > MAX_BINS {
        return Err(HisteqError::InvalidBinCount(num_bins));
    }
    Ok(())
}

/// Sample-to-bin mapping shared by the histogram and back-projection stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinMapping {
    pub max_intensity: u32,
    pub num_bins: u32,
}

impl BinMapping {
    /// Validates `num_bins` and clamps `max_intensity` to `1..=65536`.
    pub fn new(max_intensity: u32, num_bins: usize) -> Result<Self> {
        validate_num_bins(num_bins)?;
        Ok(Self {
            max_intensity: max_intensity.clamp(1, MAX_EFFECTIVE_INTENSITY),
            num_bins: num_bins as u32,
        })
    }

    /// Bin index of `value`, usable directly as a table index.
    #[inline]
    pub fn bin_of(&self, value: u32) -> usize {
        bin_of(value, self.max_intensity, self.num_bins) as usize
    }
}

/// Largest counted sample, or 0 when nothing is counted.
pub fn max_counted_sample(samples: &[u8], layout: SampleLayout) -> u32 {
    let max = if samples.len() >= PARALLEL_SAMPLE_THRESHOLD {
        samples
            .par_iter()
            .enumerate()
            .filter(|(i, _)| layout.is_counted(*i))
            .map(|(_, &v)| v)
            .max()
    } else {
        samples
            .iter()
            .enumerate()
            .filter(|(i, _)| layout.is_counted(*i))
            .map(|(_, &v)| v)
            .max()
    };
    max.map_or(0, u32::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ChannelLayout;

    #[test]
    fn effective_max_is_strictly_greater_power_of_two() {
        assert_eq!(effective_max_intensity(0), 1);
        assert_eq!(effective_max_intensity(1), 2);
        assert_eq!(effective_max_intensity(64), 128);
        assert_eq!(effective_max_intensity(100), 128);
        assert_eq!(effective_max_intensity(127), 128);
        assert_eq!(effective_max_intensity(128), 256);
        assert_eq!(effective_max_intensity(255), 256);
        assert_eq!(effective_max_intensity(65_535), 65_536);
        assert_eq!(effective_max_intensity(70_000), 65_536);
    }

    #[test]
    fn bin_of_covers_full_range() {
        assert_eq!(bin_of(0, 256, 4), 0);
        assert_eq!(bin_of(64, 256, 4), 1);
        assert_eq!(bin_of(128, 256, 4), 2);
        assert_eq!(bin_of(255, 256, 4), 3);
        assert_eq!(bin_of(100, 128, 256), 200);
        assert_eq!(bin_of(255, 256, 65_536), 65_280);
        assert_eq!(bin_of(255, 65_536, 65_536), 255);
    }

    #[test]
    fn bin_of_clamps_values_above_max() {
        // A colour channel can exceed the luma-derived max intensity.
        assert_eq!(bin_of(255, 128, 16), 15);
        assert_eq!(bin_of(0, 1, 1), 0);
    }

    #[test]
    fn mapping_matches_free_function() {
        let mapping = BinMapping::new(128, 100).unwrap();
        for v in 0..=255u32 {
            assert_eq!(mapping.bin_of(v), bin_of(v, 128, 100) as usize);
        }
    }

    #[test]
    fn rejects_out_of_range_bin_counts() {
        assert!(matches!(
            validate_num_bins(0),
            Err(HisteqError::InvalidBinCount(0))
        ));
        assert!(matches!(
            validate_num_bins(MAX_BINS + 1),
            Err(HisteqError::InvalidBinCount(_))
        ));
        assert!(validate_num_bins(1).is_ok());
        assert!(validate_num_bins(MAX_BINS).is_ok());
    }

    #[test]
    fn scale_factor_is_fractional_for_non_divisors() {
        assert_eq!(scale_factor(256), 1.0);
        assert_eq!(scale_factor(4), 64.0);
        assert!((scale_factor(100) - 2.56).abs() < 1e-12);
    }

    #[test]
    fn max_sample_ignores_alpha() {
        let samples = [10, 20, 30, 255, 40, 5, 6, 250];
        assert_eq!(max_counted_sample(&samples, ChannelLayout::Rgba.sample_layout()), 40);
        assert_eq!(max_counted_sample(&samples, SampleLayout::SINGLE), 255);
        assert_eq!(max_counted_sample(&[], SampleLayout::SINGLE), 0);
    }

    #[test]
    fn max_sample_parallel_path() {
        let mut samples = vec![3u8; PARALLEL_SAMPLE_THRESHOLD * 2];
        samples[PARALLEL_SAMPLE_THRESHOLD + 7] = 201;
        assert_eq!(max_counted_sample(&samples, SampleLayout::SINGLE), 201);
    }
}
