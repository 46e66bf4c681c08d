use rayon::prelude::*;

use crate::consts::{
    LUMA_WEIGHT_B, LUMA_WEIGHT_G, LUMA_WEIGHT_R, LUMA_WEIGHT_TOTAL, PARALLEL_SAMPLE_THRESHOLD,
};
use crate::error::{HisteqError, Result};

/// BT.601 luma of one RGB pixel, rounded half up.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = LUMA_WEIGHT_R * r as u32 + LUMA_WEIGHT_G * g as u32 + LUMA_WEIGHT_B * b as u32;
    ((weighted + LUMA_WEIGHT_TOTAL / 2) / LUMA_WEIGHT_TOTAL) as u8
}

/// Collapse interleaved samples to one intensity sample per pixel.
///
/// Identity for single-channel input. Alpha-bearing input has no defined
/// reduction and is rejected.
pub fn reduce_to_intensity(samples: &[u8], channels: usize) -> Result<Vec<u8>> {
    match channels {
        1 => Ok(samples.to_vec()),
        3 => Ok(reduce_rgb(samples)),
        4 => Err(HisteqError::ReductionUnsupported(4)),
        other => Err(HisteqError::UnsupportedChannels(other)),
    }
}

fn reduce_rgb(samples: &[u8]) -> Vec<u8> {
    if samples.len() >= PARALLEL_SAMPLE_THRESHOLD {
        samples
            .par_chunks_exact(3)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect()
    } else {
        samples
            .chunks_exact(3)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luma_weights_sum_to_one() {
        assert_eq!(luma(0, 0, 0), 0);
        assert_eq!(luma(255, 255, 255), 255);
        assert_eq!(luma(100, 100, 100), 100);
    }

    #[test]
    fn luma_rounds_to_nearest() {
        // 0.299 * 255 = 76.245
        assert_eq!(luma(255, 0, 0), 76);
        // 0.587 * 255 = 149.685
        assert_eq!(luma(0, 255, 0), 150);
        // 0.114 * 255 = 29.07
        assert_eq!(luma(0, 0, 255), 29);
    }

    #[test]
    fn grayscale_is_identity() {
        let samples = vec![0, 7, 200, 255];
        assert_eq!(reduce_to_intensity(&samples, 1).unwrap(), samples);
    }

    #[test]
    fn rgb_reduces_one_sample_per_pixel() {
        let samples = [255, 0, 0, 10, 10, 10];
        assert_eq!(reduce_to_intensity(&samples, 3).unwrap(), vec![76, 10]);
    }

    #[test]
    fn rgba_reduction_is_rejected() {
        let err = reduce_to_intensity(&[0; 8], 4).unwrap_err();
        assert!(matches!(err, HisteqError::ReductionUnsupported(4)));
        let err = reduce_to_intensity(&[0; 4], 2).unwrap_err();
        assert!(matches!(err, HisteqError::UnsupportedChannels(2)));
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let samples: Vec<u8> = (0..PARALLEL_SAMPLE_THRESHOLD * 3)
            .map(|i| (i * 37 % 256) as u8)
            .collect();
        let parallel = reduce_rgb(&samples);
        let sequential: Vec<u8> = samples
            .chunks_exact(3)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect();
        assert_eq!(parallel, sequential);
    }
}
