use rayon::prelude::*;

use crate::consts::{MAX_OUTPUT_LEVEL, PARALLEL_SCAN_THRESHOLD};

/// Divide the cumulative histogram by the sample count.
///
/// An empty image has no distribution; every entry is 0.
pub fn normalize(cdf: &[u32], total: u32) -> Vec<f32> {
    if total == 0 {
        return vec![0.0; cdf.len()];
    }
    let total = total as f32;
    if cdf.len() >= PARALLEL_SCAN_THRESHOLD {
        cdf.par_iter().map(|&c| c as f32 / total).collect()
    } else {
        cdf.iter().map(|&c| c as f32 / total).collect()
    }
}

/// Output level of one normalized CDF entry: `norm * 255`, rounded half up
/// and clamped to `[0, 255]`.
#[inline]
pub fn output_level(norm: f32) -> u32 {
    (norm * MAX_OUTPUT_LEVEL as f32 + 0.5)
        .floor()
        .clamp(0.0, MAX_OUTPUT_LEVEL as f32) as u32
}

/// Map the normalized CDF to the lookup table of output levels.
pub fn scale(normalized: &[f32]) -> Vec<u32> {
    if normalized.len() >= PARALLEL_SCAN_THRESHOLD {
        normalized.par_iter().map(|&n| output_level(n)).collect()
    } else {
        normalized.iter().map(|&n| output_level(n)).collect()
    }
}
