use rayon::prelude::*;

use crate::buffer::SampleLayout;
use crate::consts::{MAX_OUTPUT_LEVEL, PARALLEL_SAMPLE_THRESHOLD};

use super::intensity::BinMapping;

/// Remap every counted sample through the lookup table. Uncounted samples
/// (alpha) are copied unchanged.
///
/// `lut` must hold `mapping.num_bins` levels; entries above 255 are clamped.
/// The output has the same length and interleaving as `samples`.
pub fn back_project(
    samples: &[u8],
    layout: SampleLayout,
    lut: &[u32],
    mapping: BinMapping,
) -> Vec<u8> {
    let remap = |(i, &v): (usize, &u8)| -> u8 {
        if layout.is_counted(i) {
            lut[mapping.bin_of(v as u32)].min(MAX_OUTPUT_LEVEL) as u8
        } else {
            v
        }
    };
    if samples.len() >= PARALLEL_SAMPLE_THRESHOLD {
        samples.par_iter().enumerate().map(remap).collect()
    } else {
        samples.iter().enumerate().map(remap).collect()
    }
}
