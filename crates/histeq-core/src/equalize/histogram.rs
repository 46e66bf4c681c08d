use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;

use crate::buffer::SampleLayout;
use crate::consts::PARALLEL_SAMPLE_THRESHOLD;

use super::intensity::BinMapping;

/// Count counted samples per bin.
///
/// Returns `mapping.num_bins` counts summing to the number of counted
/// samples; an empty input yields all zeros. Large inputs are binned by Rayon
/// workers incrementing shared atomic bins, so the result is independent of
/// scheduling.
pub fn histogram(samples: &[u8], layout: SampleLayout, mapping: BinMapping) -> Vec<u32> {
    if samples.len() >= PARALLEL_SAMPLE_THRESHOLD {
        histogram_parallel(samples, layout, mapping)
    } else {
        histogram_sequential(samples, layout, mapping)
    }
}

fn histogram_parallel(samples: &[u8], layout: SampleLayout, mapping: BinMapping) -> Vec<u32> {
    let bins: Vec<AtomicU32> = (0..mapping.num_bins).map(|_| AtomicU32::new(0)).collect();
    samples
        .par_iter()
        .enumerate()
        .filter(|(i, _)| layout.is_counted(*i))
        .for_each(|(_, &v)| {
            bins[mapping.bin_of(v as u32)].fetch_add(1, Ordering::Relaxed);
        });
    bins.into_iter().map(AtomicU32::into_inner).collect()
}

fn histogram_sequential(samples: &[u8], layout: SampleLayout, mapping: BinMapping) -> Vec<u32> {
    let mut bins = vec![0u32; mapping.num_bins as usize];
    for (i, &v) in samples.iter().enumerate() {
        if layout.is_counted(i) {
            bins[mapping.bin_of(v as u32)] += 1;
        }
    }
    bins
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ChannelLayout;

    fn mapping(max_intensity: u32, num_bins: usize) -> BinMapping {
        BinMapping::new(max_intensity, num_bins).unwrap()
    }

    #[test]
    fn four_bins_one_sample_each() {
        let hist = histogram(&[0, 64, 128, 255], SampleLayout::SINGLE, mapping(256, 4));
        assert_eq!(hist, vec![1, 1, 1, 1]);
    }

    #[test]
    fn empty_input_gives_zero_bins() {
        let hist = histogram(&[], SampleLayout::SINGLE, mapping(1, 8));
        assert_eq!(hist, vec![0; 8]);
    }

    #[test]
    fn alpha_is_not_counted() {
        let samples = [0, 0, 0, 255, 255, 255, 255, 0];
        let hist = histogram(&samples, ChannelLayout::Rgba.sample_layout(), mapping(256, 2));
        assert_eq!(hist, vec![3, 3]);
    }

    #[test]
    fn parallel_matches_sequential_and_sums_to_n() {
        let samples: Vec<u8> = (0..PARALLEL_SAMPLE_THRESHOLD * 3 + 17)
            .map(|i| ((i * 7919) % 251) as u8)
            .collect();
        let m = mapping(256, 100);
        let parallel = histogram_parallel(&samples, SampleLayout::SINGLE, m);
        let sequential = histogram_sequential(&samples, SampleLayout::SINGLE, m);
        assert_eq!(parallel, sequential);
        let total: u64 = parallel.iter().map(|&c| c as u64).sum();
        assert_eq!(total, samples.len() as u64);
    }
}
