#![allow(dead_code)]

use histeq_core::buffer::ImageBuffer;
use histeq_core::compute::cpu::CpuBackend;
use histeq_core::pipeline::{equalize, EqualizationOutput, NoOpReporter};

/// Deterministic pseudo-random samples (64-bit LCG, high byte).
pub fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 56) as u8
        })
        .collect()
}

pub fn gray(width: usize, height: usize, samples: Vec<u8>) -> ImageBuffer {
    ImageBuffer::new(width, height, 1, samples).unwrap()
}

pub fn noise_image(width: usize, height: usize, channels: usize, seed: u64) -> ImageBuffer {
    ImageBuffer::new(width, height, channels, noise(width * height * channels, seed)).unwrap()
}

pub fn equalize_cpu(image: &ImageBuffer, num_bins: usize) -> EqualizationOutput {
    equalize(image, num_bins, &CpuBackend, &NoOpReporter).unwrap()
}

/// Invariants every run must satisfy, whatever the input.
pub fn assert_invariants(out: &EqualizationOutput, num_bins: usize) {
    let n = out.sample_count as u64;
    assert_eq!(out.histogram.len(), num_bins);
    assert_eq!(out.cdf.len(), num_bins);
    assert_eq!(out.normalized.len(), num_bins);
    assert_eq!(out.lut.len(), num_bins);

    let sum: u64 = out.histogram.iter().map(|&c| c as u64).sum();
    assert_eq!(sum, n, "histogram must count every sample");
    assert_eq!(*out.cdf.last().unwrap() as u64, n, "cdf must end at N");

    assert!(out.cdf.windows(2).all(|w| w[0] <= w[1]), "cdf not monotone");
    assert!(
        out.normalized.windows(2).all(|w| w[0] <= w[1]),
        "normalized cdf not monotone"
    );
    assert!(out.normalized.iter().all(|&v| (0.0..=1.0).contains(&v)));
    if n > 0 {
        approx::assert_abs_diff_eq!(*out.normalized.last().unwrap(), 1.0, epsilon = 1e-5);
    }

    assert!(out.lut.windows(2).all(|w| w[0] <= w[1]), "lut not monotone");
    assert!(out.lut.iter().all(|&v| v <= 255));
}
