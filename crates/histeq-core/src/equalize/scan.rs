use rayon::prelude::*;

use crate::consts::{PARALLEL_SCAN_THRESHOLD, SCAN_BLOCK_LEN};

/// In-place inclusive prefix sum: `values[i] = sum(values[0..=i])`.
///
/// Long inputs use a blocked scan: every block is scanned independently,
/// block totals are scanned sequentially, then each block is shifted by the
/// total of the blocks before it. Integer addition makes this identical to a
/// left-to-right accumulation.
pub fn inclusive_scan(values: &mut [u32]) {
    if values.len() >= PARALLEL_SCAN_THRESHOLD {
        inclusive_scan_blocked(values, SCAN_BLOCK_LEN);
    } else {
        inclusive_scan_sequential(values);
    }
}

fn inclusive_scan_sequential(values: &mut [u32]) {
    let mut running = 0u32;
    for v in values.iter_mut() {
        running += *v;
        *v = running;
    }
}

fn inclusive_scan_blocked(values: &mut [u32], block_len: usize) {
    let block_totals: Vec<u32> = values
        .par_chunks_mut(block_len)
        .map(|block| {
            inclusive_scan_sequential(block);
            block.last().copied().unwrap_or(0)
        })
        .collect();

    let mut offsets = Vec::with_capacity(block_totals.len());
    let mut running = 0u32;
    for total in block_totals {
        offsets.push(running);
        running += total;
    }

    values
        .par_chunks_mut(block_len)
        .zip(offsets.par_iter())
        .filter(|(_, offset)| **offset != 0)
        .for_each(|(block, &offset)| block.iter_mut().for_each(|v| *v += offset));
}
