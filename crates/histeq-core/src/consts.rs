/// Minimum sample count to use Rayon parallelism in the CPU kernels.
pub const PARALLEL_SAMPLE_THRESHOLD: usize = 65_536;

/// Minimum bin count to use the blocked parallel scan on the CPU.
pub const PARALLEL_SCAN_THRESHOLD: usize = 4_096;

/// Block length of the CPU parallel scan.
pub const SCAN_BLOCK_LEN: usize = 1_024;

/// Number of intensity levels of an 8-bit output image.
pub const OUTPUT_LEVELS: u32 = 256;

/// Largest 8-bit output level.
pub const MAX_OUTPUT_LEVEL: u32 = OUTPUT_LEVELS - 1;

/// Upper bound of the effective max intensity (2^16).
pub const MAX_EFFECTIVE_INTENSITY: u32 = 1 << 16;

/// Largest accepted histogram bin count.
pub const MAX_BINS: usize = 1 << 16;

/// Bin count used when none is configured.
pub const DEFAULT_NUM_BINS: usize = 256;

/// Input file used when none is configured.
pub const DEFAULT_INPUT_FILE: &str = "test.pgm";

/// ITU-R BT.601 luma weight of the red channel, per mille.
pub const LUMA_WEIGHT_R: u32 = 299;

/// ITU-R BT.601 luma weight of the green channel, per mille.
pub const LUMA_WEIGHT_G: u32 = 587;

/// ITU-R BT.601 luma weight of the blue channel, per mille.
pub const LUMA_WEIGHT_B: u32 = 114;

/// Sum of the luma weights.
pub const LUMA_WEIGHT_TOTAL: u32 = LUMA_WEIGHT_R + LUMA_WEIGHT_G + LUMA_WEIGHT_B;

/// Invocations per workgroup of the 1-D compute kernels.
pub const WORKGROUP_SIZE: u32 = 256;

/// Maximum workgroup count per dispatch dimension.
pub const MAX_WORKGROUPS_PER_DIM: u32 = 65_535;
