//! Host implementations of the equalization stages.
//!
//! These are the kernels run by the CPU backend and the reference the GPU
//! kernels are tested against.

pub mod backproject;
pub mod color;
pub mod histogram;
pub mod intensity;
pub mod normalize;
pub mod scan;

pub use intensity::{bin_of, effective_max_intensity, scale_factor, validate_num_bins, BinMapping};
