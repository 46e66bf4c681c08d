//! WGSL kernel sources and their build step.
//!
//! Every source is parsed and validated with naga before the device sees it,
//! so a broken kernel surfaces as [`HisteqError::Build`] with the full log
//! instead of a device-side panic.

use tracing::debug;

use crate::error::{HisteqError, Result};

macro_rules! kernel_source {
    ($file:literal) => {
        concat!(include_str!("shaders/common.wgsl"), include_str!($file))
    };
}

/// A named kernel and its complete WGSL source.
#[derive(Clone, Copy, Debug)]
pub struct KernelSource {
    pub name: &'static str,
    pub source: &'static str,
}

pub const MAX_SAMPLE: KernelSource = KernelSource {
    name: "max_sample",
    source: kernel_source!("shaders/max_sample.wgsl"),
};

pub const REDUCE_COLOR: KernelSource = KernelSource {
    name: "reduce_color",
    source: kernel_source!("shaders/reduce_color.wgsl"),
};

pub const HISTOGRAM: KernelSource = KernelSource {
    name: "histogram",
    source: kernel_source!("shaders/histogram.wgsl"),
};

pub const SCAN_STEP: KernelSource = KernelSource {
    name: "scan_step",
    source: kernel_source!("shaders/scan_step.wgsl"),
};

pub const NORMALIZE: KernelSource = KernelSource {
    name: "normalize",
    source: kernel_source!("shaders/normalize.wgsl"),
};

pub const SCALE: KernelSource = KernelSource {
    name: "scale",
    source: kernel_source!("shaders/scale.wgsl"),
};

pub const BACK_PROJECT: KernelSource = KernelSource {
    name: "back_project",
    source: kernel_source!("shaders/back_project.wgsl"),
};

pub const ALL_KERNELS: [KernelSource; 7] = [
    MAX_SAMPLE,
    REDUCE_COLOR,
    HISTOGRAM,
    SCAN_STEP,
    NORMALIZE,
    SCALE,
    BACK_PROJECT,
];

const BUILD_OPTIONS: &str = "wgsl; naga ValidationFlags::all, Capabilities::all";

/// Parse and validate one kernel.
pub fn validate(kernel: &KernelSource) -> Result<()> {
    let module = naga::front::wgsl::parse_str(kernel.source).map_err(|e| HisteqError::Build {
        kernel: kernel.name.to_string(),
        status: "parse error".to_string(),
        options: BUILD_OPTIONS.to_string(),
        log: e.emit_to_string(kernel.source),
    })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| HisteqError::Build {
        kernel: kernel.name.to_string(),
        status: "validation error".to_string(),
        options: BUILD_OPTIONS.to_string(),
        log: format!("{e:?}"),
    })?;

    debug!(kernel = kernel.name, "Kernel validated");
    Ok(())
}

/// Compute pipelines of every kernel, built for one device.
pub(crate) struct Kernels {
    pub max_sample: wgpu::ComputePipeline,
    pub reduce_color: wgpu::ComputePipeline,
    pub histogram: wgpu::ComputePipeline,
    pub scan_step: wgpu::ComputePipeline,
    pub normalize: wgpu::ComputePipeline,
    pub scale: wgpu::ComputePipeline,
    pub back_project: wgpu::ComputePipeline,
}

impl Kernels {
    pub(crate) fn build(device: &wgpu::Device) -> Result<Self> {
        for kernel in &ALL_KERNELS {
            validate(kernel)?;
        }

        let pipe = |kernel: &KernelSource| {
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(kernel.name),
                source: wgpu::ShaderSource::Wgsl(kernel.source.into()),
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(kernel.name),
                layout: None,
                module: &module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            })
        };

        Ok(Self {
            max_sample: pipe(&MAX_SAMPLE),
            reduce_color: pipe(&REDUCE_COLOR),
            histogram: pipe(&HISTOGRAM),
            scan_step: pipe(&SCAN_STEP),
            normalize: pipe(&NORMALIZE),
            scale: pipe(&SCALE),
            back_project: pipe(&BACK_PROJECT),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kernel_validates() {
        for kernel in &ALL_KERNELS {
            if let Err(e) = validate(kernel) {
                panic!("{e}");
            }
        }
    }

    #[test]
    fn broken_kernel_reports_build_log() {
        let broken = KernelSource {
            name: "broken",
            source: "@compute @workgroup_size(1) fn main() { let x: u32 = ; }",
        };
        match validate(&broken) {
            Err(HisteqError::Build {
                kernel,
                status,
                options,
                log,
            }) => {
                assert_eq!(kernel, "broken");
                assert_eq!(status, "parse error");
                assert!(!options.is_empty());
                assert!(!log.is_empty());
            }
            other => panic!("expected build error, got {other:?}"),
        }
    }

    #[test]
    fn kernels_share_bin_mapping() {
        for kernel in [HISTOGRAM, BACK_PROJECT] {
            assert!(kernel.source.contains("fn bin_of("));
            assert!(kernel.source.contains("bin_of(value, params.max_intensity, params.num_bins)"));
        }
    }
}
