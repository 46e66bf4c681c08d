//! wgpu-based GPU compute backend (Vulkan / Metal / DX12 / GL).

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use tracing::{debug, info};
use wgpu::util::DeviceExt;

use crate::buffer::SampleLayout;
use crate::consts::{MAX_WORKGROUPS_PER_DIM, WORKGROUP_SIZE};
use crate::equalize::BinMapping;
use crate::error::{HisteqError, Result};

use super::devices::{DeviceInfo, DeviceSelection, PlatformInfo};
use super::kernels::Kernels;
use super::{BufferInner, ComputeBackend, DeviceBuffer, ElementKind};

/// wgpu backends exposed as platforms, in listing order.
const PLATFORM_BACKENDS: [(&str, wgpu::Backends); 4] = [
    ("Vulkan", wgpu::Backends::VULKAN),
    ("Metal", wgpu::Backends::METAL),
    ("DX12", wgpu::Backends::DX12),
    ("GL", wgpu::Backends::GL),
];

// ---------------------------------------------------------------------------
// Uniform parameters (must match `Params` in shaders/common.wgsl)
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Clone, Copy, Default, Pod, Zeroable)]
struct KernelParams {
    count: u32,
    row_stride: u32,
    channels: u32,
    skip_alpha: u32,
    max_intensity: u32,
    num_bins: u32,
    scan_offset: u32,
    total: u32,
}

impl KernelParams {
    fn counting(count: u32) -> Self {
        Self {
            count,
            ..Default::default()
        }
    }

    fn with_layout(mut self, layout: SampleLayout) -> Self {
        self.channels = layout.channels;
        self.skip_alpha = u32::from(layout.skip_alpha);
        self
    }

    fn with_mapping(mut self, mapping: BinMapping) -> Self {
        self.max_intensity = mapping.max_intensity;
        self.num_bins = mapping.num_bins;
        self
    }
}

/// Workgroup grid covering `invocations` threads. Returns `(x, y, row_stride)`
/// where `row_stride` is the number of invocations per grid row.
fn dispatch_grid(invocations: u32) -> (u32, u32, u32) {
    let groups = div_ceil(invocations, WORKGROUP_SIZE).max(1);
    let x = groups.min(MAX_WORKGROUPS_PER_DIM);
    let y = div_ceil(groups, x);
    (x, y, x * WORKGROUP_SIZE)
}

const fn div_ceil(a: u32, b: u32) -> u32 {
    a.div_ceil(b)
}

/// Storage size in bytes for `len` elements of `kind`. Samples are packed
/// four per word; every buffer holds at least one word.
fn storage_size(len: usize, kind: ElementKind) -> u64 {
    let bytes = match kind {
        ElementKind::Sample => len.div_ceil(4) * 4,
        ElementKind::Count | ElementKind::Level => len * 4,
    };
    bytes.max(4) as u64
}

fn to_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| HisteqError::Device(format!("{what} of {len} elements exceeds u32 range")))
}

fn supports_compute(adapter: &wgpu::Adapter) -> bool {
    adapter
        .get_downlevel_capabilities()
        .flags
        .contains(wgpu::DownlevelFlags::COMPUTE_SHADERS)
}

/// A wgpu backend exposed as a platform, with its compute-capable adapters
/// kept so a selection can open one without enumerating again.
pub(crate) struct GpuPlatform {
    pub(crate) info: PlatformInfo,
    adapters: Vec<wgpu::Adapter>,
}

impl GpuPlatform {
    /// Open the adapter named by `selection.device`.
    pub(crate) fn open(mut self, selection: DeviceSelection) -> Result<WgpuBackend> {
        if selection.device >= self.adapters.len() {
            return Err(HisteqError::InvalidDevice {
                platform: selection.platform,
                index: selection.device,
                available: self.adapters.len(),
            });
        }
        WgpuBackend::new(self.adapters.swap_remove(selection.device))
    }
}

/// One platform per wgpu backend that has at least one compute-capable
/// adapter, in listing order.
pub(crate) fn enumerate_gpu_platforms() -> Vec<GpuPlatform> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    PLATFORM_BACKENDS
        .iter()
        .filter_map(|&(name, backends)| {
            let adapters: Vec<wgpu::Adapter> =
                pollster::block_on(instance.enumerate_adapters(backends))
                    .into_iter()
                    .filter(supports_compute)
                    .collect();
            if adapters.is_empty() {
                return None;
            }
            let devices = adapters
                .iter()
                .map(|adapter| {
                    let info = adapter.get_info();
                    DeviceInfo {
                        name: info.name,
                        kind: format!("{:?}", info.device_type),
                    }
                })
                .collect();
            Some(GpuPlatform {
                info: PlatformInfo {
                    name: name.to_string(),
                    devices,
                },
                adapters,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// WgpuBackend
// ---------------------------------------------------------------------------

pub struct WgpuBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    adapter_name: String,
    max_binding_size: u64,
    kernels: Kernels,
}

impl WgpuBackend {
    pub fn new(adapter: wgpu::Adapter) -> Result<Self> {
        let adapter_name = adapter.get_info().name.clone();
        info!("GPU adapter: {adapter_name}");

        let limits = adapter.limits();
        let max_binding_size = u64::from(limits.max_storage_buffer_binding_size);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("histeq"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            ..Default::default()
        }))
        .map_err(|e| HisteqError::Device(format!("Failed to create GPU device: {e}")))?;

        let kernels = Kernels::build(&device)?;
        debug!("All kernels built for {adapter_name}");

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_name,
            max_binding_size,
            kernels,
        })
    }

    // --- Buffer helpers ---

    fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_binding_size {
            return Err(HisteqError::Device(format!(
                "buffer of {size} bytes exceeds the device binding limit of {} bytes",
                self.max_binding_size
            )));
        }
        Ok(())
    }

    fn create_storage_init(&self, contents: &[u8]) -> Result<wgpu::Buffer> {
        self.check_size(contents.len() as u64)?;
        Ok(self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: None,
                contents,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            }))
    }

    fn create_storage(&self, len: usize, kind: ElementKind) -> Result<DeviceBuffer> {
        let size = storage_size(len, kind);
        self.check_size(size)?;
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(wrap(buffer, len, kind))
    }

    fn create_zeroed_counts(&self, len: usize) -> Result<DeviceBuffer> {
        let zeros = vec![0u32; len.max(1)];
        let buffer = self.create_storage_init(bytemuck::cast_slice(&zeros))?;
        Ok(wrap(buffer, len, ElementKind::Count))
    }

    fn create_uniform(&self, params: &KernelParams) -> wgpu::Buffer {
        self.device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: None,
                contents: bytemuck::bytes_of(params),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
    }

    /// Block until all submitted work has completed.
    fn wait(&self) -> Result<()> {
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map(|_| ())
            .map_err(|e| HisteqError::Device(format!("device poll failed: {e}")))
    }

    fn download<T: Pod>(&self, buffer: &wgpu::Buffer, len: usize) -> Result<Vec<T>> {
        let size = buffer.size();
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: None,
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut enc = self.device.create_command_encoder(&Default::default());
        enc.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
        self.queue.submit(std::iter::once(enc.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        slice.map_async(wgpu::MapMode::Read, move |r| {
            tx.send(r).ok();
        });
        self.wait()?;
        rx.recv()
            .map_err(|_| HisteqError::Device("GPU channel closed".to_string()))?
            .map_err(|e| HisteqError::Device(format!("buffer mapping failed: {e}")))?;

        let data = slice.get_mapped_range();
        let mut result: Vec<T> = bytemuck::cast_slice(&data).to_vec();
        drop(data);
        staging.unmap();
        result.truncate(len);
        Ok(result)
    }

    /// Dispatch one compute pass covering `invocations` threads and wait for
    /// it. `params.row_stride` is filled in from the grid.
    fn dispatch(
        &self,
        pipeline: &wgpu::ComputePipeline,
        buffers: &[&wgpu::Buffer],
        mut params: KernelParams,
        invocations: u32,
    ) -> Result<()> {
        if invocations == 0 {
            return Ok(());
        }
        let (x, y, row_stride) = dispatch_grid(invocations);
        params.row_stride = row_stride;
        let uniform = self.create_uniform(&params);

        let mut entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(i, buffer)| wgpu::BindGroupEntry {
                binding: i as u32,
                resource: buffer.as_entire_binding(),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: buffers.len() as u32,
            resource: uniform.as_entire_binding(),
        });

        let layout = pipeline.get_bind_group_layout(0);
        let bg = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout: &layout,
            entries: &entries,
        });
        let mut enc = self.device.create_command_encoder(&Default::default());
        {
            let mut pass = enc.begin_compute_pass(&Default::default());
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bg, &[]);
            pass.dispatch_workgroups(x, y, 1);
        }
        self.queue.submit(std::iter::once(enc.finish()));
        self.wait()
    }

    fn copy_buffer(&self, src: &wgpu::Buffer, dst: &wgpu::Buffer) -> Result<()> {
        let mut enc = self.device.create_command_encoder(&Default::default());
        enc.copy_buffer_to_buffer(src, 0, dst, 0, src.size());
        self.queue.submit(std::iter::once(enc.finish()));
        self.wait()
    }
}

fn wrap(buffer: wgpu::Buffer, len: usize, kind: ElementKind) -> DeviceBuffer {
    DeviceBuffer {
        inner: BufferInner::Wgpu(buffer),
        len,
        kind,
    }
}

fn gpu_buf(buf: &DeviceBuffer, expected: ElementKind) -> Result<&wgpu::Buffer> {
    if buf.kind != expected {
        return Err(HisteqError::Device(format!(
            "expected a buffer of {expected:?}, got {:?}",
            buf.kind
        )));
    }
    match &buf.inner {
        BufferInner::Wgpu(buffer) => Ok(buffer),
        BufferInner::Host(_) => Err(HisteqError::Device(
            "WgpuBackend received a host buffer".to_string(),
        )),
    }
}

impl ComputeBackend for WgpuBackend {
    fn name(&self) -> &str {
        &self.adapter_name
    }

    fn is_gpu(&self) -> bool {
        true
    }

    fn upload_samples(&self, data: &[u8]) -> Result<DeviceBuffer> {
        let mut padded = data.to_vec();
        padded.resize(storage_size(data.len(), ElementKind::Sample) as usize, 0);
        let buffer = self.create_storage_init(&padded)?;
        Ok(wrap(buffer, data.len(), ElementKind::Sample))
    }

    fn download_samples(&self, buf: &DeviceBuffer) -> Result<Vec<u8>> {
        self.download(gpu_buf(buf, ElementKind::Sample)?, buf.len)
    }

    fn download_counts(&self, buf: &DeviceBuffer) -> Result<Vec<u32>> {
        self.download(gpu_buf(buf, ElementKind::Count)?, buf.len)
    }

    fn download_levels(&self, buf: &DeviceBuffer) -> Result<Vec<f32>> {
        self.download(gpu_buf(buf, ElementKind::Level)?, buf.len)
    }

    fn max_sample(&self, input: &DeviceBuffer, layout: SampleLayout) -> Result<u32> {
        let source = gpu_buf(input, ElementKind::Sample)?;
        let count = to_u32(input.len, "image")?;
        let result = self.create_zeroed_counts(1)?;
        let result_buf = gpu_buf(&result, ElementKind::Count)?;
        self.dispatch(
            &self.kernels.max_sample,
            &[source, result_buf],
            KernelParams::counting(count).with_layout(layout),
            count,
        )?;
        let max = self.download_counts(&result)?;
        Ok(max.first().copied().unwrap_or(0))
    }

    fn reduce_color(&self, input: &DeviceBuffer, channels: usize) -> Result<DeviceBuffer> {
        let source = gpu_buf(input, ElementKind::Sample)?;
        match channels {
            1 => {
                let out = self.create_storage(input.len, ElementKind::Sample)?;
                self.copy_buffer(source, gpu_buf(&out, ElementKind::Sample)?)?;
                Ok(out)
            }
            3 => {
                let pixels = input.len / 3;
                let count = to_u32(pixels, "image")?;
                let out = self.create_storage(pixels, ElementKind::Sample)?;
                self.dispatch(
                    &self.kernels.reduce_color,
                    &[source, gpu_buf(&out, ElementKind::Sample)?],
                    KernelParams::counting(count),
                    div_ceil(count, 4),
                )?;
                Ok(out)
            }
            4 => Err(HisteqError::ReductionUnsupported(4)),
            other => Err(HisteqError::UnsupportedChannels(other)),
        }
    }

    fn histogram(
        &self,
        input: &DeviceBuffer,
        layout: SampleLayout,
        mapping: BinMapping,
    ) -> Result<DeviceBuffer> {
        let source = gpu_buf(input, ElementKind::Sample)?;
        let count = to_u32(input.len, "image")?;
        let bins = self.create_zeroed_counts(mapping.num_bins as usize)?;
        self.dispatch(
            &self.kernels.histogram,
            &[source, gpu_buf(&bins, ElementKind::Count)?],
            KernelParams::counting(count)
                .with_layout(layout)
                .with_mapping(mapping),
            count,
        )?;
        Ok(bins)
    }

    fn inclusive_scan(&self, histogram: &DeviceBuffer) -> Result<DeviceBuffer> {
        let source = gpu_buf(histogram, ElementKind::Count)?;
        let n = to_u32(histogram.len, "histogram")?;
        let ping = self.create_storage(histogram.len, ElementKind::Count)?;
        let pong = self.create_storage(histogram.len, ElementKind::Count)?;
        self.copy_buffer(source, gpu_buf(&ping, ElementKind::Count)?)?;

        // Hillis-Steele: one pass per doubling of the offset, ping-ponging
        // between the two buffers.
        let mut result_in_ping = true;
        let mut offset = 1u32;
        while offset < n {
            let (src, dst) = if result_in_ping {
                (&ping, &pong)
            } else {
                (&pong, &ping)
            };
            self.dispatch(
                &self.kernels.scan_step,
                &[
                    gpu_buf(src, ElementKind::Count)?,
                    gpu_buf(dst, ElementKind::Count)?,
                ],
                KernelParams {
                    scan_offset: offset,
                    ..KernelParams::counting(n)
                },
                n,
            )?;
            result_in_ping = !result_in_ping;
            offset = offset.saturating_mul(2);
        }

        Ok(if result_in_ping { ping } else { pong })
    }

    fn normalize(&self, cdf: &DeviceBuffer, total: u32) -> Result<DeviceBuffer> {
        let source = gpu_buf(cdf, ElementKind::Count)?;
        let count = to_u32(cdf.len, "cdf")?;
        let out = self.create_storage(cdf.len, ElementKind::Level)?;
        self.dispatch(
            &self.kernels.normalize,
            &[source, gpu_buf(&out, ElementKind::Level)?],
            KernelParams {
                total,
                ..KernelParams::counting(count)
            },
            count,
        )?;
        Ok(out)
    }

    fn scale(&self, normalized: &DeviceBuffer) -> Result<DeviceBuffer> {
        let source = gpu_buf(normalized, ElementKind::Level)?;
        let count = to_u32(normalized.len, "normalized cdf")?;
        let out = self.create_storage(normalized.len, ElementKind::Count)?;
        self.dispatch(
            &self.kernels.scale,
            &[source, gpu_buf(&out, ElementKind::Count)?],
            KernelParams::counting(count),
            count,
        )?;
        Ok(out)
    }

    fn back_project(
        &self,
        input: &DeviceBuffer,
        lut: &DeviceBuffer,
        layout: SampleLayout,
        mapping: BinMapping,
    ) -> Result<DeviceBuffer> {
        if lut.len != mapping.num_bins as usize {
            return Err(HisteqError::Device(format!(
                "lookup table has {} entries, expected {}",
                lut.len, mapping.num_bins
            )));
        }
        let source = gpu_buf(input, ElementKind::Sample)?;
        let table = gpu_buf(lut, ElementKind::Count)?;
        let count = to_u32(input.len, "image")?;
        let out = self.create_storage(input.len, ElementKind::Sample)?;
        self.dispatch(
            &self.kernels.back_project,
            &[source, table, gpu_buf(&out, ElementKind::Sample)?],
            KernelParams::counting(count)
                .with_layout(layout)
                .with_mapping(mapping),
            div_ceil(count, 4),
        )?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_covers_every_invocation() {
        assert_eq!(dispatch_grid(1), (1, 1, 256));
        assert_eq!(dispatch_grid(256), (1, 1, 256));
        assert_eq!(dispatch_grid(257), (2, 1, 512));

        let big = 65_535 * 256 + 1;
        let (x, y, stride) = dispatch_grid(big);
        assert_eq!(x, 65_535);
        assert_eq!(y, 2);
        assert!(u64::from(x) * u64::from(y) * 256 >= u64::from(big));
        assert_eq!(stride, 65_535 * 256);
    }

    #[test]
    fn storage_is_word_padded() {
        assert_eq!(storage_size(0, ElementKind::Sample), 4);
        assert_eq!(storage_size(5, ElementKind::Sample), 8);
        assert_eq!(storage_size(8, ElementKind::Sample), 8);
        assert_eq!(storage_size(0, ElementKind::Count), 4);
        assert_eq!(storage_size(3, ElementKind::Level), 12);
    }

    #[test]
    fn params_match_uniform_layout() {
        assert_eq!(std::mem::size_of::<KernelParams>(), 32);
        let params = KernelParams::counting(10)
            .with_layout(SampleLayout {
                channels: 4,
                skip_alpha: true,
            })
            .with_mapping(BinMapping::new(256, 16).unwrap());
        let words: &[u32] = bytemuck::cast_slice(bytemuck::bytes_of(&params));
        assert_eq!(words, &[10, 0, 4, 1, 256, 16, 0, 0]);
    }
}
