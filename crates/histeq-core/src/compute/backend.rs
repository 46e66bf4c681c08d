use crate::buffer::SampleLayout;
use crate::equalize::BinMapping;
use crate::error::Result;

/// Element type held by a [`DeviceBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    /// 8-bit image or intensity samples.
    Sample,
    /// `u32` counts or lookup-table levels.
    Count,
    /// `f32` normalized values.
    Level,
}

#[derive(Debug)]
pub(crate) enum HostData {
    Samples(Vec<u8>),
    Counts(Vec<u32>),
    Levels(Vec<f32>),
}

#[derive(Debug)]
pub(crate) enum BufferInner {
    Host(HostData),
    #[cfg(feature = "gpu")]
    Wgpu(wgpu::Buffer),
}

/// Buffer owned by a compute backend. Only the backend that created it can
/// read or dispatch on it.
#[derive(Debug)]
pub struct DeviceBuffer {
    pub(crate) inner: BufferInner,
    pub(crate) len: usize,
    pub(crate) kind: ElementKind,
}

impl DeviceBuffer {
    pub(crate) fn host(data: HostData) -> Self {
        let (len, kind) = match &data {
            HostData::Samples(v) => (v.len(), ElementKind::Sample),
            HostData::Counts(v) => (v.len(), ElementKind::Count),
            HostData::Levels(v) => (v.len(), ElementKind::Level),
        };
        Self {
            inner: BufferInner::Host(data),
            len,
            kind,
        }
    }

    /// Logical element count.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }
}

/// Device routines of the equalization pipeline.
///
/// Every call blocks until the device has finished, so stages never overlap.
pub trait ComputeBackend: Send + Sync {
    fn name(&self) -> &str;

    fn is_gpu(&self) -> bool {
        false
    }

    fn upload_samples(&self, data: &[u8]) -> Result<DeviceBuffer>;

    fn download_samples(&self, buf: &DeviceBuffer) -> Result<Vec<u8>>;

    fn download_counts(&self, buf: &DeviceBuffer) -> Result<Vec<u32>>;

    fn download_levels(&self, buf: &DeviceBuffer) -> Result<Vec<f32>>;

    /// Largest counted sample of `input`.
    fn max_sample(&self, input: &DeviceBuffer, layout: SampleLayout) -> Result<u32>;

    /// One intensity sample per pixel of an interleaved `channels` buffer.
    fn reduce_color(&self, input: &DeviceBuffer, channels: usize) -> Result<DeviceBuffer>;

    fn histogram(
        &self,
        input: &DeviceBuffer,
        layout: SampleLayout,
        mapping: BinMapping,
    ) -> Result<DeviceBuffer>;

    /// Inclusive prefix sum of a count buffer.
    fn inclusive_scan(&self, histogram: &DeviceBuffer) -> Result<DeviceBuffer>;

    fn normalize(&self, cdf: &DeviceBuffer, total: u32) -> Result<DeviceBuffer>;

    /// Lookup table of output levels from a normalized CDF.
    fn scale(&self, normalized: &DeviceBuffer) -> Result<DeviceBuffer>;

    fn back_project(
        &self,
        input: &DeviceBuffer,
        lut: &DeviceBuffer,
        layout: SampleLayout,
        mapping: BinMapping,
    ) -> Result<DeviceBuffer>;
}
