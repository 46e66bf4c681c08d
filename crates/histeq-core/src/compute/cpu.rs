use crate::buffer::SampleLayout;
use crate::equalize::backproject::back_project;
use crate::equalize::color::reduce_to_intensity;
use crate::equalize::histogram::histogram;
use crate::equalize::intensity::max_counted_sample;
use crate::equalize::normalize::{normalize, scale};
use crate::equalize::scan::inclusive_scan;
use crate::equalize::BinMapping;
use crate::error::{HisteqError, Result};

use super::{BufferInner, ComputeBackend, DeviceBuffer, HostData};

/// CPU backend using Rayon for parallelism.
pub struct CpuBackend;

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &str {
        "CPU/Rayon"
    }

    fn upload_samples(&self, data: &[u8]) -> Result<DeviceBuffer> {
        Ok(DeviceBuffer::host(HostData::Samples(data.to_vec())))
    }

    fn download_samples(&self, buf: &DeviceBuffer) -> Result<Vec<u8>> {
        host_samples(buf).map(<[u8]>::to_vec)
    }

    fn download_counts(&self, buf: &DeviceBuffer) -> Result<Vec<u32>> {
        host_counts(buf).map(<[u32]>::to_vec)
    }

    fn download_levels(&self, buf: &DeviceBuffer) -> Result<Vec<f32>> {
        host_levels(buf).map(<[f32]>::to_vec)
    }

    fn max_sample(&self, input: &DeviceBuffer, layout: SampleLayout) -> Result<u32> {
        Ok(max_counted_sample(host_samples(input)?, layout))
    }

    fn reduce_color(&self, input: &DeviceBuffer, channels: usize) -> Result<DeviceBuffer> {
        let reduced = reduce_to_intensity(host_samples(input)?, channels)?;
        Ok(DeviceBuffer::host(HostData::Samples(reduced)))
    }

    fn histogram(
        &self,
        input: &DeviceBuffer,
        layout: SampleLayout,
        mapping: BinMapping,
    ) -> Result<DeviceBuffer> {
        let bins = histogram(host_samples(input)?, layout, mapping);
        Ok(DeviceBuffer::host(HostData::Counts(bins)))
    }

    fn inclusive_scan(&self, histogram: &DeviceBuffer) -> Result<DeviceBuffer> {
        let mut cdf = host_counts(histogram)?.to_vec();
        inclusive_scan(&mut cdf);
        Ok(DeviceBuffer::host(HostData::Counts(cdf)))
    }

    fn normalize(&self, cdf: &DeviceBuffer, total: u32) -> Result<DeviceBuffer> {
        let levels = normalize(host_counts(cdf)?, total);
        Ok(DeviceBuffer::host(HostData::Levels(levels)))
    }

    fn scale(&self, normalized: &DeviceBuffer) -> Result<DeviceBuffer> {
        let lut = scale(host_levels(normalized)?);
        Ok(DeviceBuffer::host(HostData::Counts(lut)))
    }

    fn back_project(
        &self,
        input: &DeviceBuffer,
        lut: &DeviceBuffer,
        layout: SampleLayout,
        mapping: BinMapping,
    ) -> Result<DeviceBuffer> {
        let lut = host_counts(lut)?;
        if lut.len() != mapping.num_bins as usize {
            return Err(HisteqError::Device(format!(
                "lookup table has {} entries, expected {}",
                lut.len(),
                mapping.num_bins
            )));
        }
        let out = back_project(host_samples(input)?, layout, lut, mapping);
        Ok(DeviceBuffer::host(HostData::Samples(out)))
    }
}

// ---------------------------------------------------------------------------
// Helpers: extract host data from a buffer
// ---------------------------------------------------------------------------

fn host_data(buf: &DeviceBuffer) -> Result<&HostData> {
    match &buf.inner {
        BufferInner::Host(data) => Ok(data),
        #[cfg(feature = "gpu")]
        _ => Err(HisteqError::Device(
            "CpuBackend received a GPU buffer".to_string(),
        )),
    }
}

fn host_samples(buf: &DeviceBuffer) -> Result<&[u8]> {
    match host_data(buf)? {
        HostData::Samples(v) => Ok(v),
        _ => Err(kind_mismatch(buf, "samples")),
    }
}

fn host_counts(buf: &DeviceBuffer) -> Result<&[u32]> {
    match host_data(buf)? {
        HostData::Counts(v) => Ok(v),
        _ => Err(kind_mismatch(buf, "counts")),
    }
}

fn host_levels(buf: &DeviceBuffer) -> Result<&[f32]> {
    match host_data(buf)? {
        HostData::Levels(v) => Ok(v),
        _ => Err(kind_mismatch(buf, "levels")),
    }
}

fn kind_mismatch(buf: &DeviceBuffer, expected: &str) -> HisteqError {
    HisteqError::Device(format!(
        "expected a buffer of {expected}, got {:?}",
        buf.kind()
    ))
}
