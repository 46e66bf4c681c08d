//! Platform and device enumeration, and backend creation by index.
//!
//! Platforms are listed in a fixed order: every wgpu backend that exposes at
//! least one adapter (Vulkan, Metal, DX12, GL), then the host platform with
//! its single Rayon device.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{HisteqError, Result};

use super::cpu::CpuBackend;
use super::ComputeBackend;

/// Platform and device indices chosen by the user.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSelection {
    pub platform: usize,
    pub device: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    /// Device class, e.g. `DiscreteGpu` or `Cpu`.
    pub kind: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformInfo {
    pub name: String,
    pub devices: Vec<DeviceInfo>,
}

fn host_platform() -> PlatformInfo {
    PlatformInfo {
        name: "Host".to_string(),
        devices: vec![DeviceInfo {
            name: format!("CPU/Rayon ({} threads)", rayon::current_num_threads()),
            kind: "Cpu".to_string(),
        }],
    }
}

/// Platforms enumerated once. GPU adapters stay open until a selection
/// consumes them.
struct Enumeration {
    platforms: Vec<PlatformInfo>,
    #[cfg(feature = "gpu")]
    gpu: Vec<super::wgpu_backend::GpuPlatform>,
}

impl Enumeration {
    fn new() -> Self {
        #[cfg(feature = "gpu")]
        let gpu = super::wgpu_backend::enumerate_gpu_platforms();
        #[allow(unused_mut)]
        let mut platforms = Vec::new();
        #[cfg(feature = "gpu")]
        platforms.extend(gpu.iter().map(|p| p.info.clone()));
        platforms.push(host_platform());
        Self {
            platforms,
            #[cfg(feature = "gpu")]
            gpu,
        }
    }

    fn open(self, selection: DeviceSelection) -> Result<OpenedDevice> {
        let (platform, device) = select(&self.platforms, selection)?;
        let (platform, device) = (platform.name.clone(), device.name.clone());
        info!(%platform, %device, "Selecting compute device");

        let backend: Arc<dyn ComputeBackend> = if selection.platform == self.platforms.len() - 1 {
            Arc::new(CpuBackend)
        } else {
            self.open_gpu(selection)?
        };
        Ok(OpenedDevice {
            backend,
            platform,
            device,
        })
    }

    #[cfg(feature = "gpu")]
    fn open_gpu(mut self, selection: DeviceSelection) -> Result<Arc<dyn ComputeBackend>> {
        let platform = self.gpu.swap_remove(selection.platform);
        Ok(Arc::new(platform.open(selection)?))
    }

    #[cfg(not(feature = "gpu"))]
    fn open_gpu(self, selection: DeviceSelection) -> Result<Arc<dyn ComputeBackend>> {
        Err(HisteqError::InvalidPlatform {
            index: selection.platform,
            available: self.platforms.len(),
        })
    }
}

/// A ready backend and the names it was selected by.
pub struct OpenedDevice {
    pub backend: Arc<dyn ComputeBackend>,
    pub platform: String,
    pub device: String,
}

/// All platforms available to this build.
pub fn list_platforms() -> Vec<PlatformInfo> {
    Enumeration::new().platforms
}

/// Human-readable listing of every platform and its devices.
pub fn list_platforms_devices() -> String {
    format_platforms(&list_platforms())
}

fn format_platforms(platforms: &[PlatformInfo]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Found {} platform(s):", platforms.len());
    for (p, platform) in platforms.iter().enumerate() {
        let _ = writeln!(out, "Platform {p}, {}", platform.name);
        for (d, device) in platform.devices.iter().enumerate() {
            let _ = writeln!(out, "  Device {d}, {}, {}", device.name, device.kind);
        }
    }
    out
}

fn select<'a>(
    platforms: &'a [PlatformInfo],
    selection: DeviceSelection,
) -> Result<(&'a PlatformInfo, &'a DeviceInfo)> {
    let platform = platforms
        .get(selection.platform)
        .ok_or(HisteqError::InvalidPlatform {
            index: selection.platform,
            available: platforms.len(),
        })?;
    let device = platform
        .devices
        .get(selection.device)
        .ok_or(HisteqError::InvalidDevice {
            platform: selection.platform,
            index: selection.device,
            available: platform.devices.len(),
        })?;
    Ok((platform, device))
}

pub fn platform_name(platform: usize) -> Result<String> {
    let platforms = list_platforms();
    platforms
        .get(platform)
        .map(|p| p.name.clone())
        .ok_or(HisteqError::InvalidPlatform {
            index: platform,
            available: platforms.len(),
        })
}

pub fn device_name(platform: usize, device: usize) -> Result<String> {
    let platforms = list_platforms();
    let (_, d) = select(&platforms, DeviceSelection { platform, device })?;
    Ok(d.name.clone())
}

/// Open the device at `selection`, enumerating platforms once. Out-of-range
/// indices are rejected before any device is touched.
pub fn open_device(selection: DeviceSelection) -> Result<OpenedDevice> {
    Enumeration::new().open(selection)
}

/// Create the backend for a platform/device pair.
pub fn create_backend(selection: DeviceSelection) -> Result<Arc<dyn ComputeBackend>> {
    open_device(selection).map(|opened| opened.backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_platform_is_last() {
        let platforms = list_platforms();
        let host = platforms.last().unwrap();
        assert_eq!(host.name, "Host");
        assert_eq!(host.devices.len(), 1);
    }

    #[test]
    fn listing_names_every_device() {
        let platforms = vec![
            PlatformInfo {
                name: "Vulkan".to_string(),
                devices: vec![
                    DeviceInfo {
                        name: "GPU A".to_string(),
                        kind: "DiscreteGpu".to_string(),
                    },
                    DeviceInfo {
                        name: "GPU B".to_string(),
                        kind: "IntegratedGpu".to_string(),
                    },
                ],
            },
            host_platform(),
        ];
        let listing = format_platforms(&platforms);
        assert!(listing.starts_with("Found 2 platform(s):"));
        assert!(listing.contains("Platform 0, Vulkan"));
        assert!(listing.contains("  Device 1, GPU B, IntegratedGpu"));
        assert!(listing.contains("Platform 1, Host"));
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let platforms = list_platforms();
        let err = select(
            &platforms,
            DeviceSelection {
                platform: platforms.len(),
                device: 0,
            },
        )
        .unwrap_err();
        assert!(matches!(err, HisteqError::InvalidPlatform { .. }));

        let host = platforms.len() - 1;
        let err = create_backend(DeviceSelection {
            platform: host,
            device: 1,
        })
        .err()
        .unwrap();
        assert!(matches!(err, HisteqError::InvalidDevice { index: 1, .. }));
    }

    #[test]
    fn opened_device_carries_selection_names() {
        let host = list_platforms().len() - 1;
        let opened = open_device(DeviceSelection {
            platform: host,
            device: 0,
        })
        .unwrap();
        assert_eq!(opened.platform, "Host");
        assert!(opened.device.starts_with("CPU/Rayon"));
        assert_eq!(opened.backend.name(), "CPU/Rayon");
    }

    #[test]
    fn host_platform_creates_cpu_backend() {
        let host = list_platforms().len() - 1;
        let backend = create_backend(DeviceSelection {
            platform: host,
            device: 0,
        })
        .unwrap();
        assert!(!backend.is_gpu());
        assert_eq!(backend.name(), "CPU/Rayon");
        assert!(device_name(host, 0).unwrap().starts_with("CPU/Rayon"));
        assert_eq!(platform_name(host).unwrap(), "Host");
    }
}
