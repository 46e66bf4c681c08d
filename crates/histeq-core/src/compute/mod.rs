mod backend;
pub mod cpu;
pub mod devices;
#[cfg(feature = "gpu")]
pub mod kernels;
#[cfg(feature = "gpu")]
pub mod wgpu_backend;

pub(crate) use backend::{BufferInner, HostData};
pub use backend::{ComputeBackend, DeviceBuffer, ElementKind};
pub use devices::{
    create_backend, device_name, list_platforms, list_platforms_devices, open_device, platform_name,
    DeviceInfo, DeviceSelection, OpenedDevice, PlatformInfo,
};
