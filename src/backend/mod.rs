// Backend module - native objects behind the handle table
//
// The registry only talks to these traits. Vulkan is the real backend, the
// host backend emulates the same heap rules in plain memory.

pub mod buffer;
pub mod device;
pub mod host;
pub mod sync;

pub use buffer::VulkanBuffer;
pub use device::VulkanDevice;
pub use host::HostDevice;
pub use sync::VulkanQueue;

use crate::config::{BackendConfig, BackendKind};
use crate::error::Result;
use crate::options::Heap;
use std::sync::Arc;

pub trait GpuDevice: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> BackendKind;

    fn create_queue(self: Arc<Self>, max_command_buffer_count: u32) -> Result<Box<dyn GpuQueue>>;

    /// `heap` is already resolved, never `Heap::Automatic`
    fn create_buffer(self: Arc<Self>, size: u64, heap: Heap) -> Result<Box<dyn GpuBuffer>>;
}

pub trait GpuQueue: Send + Sync {
    fn max_command_buffer_count(&self) -> u32;

    /// Submit an empty command buffer on the next in-flight slot. Blocks while
    /// every slot is still in flight.
    fn submit_marker(&self) -> Result<()>;

    /// Block until no command buffer of this queue is in flight
    fn wait_idle(&self) -> Result<()>;
}

pub trait GpuBuffer: Send {
    fn size(&self) -> u64;

    fn heap(&self) -> Heap;

    /// Host view of the contents, `None` unless the memory is host visible
    fn mapped_slice(&self) -> Option<&[u8]>;

    fn mapped_slice_mut(&mut self) -> Option<&mut [u8]>;
}

/// Open the device selected by `config.kind`
pub fn open_device(config: &BackendConfig) -> Result<Arc<dyn GpuDevice>> {
    match config.kind {
        BackendKind::Host => Ok(Arc::new(HostDevice::new())),
        BackendKind::Vulkan => {
            let device: Arc<dyn GpuDevice> =
                VulkanDevice::new(&config.app_name, config.validation_layers)?;
            Ok(device)
        }
        BackendKind::Auto => match VulkanDevice::new(&config.app_name, config.validation_layers) {
            Ok(device) => Ok(device),
            Err(err) => {
                log::warn!("Vulkan unavailable ({}), falling back to host backend", err);
                Ok(Arc::new(HostDevice::new()))
            }
        },
    }
}
