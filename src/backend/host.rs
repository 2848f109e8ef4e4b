// Host backend - buffers in plain memory
//
// Used where no Vulkan driver is present. Private buffers still refuse host
// access so callers see the same rules as on a GPU.

use super::{GpuBuffer, GpuDevice, GpuQueue};
use crate::config::BackendKind;
use crate::error::{Error, Result};
use crate::options::Heap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct HostDevice {
    name: String,
}

impl HostDevice {
    pub fn new() -> Self {
        log::info!("Creating host device");
        Self {
            name: "Host emulation".to_string(),
        }
    }
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GpuDevice for HostDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Host
    }

    fn create_queue(self: Arc<Self>, max_command_buffer_count: u32) -> Result<Box<dyn GpuQueue>> {
        Ok(Box::new(HostQueue {
            _device: self,
            max_command_buffer_count,
            submitted: AtomicU64::new(0),
        }))
    }

    fn create_buffer(self: Arc<Self>, size: u64, heap: Heap) -> Result<Box<dyn GpuBuffer>> {
        let len = usize::try_from(size).map_err(|_| Error::OutOfHostMemory(size))?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| Error::OutOfHostMemory(size))?;
        data.resize(len, 0);

        Ok(Box::new(HostBuffer {
            _device: self,
            heap,
            data,
        }))
    }
}

struct HostQueue {
    _device: Arc<HostDevice>,
    max_command_buffer_count: u32,
    submitted: AtomicU64,
}

impl GpuQueue for HostQueue {
    fn max_command_buffer_count(&self) -> u32 {
        self.max_command_buffer_count
    }

    fn submit_marker(&self) -> Result<()> {
        // Completes on submission
        self.submitted.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        // Nothing is ever in flight
        Ok(())
    }
}

struct HostBuffer {
    _device: Arc<HostDevice>,
    heap: Heap,
    data: Vec<u8>,
}

impl GpuBuffer for HostBuffer {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn heap(&self) -> Heap {
        self.heap
    }

    fn mapped_slice(&self) -> Option<&[u8]> {
        self.heap.is_host_visible().then_some(self.data.as_slice())
    }

    fn mapped_slice_mut(&mut self) -> Option<&mut [u8]> {
        self.heap
            .is_host_visible()
            .then_some(self.data.as_mut_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_buffers_are_not_mapped() {
        let device = Arc::new(HostDevice::new());
        let mut buffer = device.create_buffer(16, Heap::Private).unwrap();
        assert_eq!(buffer.size(), 16);
        assert!(buffer.mapped_slice().is_none());
        assert!(buffer.mapped_slice_mut().is_none());
    }

    #[test]
    fn shared_buffers_are_mapped_and_zeroed() {
        let device = Arc::new(HostDevice::new());
        let mut buffer = device.create_buffer(4, Heap::Shared).unwrap();
        assert_eq!(buffer.mapped_slice(), Some(&[0u8; 4][..]));
        buffer.mapped_slice_mut().unwrap().copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(buffer.mapped_slice(), Some(&[1u8, 2, 3, 4][..]));
    }

    #[test]
    fn queue_keeps_its_bound() {
        let device = Arc::new(HostDevice::new());
        let queue = device.create_queue(5).unwrap();
        assert_eq!(queue.max_command_buffer_count(), 5);
        queue.wait_idle().unwrap();
    }

    #[test]
    fn markers_past_the_slot_count_do_not_block() {
        let queue = HostQueue {
            _device: Arc::new(HostDevice::new()),
            max_command_buffer_count: 2,
            submitted: AtomicU64::new(0),
        };
        for _ in 0..5 {
            queue.submit_marker().unwrap();
        }
        queue.wait_idle().unwrap();
        assert_eq!(queue.submitted.load(Ordering::Acquire), 5);
    }
}
