// Vulkan buffers backed by gpu-allocator
//
// Every buffer can be bound as a storage buffer and used as a copy source or
// destination. The heap decides which memory location the allocator picks.

use super::{GpuBuffer, VulkanDevice};
use crate::error::Result;
use crate::options::Heap;
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::AllocationError;
use std::sync::Arc;

pub struct VulkanBuffer {
    device: Arc<VulkanDevice>,
    pub handle: vk::Buffer,
    allocation: Option<Allocation>,
    size: u64,
    heap: Heap,
}

impl VulkanBuffer {
    pub fn new(device: Arc<VulkanDevice>, size: u64, heap: Heap) -> Result<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(
                vk::BufferUsageFlags::STORAGE_BUFFER
                    | vk::BufferUsageFlags::TRANSFER_SRC
                    | vk::BufferUsageFlags::TRANSFER_DST,
            )
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let handle = unsafe { device.device.create_buffer(&buffer_info, None) }?;

        let requirements = unsafe { device.device.get_buffer_memory_requirements(handle) };

        let allocation = match device.allocator.lock().allocate(&AllocationCreateDesc {
            name: "gpu-bridge buffer",
            requirements,
            location: heap.memory_location(),
            linear: true,
            allocation_scheme: AllocationScheme::GpuAllocatorManaged,
        }) {
            Ok(allocation) => allocation,
            Err(err) => {
                unsafe { device.device.destroy_buffer(handle, None) };
                return Err(err.into());
            }
        };

        if let Err(err) = unsafe {
            device
                .device
                .bind_buffer_memory(handle, allocation.memory(), allocation.offset())
        } {
            unsafe { device.device.destroy_buffer(handle, None) };
            free_allocation(&device, allocation);
            return Err(err.into());
        }

        log::debug!("Created {} byte {:?} buffer {:?}", size, heap, handle);

        Ok(Self {
            device,
            handle,
            allocation: Some(allocation),
            size,
            heap,
        })
    }
}

fn free_allocation(device: &VulkanDevice, allocation: Allocation) {
    log_free_result(device.allocator.lock().free(allocation));
}

/// Returns whether the memory went back to the allocator
fn log_free_result(result: std::result::Result<(), AllocationError>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            log::error!("Failed to free buffer memory: {}", err);
            false
        }
    }
}

impl GpuBuffer for VulkanBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn heap(&self) -> Heap {
        self.heap
    }

    fn mapped_slice(&self) -> Option<&[u8]> {
        if !self.heap.is_host_visible() {
            return None;
        }
        let size = self.size as usize;
        self.allocation
            .as_ref()?
            .mapped_slice()
            .and_then(|slice| slice.get(..size))
    }

    fn mapped_slice_mut(&mut self) -> Option<&mut [u8]> {
        if !self.heap.is_host_visible() {
            return None;
        }
        let size = self.size as usize;
        self.allocation
            .as_mut()?
            .mapped_slice_mut()
            .and_then(|slice| slice.get_mut(..size))
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        unsafe { self.device.device.destroy_buffer(self.handle, None) };
        if let Some(allocation) = self.allocation.take() {
            free_allocation(&self.device, allocation);
        }
    }
}
