// Command queue synchronization
//
// A queue owns one command buffer and one fence per in-flight slot and
// submits to the device's vk::Queue. Fences start signaled so an unused slot
// counts as idle.

use super::{GpuQueue, VulkanDevice};
use crate::error::Result;
use ash::vk;
use parking_lot::Mutex;
use std::sync::Arc;

/// One command buffer that may be in flight
pub struct InFlightSlot {
    pub command_buffer: vk::CommandBuffer,
    pub fence: vk::Fence,
}

struct SlotRing {
    slots: Vec<InFlightSlot>,
    next: usize,
}

pub struct VulkanQueue {
    device: Arc<VulkanDevice>,
    command_pool: vk::CommandPool,
    // Held while waiting on or replacing a fence
    ring: Mutex<SlotRing>,
    slot_count: u32,
}

impl VulkanQueue {
    pub fn new(device: Arc<VulkanDevice>, max_command_buffer_count: u32) -> Result<Self> {
        let pool_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(device.queue_family);

        let command_pool = unsafe { device.device.create_command_pool(&pool_info, None) }?;

        // From here on Drop cleans up whatever was created
        let queue = Self {
            device,
            command_pool,
            ring: Mutex::new(SlotRing {
                slots: Vec::with_capacity(max_command_buffer_count as usize),
                next: 0,
            }),
            slot_count: max_command_buffer_count,
        };

        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(max_command_buffer_count);

        let command_buffers =
            unsafe { queue.device.device.allocate_command_buffers(&alloc_info) }?;

        {
            let mut ring = queue.ring.lock();
            for command_buffer in command_buffers {
                let fence = queue.create_signaled_fence()?;
                ring.slots.push(InFlightSlot {
                    command_buffer,
                    fence,
                });
            }
        }

        log::debug!(
            "Created queue with {} in-flight slots on family {}",
            max_command_buffer_count,
            queue.device.queue_family
        );

        Ok(queue)
    }

    fn create_signaled_fence(&self) -> Result<vk::Fence> {
        let fence_info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);
        Ok(unsafe { self.device.device.create_fence(&fence_info, None) }?)
    }

    fn record_and_submit(&self, slot: &InFlightSlot) -> Result<()> {
        let device = &self.device.device;
        let begin_info = vk::CommandBufferBeginInfo::builder()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

        unsafe {
            device.reset_command_buffer(
                slot.command_buffer,
                vk::CommandBufferResetFlags::empty(),
            )?;
            device.begin_command_buffer(slot.command_buffer, &begin_info)?;
            device.end_command_buffer(slot.command_buffer)?;

            let submit_info = vk::SubmitInfo::builder()
                .command_buffers(std::slice::from_ref(&slot.command_buffer))
                .build();

            device.reset_fences(std::slice::from_ref(&slot.fence))?;

            // vkQueueSubmit needs external synchronization on the queue
            let queue = self.device.queue.lock();
            device.queue_submit(*queue, std::slice::from_ref(&submit_info), slot.fence)?;
        }
        Ok(())
    }
}

impl GpuQueue for VulkanQueue {
    fn max_command_buffer_count(&self) -> u32 {
        self.slot_count
    }

    fn submit_marker(&self) -> Result<()> {
        let mut ring = self.ring.lock();
        if ring.slots.is_empty() {
            return Ok(());
        }
        let index = ring.next;
        ring.next = (index + 1) % ring.slots.len();

        let fence = ring.slots[index].fence;
        unsafe {
            self.device
                .device
                .wait_for_fences(std::slice::from_ref(&fence), true, u64::MAX)
        }?;

        if let Err(err) = self.record_and_submit(&ring.slots[index]) {
            // An unsubmitted reset fence would never signal again
            let replacement = self.create_signaled_fence()?;
            unsafe { self.device.device.destroy_fence(fence, None) };
            ring.slots[index].fence = replacement;
            return Err(err);
        }
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        let ring = self.ring.lock();
        let fences: Vec<vk::Fence> = ring.slots.iter().map(|slot| slot.fence).collect();
        if !fences.is_empty() {
            unsafe { self.device.device.wait_for_fences(&fences, true, u64::MAX) }?;
        }
        Ok(())
    }
}

impl Drop for VulkanQueue {
    fn drop(&mut self) {
        if let Err(err) = self.wait_idle() {
            log::error!("Failed waiting for queue before destroy: {}", err);
        }

        unsafe {
            for slot in &self.ring.get_mut().slots {
                self.device.device.destroy_fence(slot.fence, None);
            }
            // Also frees the command buffers
            self.device
                .device
                .destroy_command_pool(self.command_pool, None);
        }
    }
}
