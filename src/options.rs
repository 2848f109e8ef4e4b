// Creation options for queues and buffers

use crate::error::{Error, Result};
use crate::handle::Device;
use gpu_allocator::MemoryLocation;

/// Memory heap a buffer is placed in
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Heap {
    /// Private for storage buffers, shared for upload buffers
    #[default]
    Automatic = 0,
    /// Device-local, not reachable from the host
    Private = 1,
    /// Host-visible, written by the host and read by the device
    Shared = 2,
    /// Host-visible, written by the device and read back by the host
    Readback = 3,
}

impl Heap {
    pub fn from_raw(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(Heap::Automatic),
            1 => Ok(Heap::Private),
            2 => Ok(Heap::Shared),
            3 => Ok(Heap::Readback),
            _ => Err(Error::UnknownHeap(raw)),
        }
    }

    /// Resolve `Automatic` for a buffer that is (or isn't) initialized with bytes
    pub fn resolve(self, with_bytes: bool) -> Heap {
        match self {
            Heap::Automatic if with_bytes => Heap::Shared,
            Heap::Automatic => Heap::Private,
            heap => heap,
        }
    }

    pub fn is_host_visible(self) -> bool {
        matches!(self, Heap::Shared | Heap::Readback)
    }

    pub fn memory_location(self) -> MemoryLocation {
        match self {
            Heap::Automatic | Heap::Private => MemoryLocation::GpuOnly,
            Heap::Shared => MemoryLocation::CpuToGpu,
            Heap::Readback => MemoryLocation::GpuToCpu,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QueueOptions {
    pub device: Device,
    /// Upper bound on command buffers in flight at once
    pub max_command_buffer_count: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BufferOptions {
    pub device: Device,
    /// Size in bytes
    pub size: u32,
    pub heap: Heap,
}

impl BufferOptions {
    pub fn new(device: Device, size: u32) -> Self {
        Self {
            device,
            size,
            heap: Heap::Automatic,
        }
    }

    pub fn with_heap(mut self, heap: Heap) -> Self {
        self.heap = heap;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn automatic_heap_resolves_by_variant() {
        assert_eq!(Heap::Automatic.resolve(false), Heap::Private);
        assert_eq!(Heap::Automatic.resolve(true), Heap::Shared);
        assert_eq!(Heap::Private.resolve(true), Heap::Private);
        assert_eq!(Heap::Readback.resolve(false), Heap::Readback);
    }

    #[test]
    fn only_shared_heaps_are_host_visible() {
        assert!(!Heap::Private.is_host_visible());
        assert!(Heap::Shared.is_host_visible());
        assert!(Heap::Readback.is_host_visible());
        assert!(matches!(Heap::Shared.memory_location(), MemoryLocation::CpuToGpu));
        assert!(matches!(Heap::Private.memory_location(), MemoryLocation::GpuOnly));
    }

    #[test]
    fn raw_heap_values() {
        assert_eq!(Heap::from_raw(0).unwrap(), Heap::Automatic);
        assert_eq!(Heap::from_raw(3).unwrap(), Heap::Readback);
        assert!(matches!(Heap::from_raw(9), Err(Error::UnknownHeap(9))));
    }
}
