// Resource registry - the handle table behind every public call
//
// Handles are slots in one SlotMap guarded by a mutex. Queues and buffers
// hold their own reference to the native device, so releasing a device
// handle first is allowed: the device lives on until its last dependent goes.
// Calls into a queue or buffer run on a cloned Arc after the table lock is
// dropped, so a blocking wait never stalls the rest of the table.

use crate::backend::{self, GpuBuffer, GpuDevice, GpuQueue};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::handle::{Buffer, Device, Handle, HandleKind, Queue, ResourceKey};
use crate::options::{BufferOptions, Heap, QueueOptions};
use parking_lot::Mutex;
use slotmap::SlotMap;
use std::sync::{Arc, Weak};

enum Resource {
    Device(Arc<dyn GpuDevice>),
    Queue {
        device: ResourceKey,
        queue: Arc<dyn GpuQueue>,
    },
    Buffer {
        device: ResourceKey,
        buffer: Arc<Mutex<Box<dyn GpuBuffer>>>,
    },
}

impl Resource {
    fn kind(&self) -> HandleKind {
        match self {
            Resource::Device(_) => HandleKind::Device,
            Resource::Queue { .. } => HandleKind::Queue,
            Resource::Buffer { .. } => HandleKind::Buffer,
        }
    }

    fn parent(&self) -> Option<ResourceKey> {
        match self {
            Resource::Device(_) => None,
            Resource::Queue { device, .. } | Resource::Buffer { device, .. } => Some(*device),
        }
    }
}

pub struct Registry {
    config: Config,
    resources: Mutex<SlotMap<ResourceKey, Resource>>,
    // Shared by every device handle while any of them is alive
    system_device: Mutex<Option<Weak<dyn GpuDevice>>>,
}

impl Registry {
    pub fn new(config: Config) -> Self {
        log::debug!("Creating registry with {:?} backend", config.backend.kind);
        Self {
            config,
            resources: Mutex::new(SlotMap::with_key()),
            system_device: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn system_device(&self) -> Result<Arc<dyn GpuDevice>> {
        let mut system_device = self.system_device.lock();
        if let Some(device) = system_device.as_ref().and_then(Weak::upgrade) {
            return Ok(device);
        }

        let device = backend::open_device(&self.config.backend)?;
        log::info!("Opened {:?} device: {}", device.kind(), device.name());
        *system_device = Some(Arc::downgrade(&device));
        Ok(device)
    }

    /// Acquire a handle to the system GPU
    pub fn init_device(&self) -> Result<Device> {
        let device = self.system_device()?;
        let key = self.resources.lock().insert(Resource::Device(device));
        Ok(Device(Handle::from_key(key)))
    }

    pub fn init_queue(&self, options: &QueueOptions) -> Result<Queue> {
        let limit = self.config.queue.max_command_buffer_limit;
        let requested = options.max_command_buffer_count;
        if requested == 0 || requested > limit {
            return Err(Error::InvalidCommandBufferCount { requested, limit });
        }

        let (device_key, device) = self.device(options.device)?;
        let queue = device.create_queue(requested)?;

        let key = self.resources.lock().insert(Resource::Queue {
            device: device_key,
            queue: Arc::from(queue),
        });
        log::debug!("Queue {:?} with {} command buffers", key, requested);
        Ok(Queue(Handle::from_key(key)))
    }

    /// Device-local buffer with undefined contents
    pub fn init_storage_buffer(&self, options: &BufferOptions) -> Result<Buffer> {
        let heap = options.heap.resolve(false);
        let (device_key, device) = self.buffer_device(options)?;
        let buffer = device.create_buffer(options.size as u64, heap)?;
        Ok(self.insert_buffer(device_key, buffer))
    }

    /// Buffer initialized with a copy of `bytes`, which must be `options.size` long
    pub fn init_upload_buffer(&self, bytes: &[u8], options: &BufferOptions) -> Result<Buffer> {
        let heap = options.heap.resolve(true);
        if !heap.is_host_visible() {
            return Err(Error::InvalidHeapForBufferWithBytes { heap });
        }
        if bytes.len() as u64 != options.size as u64 {
            return Err(Error::ByteCountMismatch {
                expected: options.size as u64,
                actual: bytes.len(),
            });
        }

        let (device_key, device) = self.buffer_device(options)?;
        let mut buffer = device.create_buffer(options.size as u64, heap)?;
        match buffer.mapped_slice_mut() {
            Some(contents) => contents.copy_from_slice(bytes),
            // The backend could not place it in host-mapped memory
            None => return Err(Error::InvalidHeapForBufferWithBytes { heap }),
        }

        Ok(self.insert_buffer(device_key, buffer))
    }

    fn buffer_device(&self, options: &BufferOptions) -> Result<(ResourceKey, Arc<dyn GpuDevice>)> {
        if options.size == 0 {
            return Err(Error::ZeroSizedBuffer);
        }
        self.device(options.device)
    }

    fn insert_buffer(&self, device: ResourceKey, buffer: Box<dyn GpuBuffer>) -> Buffer {
        let (size, heap) = (buffer.size(), buffer.heap());
        let key = self.resources.lock().insert(Resource::Buffer {
            device,
            buffer: Arc::new(Mutex::new(buffer)),
        });
        log::debug!("Buffer {:?}: {} bytes in {:?} heap", key, size, heap);
        Buffer(Handle::from_key(key))
    }

    /// Invalidate a handle of any kind. Unknown handles are ignored.
    pub fn release(&self, handle: impl Into<Handle>) {
        let handle = handle.into();
        let Some(key) = handle.key() else {
            log::warn!("Ignoring release of null handle");
            return;
        };

        // Drop the native object outside the lock
        let released = {
            let mut resources = self.resources.lock();
            let released = resources.remove(key);
            if let Some(Resource::Device(_)) = &released {
                let dependents = resources
                    .values()
                    .filter(|resource| resource.parent() == Some(key))
                    .count();
                if dependents > 0 {
                    log::warn!(
                        "Released device {:?} with {} live queues/buffers",
                        handle,
                        dependents
                    );
                }
            }
            released
        };

        match released {
            Some(resource) => log::debug!("Released {} {:?}", resource.kind(), handle),
            None => log::warn!("Ignoring release of stale handle {:?}", handle),
        }
    }

    /// Kind of a live handle, `None` if it is null or released
    pub fn kind_of(&self, handle: impl Into<Handle>) -> Option<HandleKind> {
        let key = handle.into().key()?;
        self.resources.lock().get(key).map(Resource::kind)
    }

    pub fn live_handles(&self) -> usize {
        self.resources.lock().len()
    }

    pub fn device_name(&self, device: Device) -> Result<String> {
        let (_, device) = self.device(device)?;
        Ok(device.name().to_string())
    }

    pub fn queue_max_command_buffer_count(&self, queue: Queue) -> Result<u32> {
        self.with_queue(queue, |queue| Ok(queue.max_command_buffer_count()))
    }

    /// Submit an empty command buffer, waiting for a free in-flight slot first
    pub fn submit_marker(&self, queue: Queue) -> Result<()> {
        self.with_queue(queue, |queue| queue.submit_marker())
    }

    /// Block until nothing submitted through `queue` is in flight
    pub fn wait_queue_idle(&self, queue: Queue) -> Result<()> {
        self.with_queue(queue, |queue| queue.wait_idle())
    }

    pub fn buffer_size(&self, buffer: Buffer) -> Result<u64> {
        self.with_buffer(buffer, |buffer| Ok(buffer.size()))
    }

    pub fn buffer_heap(&self, buffer: Buffer) -> Result<Heap> {
        self.with_buffer(buffer, |buffer| Ok(buffer.heap()))
    }

    /// Copy `len` bytes starting at `offset` out of a host-visible buffer
    pub fn read_buffer(&self, buffer: Buffer, offset: u64, len: u64) -> Result<Vec<u8>> {
        self.with_buffer(buffer, |buffer| {
            let range = checked_range(buffer.size(), offset, len)?;
            let contents = buffer.mapped_slice().ok_or(Error::NotHostVisible)?;
            Ok(contents[range].to_vec())
        })
    }

    /// Overwrite part of a host-visible buffer
    pub fn write_buffer(&self, buffer: Buffer, offset: u64, bytes: &[u8]) -> Result<()> {
        self.with_buffer(buffer, |buffer| {
            let range = checked_range(buffer.size(), offset, bytes.len() as u64)?;
            let contents = buffer.mapped_slice_mut().ok_or(Error::NotHostVisible)?;
            contents[range].copy_from_slice(bytes);
            Ok(())
        })
    }

    fn device(&self, device: Device) -> Result<(ResourceKey, Arc<dyn GpuDevice>)> {
        let handle = device.handle();
        let key = handle.key().ok_or(Error::InvalidHandle(handle))?;
        match self.resources.lock().get(key) {
            Some(Resource::Device(device)) => Ok((key, device.clone())),
            Some(other) => Err(Error::WrongHandleKind {
                handle,
                expected: HandleKind::Device,
                actual: other.kind(),
            }),
            None => Err(Error::InvalidHandle(handle)),
        }
    }

    fn with_queue<T>(&self, queue: Queue, f: impl FnOnce(&dyn GpuQueue) -> Result<T>) -> Result<T> {
        let handle = queue.handle();
        let key = handle.key().ok_or(Error::InvalidHandle(handle))?;
        let queue = match self.resources.lock().get(key) {
            Some(Resource::Queue { queue, .. }) => queue.clone(),
            Some(other) => {
                return Err(Error::WrongHandleKind {
                    handle,
                    expected: HandleKind::Queue,
                    actual: other.kind(),
                })
            }
            None => return Err(Error::InvalidHandle(handle)),
        };
        f(&*queue)
    }

    fn with_buffer<T>(
        &self,
        buffer: Buffer,
        f: impl FnOnce(&mut dyn GpuBuffer) -> Result<T>,
    ) -> Result<T> {
        let handle = buffer.handle();
        let key = handle.key().ok_or(Error::InvalidHandle(handle))?;
        let buffer = match self.resources.lock().get(key) {
            Some(Resource::Buffer { buffer, .. }) => buffer.clone(),
            Some(other) => {
                return Err(Error::WrongHandleKind {
                    handle,
                    expected: HandleKind::Buffer,
                    actual: other.kind(),
                })
            }
            None => return Err(Error::InvalidHandle(handle)),
        };
        let mut buffer = buffer.lock();
        f(&mut **buffer)
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        let live = self.resources.get_mut().len();
        if live > 0 {
            log::warn!("Dropping registry with {} unreleased handles", live);
        }
    }
}

fn checked_range(size: u64, offset: u64, len: u64) -> Result<std::ops::Range<usize>> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(offset as usize..end as usize),
        _ => Err(Error::OutOfBounds { offset, len, size }),
    }
}
