// C ABI - see include/gpu_bridge.h
//
// Every call goes through one process-wide registry. It is built from
// Config::load() on first use unless Rust code installed one before.

use crate::config::Config;
use crate::error::{Result, ResultCode};
use crate::handle::{Buffer, Device, Handle};
use crate::options::{BufferOptions, Heap, QueueOptions};
use crate::registry::Registry;
use crate::Error;
use std::os::raw::c_void;
use std::sync::OnceLock;

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Use `registry` for all C calls. Returns false if one is already in use.
pub fn install_registry(registry: Registry) -> bool {
    REGISTRY.set(registry).is_ok()
}

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| Registry::new(Config::load()))
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpuQueueOptions {
    pub device: Handle,
    pub max_command_buffer_count: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpuBufferOptions {
    pub device: Handle,
    pub size: u32,
    /// Raw `Heap` value, 0 picks the heap from the init variant
    pub heap: u32,
}

impl GpuBufferOptions {
    fn to_options(self) -> Result<BufferOptions> {
        Ok(BufferOptions {
            device: Device(self.device),
            size: self.size,
            heap: Heap::from_raw(self.heap)?,
        })
    }
}

/// Store the outcome of an init call in `out` and turn it into a result code.
///
/// # Safety
///
/// `out` must be null or valid for writes.
unsafe fn finish<T: Into<Handle>>(out: *mut Handle, call: &str, result: Result<T>) -> ResultCode {
    let code = ResultCode::from(&result);
    let handle = match result {
        Ok(handle) => handle.into(),
        Err(err) => {
            log::error!("{} failed: {}", call, err);
            Handle::NULL
        }
    };
    if !out.is_null() {
        unsafe { *out = handle };
    }
    code
}

/// Invalidate a device, queue or buffer handle.
#[no_mangle]
pub extern "C" fn gpu_release(handle: Handle) {
    registry().release(handle);
}

/// # Safety
///
/// `device` must be a valid pointer to a `gpu_device_t`.
#[no_mangle]
pub unsafe extern "C" fn gpu_init_device(device: *mut Handle) -> ResultCode {
    let result = if device.is_null() {
        Err(Error::NullPointer("device"))
    } else {
        registry().init_device()
    };
    unsafe { finish(device, "gpu_init_device", result) }
}

/// # Safety
///
/// `queue` must be valid for writes and `options` valid for reads.
#[no_mangle]
pub unsafe extern "C" fn gpu_init_queue(
    queue: *mut Handle,
    options: *const GpuQueueOptions,
) -> ResultCode {
    let result = if queue.is_null() {
        Err(Error::NullPointer("queue"))
    } else {
        match unsafe { options.as_ref() } {
            None => Err(Error::NullPointer("options")),
            Some(options) => registry().init_queue(&QueueOptions {
                device: Device(options.device),
                max_command_buffer_count: options.max_command_buffer_count,
            }),
        }
    };
    unsafe { finish(queue, "gpu_init_queue", result) }
}

/// # Safety
///
/// `buffer` must be valid for writes and `options` valid for reads.
#[no_mangle]
pub unsafe extern "C" fn gpu_init_storage_buffer(
    buffer: *mut Handle,
    options: *const GpuBufferOptions,
) -> ResultCode {
    let result = if buffer.is_null() {
        Err(Error::NullPointer("buffer"))
    } else {
        match unsafe { options.as_ref() } {
            None => Err(Error::NullPointer("options")),
            Some(options) => options
                .to_options()
                .and_then(|options| registry().init_storage_buffer(&options)),
        }
    };
    unsafe { finish(buffer, "gpu_init_storage_buffer", result) }
}

/// # Safety
///
/// `buffer` must be valid for writes, `options` valid for reads and `bytes`
/// null or valid for reads of `options->size` bytes.
#[no_mangle]
pub unsafe extern "C" fn gpu_init_upload_buffer(
    buffer: *mut Handle,
    bytes: *const c_void,
    options: *const GpuBufferOptions,
) -> ResultCode {
    let result = if buffer.is_null() {
        Err(Error::NullPointer("buffer"))
    } else {
        match unsafe { options.as_ref() } {
            None => Err(Error::NullPointer("options")),
            Some(raw) => raw.to_options().and_then(|options| {
                // A null span reads as empty, which the length check rejects
                let bytes: &[u8] = if bytes.is_null() {
                    &[]
                } else {
                    unsafe { std::slice::from_raw_parts(bytes as *const u8, raw.size as usize) }
                };
                registry().init_upload_buffer(bytes, &options)
            }),
        }
    };
    unsafe { finish(buffer, "gpu_init_upload_buffer", result) }
}

/// Copy `len` bytes at `offset` of a host-visible buffer into `dst`.
///
/// # Safety
///
/// `dst` must be valid for writes of `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn gpu_read_buffer(
    buffer: Handle,
    offset: u64,
    dst: *mut c_void,
    len: u64,
) -> ResultCode {
    let result = if dst.is_null() && len > 0 {
        Err(Error::NullPointer("dst"))
    } else {
        registry()
            .read_buffer(Buffer(buffer), offset, len)
            .map(|contents| {
                if !contents.is_empty() {
                    unsafe {
                        std::ptr::copy_nonoverlapping(contents.as_ptr(), dst as *mut u8, contents.len())
                    };
                }
            })
    };
    if let Err(err) = &result {
        log::error!("gpu_read_buffer failed: {}", err);
    }
    ResultCode::from(&result)
}
