// Errors and the C-visible result code

use crate::handle::{Handle, HandleKind};
use crate::options::Heap;
use ash::vk;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{heap:?} heap cannot hold a buffer initialized with bytes")]
    InvalidHeapForBufferWithBytes { heap: Heap },

    #[error("{0:?} does not refer to a live resource")]
    InvalidHandle(Handle),

    #[error("{handle:?} is a {actual}, expected a {expected}")]
    WrongHandleKind {
        handle: Handle,
        expected: HandleKind,
        actual: HandleKind,
    },

    #[error("null pointer passed as {0}")]
    NullPointer(&'static str),

    #[error("max command buffer count {requested} is outside 1..={limit}")]
    InvalidCommandBufferCount { requested: u32, limit: u32 },

    #[error("buffer size must be non-zero")]
    ZeroSizedBuffer,

    #[error("buffer expects {expected} bytes, got {actual}")]
    ByteCountMismatch { expected: u64, actual: usize },

    #[error("unknown heap value {0}")]
    UnknownHeap(u32),

    #[error("buffer is not host visible")]
    NotHostVisible,

    #[error("range {offset}+{len} is out of bounds for a {size} byte buffer")]
    OutOfBounds { offset: u64, len: u64, size: u64 },

    #[error("out of host memory allocating {0} bytes")]
    OutOfHostMemory(u64),

    #[error("application name {0:?} contains a NUL byte")]
    InvalidAppName(String),

    #[error("no suitable GPU found")]
    NoSuitableDevice,

    #[error("failed to load Vulkan: {0}")]
    Loading(#[from] ash::LoadingError),

    #[error("Vk error: {0}")]
    Vk(#[from] vk::Result),

    #[error("Gpu alloc error: {0}")]
    GpuAlloc(#[from] gpu_allocator::AllocationError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of an init call as seen through the C ABI
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResultCode {
    Ok = 0,
    Unknown = 1,
    InvalidHeapForBufferWithBytes = 2,
}

impl From<&Error> for ResultCode {
    fn from(error: &Error) -> Self {
        match error {
            Error::InvalidHeapForBufferWithBytes { .. } => ResultCode::InvalidHeapForBufferWithBytes,
            _ => ResultCode::Unknown,
        }
    }
}

impl<T> From<&Result<T>> for ResultCode {
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(_) => ResultCode::Ok,
            Err(error) => error.into(),
        }
    }
}
