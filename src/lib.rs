// gpu-bridge - opaque-handle access to a native GPU
//
// LAYOUT:
// ┌─────────────────────────────────────────────────────────────────┐
// │  C ABI (ffi) / Rust API                                         │
// │    └── Registry: handle table (device → queue, device → buffer) │
// │          └── Backend: Vulkan (ash + gpu-allocator) or host      │
// └─────────────────────────────────────────────────────────────────┘

pub mod backend;
pub mod config;
pub mod error;
pub mod ffi;
pub mod handle;
pub mod options;
pub mod registry;

pub use config::{BackendKind, Config};
pub use error::{Error, Result, ResultCode};
pub use handle::{Buffer, Device, Handle, HandleKind, Queue};
pub use options::{BufferOptions, Heap, QueueOptions};
pub use registry::Registry;
