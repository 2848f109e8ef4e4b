// Opaque resource handles
//
// A handle is the only thing callers ever see of a device, queue or buffer.
// The raw value is a generational slot in the registry's resource table, so a
// released handle can never alias a resource created later.

use slotmap::{Key, KeyData};
use std::fmt;

slotmap::new_key_type! {
    pub(crate) struct ResourceKey;
}

/// Opaque identifier of any registry resource
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Handle(u64);

impl Handle {
    /// "No object". Never returned by a successful init.
    pub const NULL: Handle = Handle(0);

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    // Occupied slotmap versions are always odd, so a live key never encodes to 0
    pub(crate) fn from_key(key: ResourceKey) -> Self {
        Self(key.data().as_ffi())
    }

    pub(crate) fn key(self) -> Option<ResourceKey> {
        if self.is_null() {
            None
        } else {
            Some(KeyData::from_ffi(self.0).into())
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Handle(null)")
        } else {
            write!(f, "Handle({:#x})", self.0)
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HandleKind {
    Device,
    Queue,
    Buffer,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandleKind::Device => "device",
            HandleKind::Queue => "queue",
            HandleKind::Buffer => "buffer",
        };
        f.write_str(name)
    }
}

macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub(crate) Handle);

        impl $name {
            pub const NULL: $name = $name(Handle::NULL);

            /// The registry checks the kind when the handle is used
            pub fn from_handle(handle: Handle) -> Self {
                Self(handle)
            }

            pub fn handle(self) -> Handle {
                self.0
            }

            pub fn is_null(self) -> bool {
                self.0.is_null()
            }
        }

        impl From<$name> for Handle {
            fn from(value: $name) -> Handle {
                value.0
            }
        }
    };
}

typed_handle!(
    /// The GPU a queue or buffer is created on
    Device
);
typed_handle!(
    /// Command submission channel bound to one device
    Queue
);
typed_handle!(
    /// GPU-visible memory allocation
    Buffer
);
