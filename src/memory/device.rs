use std::alloc::{self, Layout};
use std::ptr::NonNull;

use thiserror::Error;

/// Alignment for host-side buffer allocations.
pub(crate) const HOST_ALIGNMENT: usize = 64;

pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// Failures reported by a [`DeviceRuntime`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("no device available")]
    NoDevice,

    #[error("installed driver is too old for the runtime")]
    InsufficientDriver,

    #[error("device allocation failed: {0}")]
    AllocFailed(String),

    #[error("{0}")]
    Other(String),
}

impl DeviceError {
    /// Context-selection failures the allocator tolerates: the engine may
    /// request pinned memory on hosts with no accelerator at all.
    pub fn is_benign(&self) -> bool {
        matches!(self, DeviceError::NoDevice | DeviceError::InsufficientDriver)
    }
}

/// Platform primitives behind the response allocator: device-context
/// selection plus pinned-host and device memory management.
///
/// Implementations provide their own thread-safety across concurrent calls
/// targeting different devices; the allocator adds no locking around
/// context selection.
pub trait DeviceRuntime: Send + Sync {
    /// Select the device context subsequent allocations and frees operate in.
    fn set_device(&self, device: i64) -> DeviceResult<()>;

    /// Allocate page-locked host memory in the current device context.
    fn alloc_pinned(&self, byte_size: usize) -> DeviceResult<NonNull<u8>>;

    /// Allocate memory on the currently selected device.
    fn alloc_device(&self, byte_size: usize) -> DeviceResult<NonNull<u8>>;

    fn free_pinned(&self, ptr: NonNull<u8>, byte_size: usize) -> DeviceResult<()>;

    fn free_device(&self, ptr: NonNull<u8>, byte_size: usize) -> DeviceResult<()>;
}

/// Runtime for hosts without an accelerator.
///
/// Context selection is a no-op (there is only host memory). Pinned
/// requests are served from aligned heap memory, which is not actually
/// page-locked; device requests fail with [`DeviceError::NoDevice`].
#[derive(Debug, Default, Clone, Copy)]
pub struct HostRuntime;

impl HostRuntime {
    pub fn new() -> Self {
        Self
    }

    fn host_layout(byte_size: usize) -> DeviceResult<Layout> {
        Layout::from_size_align(byte_size.max(1), HOST_ALIGNMENT)
            .map_err(|e| DeviceError::AllocFailed(format!("invalid layout: {}", e)))
    }
}

impl DeviceRuntime for HostRuntime {
    fn set_device(&self, _device: i64) -> DeviceResult<()> {
        Ok(())
    }

    fn alloc_pinned(&self, byte_size: usize) -> DeviceResult<NonNull<u8>> {
        let layout = Self::host_layout(byte_size)?;
        let ptr = unsafe { alloc::alloc(layout) };
        NonNull::new(ptr).ok_or_else(|| {
            DeviceError::AllocFailed(format!("host allocation of {} bytes failed", byte_size))
        })
    }

    fn alloc_device(&self, _byte_size: usize) -> DeviceResult<NonNull<u8>> {
        Err(DeviceError::NoDevice)
    }

    fn free_pinned(&self, ptr: NonNull<u8>, byte_size: usize) -> DeviceResult<()> {
        let layout = Self::host_layout(byte_size)?;
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
        Ok(())
    }

    fn free_device(&self, _ptr: NonNull<u8>, _byte_size: usize) -> DeviceResult<()> {
        Err(DeviceError::NoDevice)
    }
}
