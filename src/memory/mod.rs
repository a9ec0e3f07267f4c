pub mod allocator;
pub mod device;

pub use allocator::{
    Allocation,
    AllocationId,
    OutputBuffer,
    ReleaseOutcome,
    ReleaseReport,
    ResponseAllocator,
};

pub use device::{
    DeviceError,
    DeviceResult,
    DeviceRuntime,
    HostRuntime,
};
