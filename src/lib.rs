pub mod callbacks;
pub mod completion;
pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod types;

// Re-export commonly used types
pub use completion::{channel, CompletionConsumer, CompletionError, CompletionProducer};
pub use config::ServerOptions;
pub use error::{Error, Result};
pub use memory::{
    Allocation, AllocationId, DeviceError, DeviceRuntime, HostRuntime, OutputBuffer,
    ReleaseOutcome, ReleaseReport, ResponseAllocator,
};
pub use types::{DataType, LogFormat, MemoryType, ModelControlMode, ModelReadyState};
