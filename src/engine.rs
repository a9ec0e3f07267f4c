//! Vocabulary of the server core this crate adapts.
//!
//! The engine owns model loading, scheduling, and execution; the wrapper
//! only speaks to it through these types plus the callback entry points in
//! [`crate::callbacks`]. Registration of the callbacks with a live engine
//! is outside this crate.

use thiserror::Error;
use strum_macros::{Display, EnumIter};

/// Data types the engine assigns to tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum DataType {
    Invalid,
    Bool,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Int8,
    Int16,
    Int32,
    Int64,
    Fp16,
    Fp32,
    Fp64,
    Bytes,
    Bf16,
}

/// Memory placements the engine can request output buffers in.
///
/// `Managed` (unified memory) is part of the engine's vocabulary but has no
/// counterpart in the wrapper's: allocation requests for it degrade to CPU
/// and release requests for it have no matching free primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum MemoryType {
    #[strum(to_string = "CPU")]
    Cpu,
    #[strum(to_string = "CPU_PINNED")]
    CpuPinned,
    #[strum(to_string = "GPU")]
    Gpu,
    #[strum(to_string = "MANAGED")]
    Managed,
}

/// Log line formats the engine core can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Default,
    Iso8601,
}

/// How the engine manages model loading and unloading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelControlMode {
    None,
    Poll,
    Explicit,
}

/// Error categories reported by the engine core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorCode {
    #[strum(to_string = "Unknown")]
    Unknown,
    #[strum(to_string = "Internal")]
    Internal,
    #[strum(to_string = "Not found")]
    NotFound,
    #[strum(to_string = "Invalid argument")]
    InvalidArgument,
    #[strum(to_string = "Unavailable")]
    Unavailable,
    #[strum(to_string = "Unsupported")]
    Unsupported,
    #[strum(to_string = "Already exists")]
    AlreadyExists,
}

/// Error object in the shape the engine's plugin contract requires: a code
/// from the engine's taxonomy plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{code} - {message}")]
pub struct EngineError {
    pub code: ErrorCode,
    pub message: String,
}

impl EngineError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The generic category used when a lower-level platform call fails and
    /// nothing more specific applies.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

/// Flag passed to the request-complete hook when the engine releases every
/// reference to the request at once.
pub const REQUEST_RELEASE_ALL: u32 = 1;

/// Flag passed to the response-complete hook on the final response of a
/// request.
pub const RESPONSE_COMPLETE_FINAL: u32 = 1;

/// A request handle the engine hands back through the request-complete
/// hook once it is done with it. Finalization happens inside the engine
/// and may fail; the hook logs such failures rather than raising them.
pub trait RequestHandle {
    fn finalize(self) -> Result<(), EngineError>;
}

/// Engine-side configuration produced from [`crate::config::ServerOptions`].
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub server_id: String,
    pub model_control_mode: ModelControlMode,
    pub log_format: LogFormat,
    pub log_verbose_level: u32,
    pub exit_timeout_secs: u64,
}
