use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::engine;
use crate::error::{Error, Result};

/// Data types a tensor can carry, in the wrapper's public vocabulary.
///
/// The string forms accept both the bare spelling (`"INT32"`) and the
/// configuration-file spelling (`"TYPE_INT32"`); anything unrecognized maps
/// to [`DataType::Invalid`] rather than erroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum DataType {
    #[strum(to_string = "INVALID")]
    Invalid,
    #[strum(to_string = "BOOL", serialize = "TYPE_BOOL")]
    Bool,
    #[strum(to_string = "UINT8", serialize = "TYPE_UINT8")]
    Uint8,
    #[strum(to_string = "UINT16", serialize = "TYPE_UINT16")]
    Uint16,
    #[strum(to_string = "UINT32", serialize = "TYPE_UINT32")]
    Uint32,
    #[strum(to_string = "UINT64", serialize = "TYPE_UINT64")]
    Uint64,
    #[strum(to_string = "INT8", serialize = "TYPE_INT8")]
    Int8,
    #[strum(to_string = "INT16", serialize = "TYPE_INT16")]
    Int16,
    #[strum(to_string = "INT32", serialize = "TYPE_INT32")]
    Int32,
    #[strum(to_string = "INT64", serialize = "TYPE_INT64")]
    Int64,
    #[strum(to_string = "FP16", serialize = "TYPE_FP16")]
    Fp16,
    #[strum(to_string = "FP32", serialize = "TYPE_FP32")]
    Fp32,
    #[strum(to_string = "FP64", serialize = "TYPE_FP64")]
    Fp64,
    // Model configurations spell this one TYPE_STRING.
    #[strum(to_string = "BYTES", serialize = "TYPE_STRING")]
    Bytes,
    #[strum(to_string = "BF16", serialize = "TYPE_BF16")]
    Bf16,
}

impl DataType {
    /// Parse a data type from a model-configuration string. Unrecognized
    /// strings degrade to [`DataType::Invalid`]; callers decide whether
    /// that is acceptable.
    pub fn from_config_str(s: &str) -> Self {
        Self::from_str(s).unwrap_or(DataType::Invalid)
    }

    pub fn to_engine(self) -> engine::DataType {
        match self {
            DataType::Invalid => engine::DataType::Invalid,
            DataType::Bool => engine::DataType::Bool,
            DataType::Uint8 => engine::DataType::Uint8,
            DataType::Uint16 => engine::DataType::Uint16,
            DataType::Uint32 => engine::DataType::Uint32,
            DataType::Uint64 => engine::DataType::Uint64,
            DataType::Int8 => engine::DataType::Int8,
            DataType::Int16 => engine::DataType::Int16,
            DataType::Int32 => engine::DataType::Int32,
            DataType::Int64 => engine::DataType::Int64,
            DataType::Fp16 => engine::DataType::Fp16,
            DataType::Fp32 => engine::DataType::Fp32,
            DataType::Fp64 => engine::DataType::Fp64,
            DataType::Bytes => engine::DataType::Bytes,
            DataType::Bf16 => engine::DataType::Bf16,
        }
    }

    pub fn from_engine(dtype: engine::DataType) -> Self {
        match dtype {
            engine::DataType::Invalid => DataType::Invalid,
            engine::DataType::Bool => DataType::Bool,
            engine::DataType::Uint8 => DataType::Uint8,
            engine::DataType::Uint16 => DataType::Uint16,
            engine::DataType::Uint32 => DataType::Uint32,
            engine::DataType::Uint64 => DataType::Uint64,
            engine::DataType::Int8 => DataType::Int8,
            engine::DataType::Int16 => DataType::Int16,
            engine::DataType::Int32 => DataType::Int32,
            engine::DataType::Int64 => DataType::Int64,
            engine::DataType::Fp16 => DataType::Fp16,
            engine::DataType::Fp32 => DataType::Fp32,
            engine::DataType::Fp64 => DataType::Fp64,
            engine::DataType::Bytes => DataType::Bytes,
            engine::DataType::Bf16 => DataType::Bf16,
        }
    }

    /// Fixed width of one element in bytes. `None` for variable-length
    /// (`Bytes`) and `Invalid` types.
    pub fn element_size(self) -> Option<usize> {
        match self {
            DataType::Bool | DataType::Uint8 | DataType::Int8 => Some(1),
            DataType::Uint16 | DataType::Int16 => Some(2),
            DataType::Fp16 => Some(std::mem::size_of::<half::f16>()),
            DataType::Bf16 => Some(std::mem::size_of::<half::bf16>()),
            DataType::Uint32 | DataType::Int32 | DataType::Fp32 => Some(4),
            DataType::Uint64 | DataType::Int64 | DataType::Fp64 => Some(8),
            DataType::Bytes | DataType::Invalid => None,
        }
    }

    /// Check if the data type is a floating point type
    pub fn is_floating_point(&self) -> bool {
        matches!(
            self,
            DataType::Fp16 | DataType::Fp32 | DataType::Fp64 | DataType::Bf16
        )
    }

    /// Check if the data type is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::Uint8
                | DataType::Uint16
                | DataType::Uint32
                | DataType::Uint64
        )
    }
}

/// Memory placements in the wrapper's public vocabulary: exactly the three
/// pools this layer can allocate from and release to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
pub enum MemoryType {
    #[strum(to_string = "CPU")]
    Cpu,
    #[strum(to_string = "CPU_PINNED")]
    CpuPinned,
    #[strum(to_string = "GPU")]
    Gpu,
}

impl MemoryType {
    pub fn to_engine(self) -> engine::MemoryType {
        match self {
            MemoryType::Cpu => engine::MemoryType::Cpu,
            MemoryType::CpuPinned => engine::MemoryType::CpuPinned,
            MemoryType::Gpu => engine::MemoryType::Gpu,
        }
    }

    /// The reverse mapping is partial: the engine's vocabulary is wider
    /// than the wrapper's.
    pub fn from_engine(mem_type: engine::MemoryType) -> Result<Self> {
        match mem_type {
            engine::MemoryType::Cpu => Ok(MemoryType::Cpu),
            engine::MemoryType::CpuPinned => Ok(MemoryType::CpuPinned),
            engine::MemoryType::Gpu => Ok(MemoryType::Gpu),
            other => Err(Error::UnsupportedMemoryType(other.to_string())),
        }
    }
}

/// Log line format requested through [`crate::config::ServerOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    Default,
    Iso8601,
}

impl LogFormat {
    pub fn to_engine(self) -> engine::LogFormat {
        match self {
            LogFormat::Default => engine::LogFormat::Default,
            LogFormat::Iso8601 => engine::LogFormat::Iso8601,
        }
    }
}

/// Model load/unload policy requested through [`crate::config::ServerOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelControlMode {
    None,
    Poll,
    Explicit,
}

impl ModelControlMode {
    pub fn to_engine(self) -> engine::ModelControlMode {
        match self {
            ModelControlMode::None => engine::ModelControlMode::None,
            ModelControlMode::Poll => engine::ModelControlMode::Poll,
            ModelControlMode::Explicit => engine::ModelControlMode::Explicit,
        }
    }
}

/// Readiness of a model as reported by the engine's status strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum ModelReadyState {
    #[strum(to_string = "UNKNOWN")]
    Unknown,
    #[strum(to_string = "READY")]
    Ready,
    #[strum(to_string = "UNAVAILABLE")]
    Unavailable,
    #[strum(to_string = "LOADING")]
    Loading,
    #[strum(to_string = "UNLOADING")]
    Unloading,
}

impl ModelReadyState {
    /// Parse an engine status string; anything unrecognized is `Unknown`.
    pub fn from_state_str(s: &str) -> Self {
        Self::from_str(s).unwrap_or(ModelReadyState::Unknown)
    }
}
