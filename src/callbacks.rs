//! Engine-facing entry points, in the shape of the engine's plugin-style
//! allocator contract. Wrapper errors are mapped into the engine's error
//! object at this boundary; nothing below it deals in [`EngineError`].

use crate::engine::{EngineError, MemoryType};
use crate::memory::{Allocation, OutputBuffer, ReleaseReport, ResponseAllocator};

/// Allocation entry point invoked by the engine for each output tensor.
///
/// Any wrapper failure crosses the boundary as an internal engine error;
/// the inference call that triggered the allocation fails outright.
pub fn response_alloc(
    allocator: &ResponseAllocator,
    tensor_name: &str,
    byte_size: usize,
    preferred_memory_type: MemoryType,
    preferred_device: i64,
) -> Result<Allocation, EngineError> {
    allocator
        .allocate(tensor_name, byte_size, preferred_memory_type, preferred_device)
        .map_err(EngineError::from)
}

/// Release entry point invoked by the engine when it drops a tensor.
///
/// Never fails: anomalies live in the report and the log, so a stray
/// placement or duplicated release cannot abort the engine's teardown.
pub fn response_release(
    allocator: &ResponseAllocator,
    buffer: OutputBuffer,
    byte_size: usize,
    memory_type: MemoryType,
    device: i64,
) -> Result<ReleaseReport, EngineError> {
    Ok(allocator.release(buffer, byte_size, memory_type, device))
}

/// Pre-execution buffer query. Always reports success, echoing the
/// requested placement and device back unchanged.
pub fn output_buffer_query(
    _tensor_name: &str,
    _byte_size: Option<usize>,
    memory_type: MemoryType,
    device: i64,
) -> Result<(MemoryType, i64), EngineError> {
    Ok((memory_type, device))
}
