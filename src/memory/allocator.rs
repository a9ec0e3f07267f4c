use std::alloc::{self, Layout};
use std::collections::HashMap;
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, error, warn};

use crate::engine::MemoryType;
use crate::error::{Error, Result};
use super::device::{DeviceError, DeviceRuntime, HostRuntime, HOST_ALIGNMENT};

/// Name substituted when a release cannot resolve its allocation record.
const UNKNOWN_TENSOR: &str = "<unknown>";

/// Opaque key into the allocation registry.
///
/// Travels with the buffer from allocation to release in place of a raw
/// side-channel pointer, so a stale or duplicated release is detectable
/// instead of being undefined behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AllocationId(u64);

impl fmt::Display for AllocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Registry entry created for every successful non-null allocation.
///
/// Carries the tensor name from the allocating callback to the releasing
/// one, plus everything needed to reclaim the memory through the primitive
/// it was obtained with.
#[derive(Debug)]
struct AllocationRecord {
    ptr: NonNull<u8>,
    /// Layout of heap-owned buffers; pinned and device buffers are freed
    /// through the runtime instead.
    layout: Option<Layout>,
    byte_size: usize,
    memory_type: MemoryType,
    device: i64,
    tensor_name: String,
}

// Records only move between callbacks, never get aliased.
unsafe impl Send for AllocationRecord {}

/// Buffer handle returned to the engine for one output tensor.
///
/// A null handle (zero-byte tensors) owns nothing and requires no release.
#[derive(Debug, Clone, Copy)]
pub struct OutputBuffer {
    ptr: *mut u8,
    byte_size: usize,
    id: Option<AllocationId>,
}

impl OutputBuffer {
    fn new(ptr: *mut u8, byte_size: usize, id: AllocationId) -> Self {
        Self {
            ptr,
            byte_size,
            id: Some(id),
        }
    }

    pub fn null() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            byte_size: 0,
            id: None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    /// The registry key attached at allocation time, if any.
    pub fn allocation_id(&self) -> Option<AllocationId> {
        self.id
    }

    /// Detach the registry key, modeling a caller that lost the side
    /// channel between allocation and release.
    pub fn without_id(self) -> Self {
        Self { id: None, ..self }
    }
}

unsafe impl Send for OutputBuffer {}

/// Result of a successful allocation: the buffer plus the placement and
/// device that were actually used, echoed back even when they differ from
/// the request.
#[derive(Debug)]
pub struct Allocation {
    pub buffer: OutputBuffer,
    pub memory_type: MemoryType,
    pub device: i64,
}

/// What happened to one released buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Memory reclaimed through the primitive matching its placement.
    Freed,
    /// Null buffer; nothing owned, nothing to do.
    NullBuffer,
    /// No registry record could be resolved; memory left in place.
    UnknownBuffer,
    /// The record was already consumed by an earlier release.
    DoubleRelease,
    /// Placement with no matching free primitive; the record is destroyed
    /// but the memory is deliberately left in place.
    UnsupportedPlacement,
    /// Caller-supplied placement disagreed with the recorded one; the
    /// buffer was reclaimed through the recorded primitive.
    PlacementMismatch { recorded: MemoryType },
    /// Device-context selection failed; the free was skipped.
    DeviceContextFailed(DeviceError),
    /// The free primitive itself failed.
    FreeFailed(DeviceError),
}

/// Diagnostic record of one release call.
///
/// Release is best-effort by contract: every outcome, clean or not, maps
/// to success at the engine boundary. Anomalies land here and in the log.
#[derive(Debug, Clone)]
pub struct ReleaseReport {
    pub buffer_addr: usize,
    pub byte_size: usize,
    pub memory_type: MemoryType,
    pub tensor_name: String,
    pub outcome: ReleaseOutcome,
}

impl ReleaseReport {
    pub fn is_clean(&self) -> bool {
        matches!(
            self.outcome,
            ReleaseOutcome::Freed | ReleaseOutcome::NullBuffer
        )
    }
}

/// Services the engine's output-buffer callbacks: obtains tensor memory in
/// the requested placement and reclaims it when the engine hands it back.
///
/// Every live allocation is tracked in a registry keyed by an opaque
/// [`AllocationId`], which doubles as the side channel carrying the tensor
/// name to the release side. The registry makes double releases and
/// never-released leaks observable.
pub struct ResponseAllocator {
    runtime: Arc<dyn DeviceRuntime>,
    records: Mutex<HashMap<AllocationId, AllocationRecord>>,
    next_id: AtomicU64,
    allocated_bytes: AtomicUsize,
}

impl ResponseAllocator {
    pub fn new(runtime: Arc<dyn DeviceRuntime>) -> Self {
        Self {
            runtime,
            records: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            allocated_bytes: AtomicUsize::new(0),
        }
    }

    /// Allocator backed by the host-only runtime.
    pub fn with_host_runtime() -> Self {
        Self::new(Arc::new(HostRuntime::new()))
    }

    fn records(&self) -> MutexGuard<'_, HashMap<AllocationId, AllocationRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Obtain a buffer for one output tensor.
    ///
    /// Zero-byte requests return a null buffer and echo the request back
    /// unchanged. Pinned and device requests go through the runtime after
    /// selecting the device context. CPU requests, and requests for any
    /// placement this allocator does not service, come from the ordinary
    /// heap; the actual placement is echoed back and callers must not
    /// assume the request was honored.
    ///
    /// A single failure is terminal for the call: no retries, no fallback
    /// once a recognized placement was chosen, and no registry entry left
    /// behind.
    pub fn allocate(
        &self,
        tensor_name: &str,
        byte_size: usize,
        preferred_memory_type: MemoryType,
        preferred_device: i64,
    ) -> Result<Allocation> {
        if byte_size == 0 {
            debug!("allocated 0 bytes for result tensor {}", tensor_name);
            return Ok(Allocation {
                buffer: OutputBuffer::null(),
                memory_type: preferred_memory_type,
                device: preferred_device,
            });
        }

        let device = preferred_device;
        let mut actual = preferred_memory_type;
        let (ptr, layout) = match preferred_memory_type {
            MemoryType::CpuPinned => {
                self.enter_device_context(device)?;
                let ptr = self.runtime.alloc_pinned(byte_size).map_err(|e| {
                    Error::AllocationFailed(format!(
                        "pinned allocation of {} bytes failed: {}",
                        byte_size, e
                    ))
                })?;
                (ptr, None)
            }
            MemoryType::Gpu => {
                self.enter_device_context(device)?;
                let ptr = self.runtime.alloc_device(byte_size).map_err(|e| {
                    Error::AllocationFailed(format!(
                        "device allocation of {} bytes failed: {}",
                        byte_size, e
                    ))
                })?;
                (ptr, None)
            }
            // CPU, and the fallback for placements this allocator does not
            // service: managed-memory requests degrade to plain host memory.
            MemoryType::Cpu | MemoryType::Managed => {
                actual = MemoryType::Cpu;
                let (ptr, layout) = self.heap_alloc(byte_size)?;
                (ptr, Some(layout))
            }
        };

        let id = AllocationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let record = AllocationRecord {
            ptr,
            layout,
            byte_size,
            memory_type: actual,
            device,
            tensor_name: tensor_name.to_string(),
        };
        self.records().insert(id, record);
        self.allocated_bytes.fetch_add(byte_size, Ordering::Relaxed);

        debug!(
            "allocated {} bytes in {} for result tensor {}",
            byte_size, actual, tensor_name
        );

        Ok(Allocation {
            buffer: OutputBuffer::new(ptr.as_ptr(), byte_size, id),
            memory_type: actual,
            device,
        })
    }

    /// Hand a buffer back after the engine is done with its tensor.
    ///
    /// Never fails: anomalies are logged and recorded in the report so a
    /// stray placement or a duplicated release cannot abort the caller's
    /// teardown path. The allocation record is consumed on every branch
    /// that found one.
    pub fn release(
        &self,
        buffer: OutputBuffer,
        byte_size: usize,
        memory_type: MemoryType,
        device: i64,
    ) -> ReleaseReport {
        let buffer_addr = buffer.as_ptr() as usize;
        if buffer.is_null() {
            debug!("releasing null buffer; nothing to do");
            return ReleaseReport {
                buffer_addr,
                byte_size,
                memory_type,
                tensor_name: UNKNOWN_TENSOR.to_string(),
                outcome: ReleaseOutcome::NullBuffer,
            };
        }

        // Consume the record up front so the name carrier is destroyed
        // exactly once no matter which branch runs.
        let record = buffer
            .allocation_id()
            .and_then(|id| self.records().remove(&id));
        if let Some(record) = &record {
            self.allocated_bytes
                .fetch_sub(record.byte_size, Ordering::Relaxed);
        }

        let tensor_name = record
            .as_ref()
            .map(|r| r.tensor_name.clone())
            .unwrap_or_else(|| UNKNOWN_TENSOR.to_string());

        debug!(
            "releasing buffer {:#x} of size {} in {} for result '{}'",
            buffer_addr, byte_size, memory_type, tensor_name
        );

        let outcome = match (record, memory_type) {
            (record, MemoryType::Managed) => {
                // No free primitive for this placement. The record (if
                // any) is gone, the memory stays.
                error!(
                    "unexpected buffer {:#x} in {} for result '{}'; not freed",
                    buffer_addr, memory_type, tensor_name
                );
                drop(record);
                ReleaseOutcome::UnsupportedPlacement
            }
            (None, _) => match buffer.allocation_id() {
                Some(id) if id.0 < self.next_id.load(Ordering::Relaxed) => {
                    error!(
                        "buffer {:#x} for result '{}' was already released",
                        buffer_addr, tensor_name
                    );
                    ReleaseOutcome::DoubleRelease
                }
                _ => {
                    error!(
                        "no allocation record for buffer {:#x}; memory left in place",
                        buffer_addr
                    );
                    ReleaseOutcome::UnknownBuffer
                }
            },
            (Some(record), supplied) if supplied != record.memory_type => {
                error!(
                    "buffer {:#x} was allocated in {} but released as {}; reclaiming via {}",
                    buffer_addr, record.memory_type, supplied, record.memory_type
                );
                let recorded = record.memory_type;
                match self.free_record(&record, device) {
                    ReleaseOutcome::Freed => ReleaseOutcome::PlacementMismatch { recorded },
                    other => other,
                }
            }
            (Some(record), _) => self.free_record(&record, device),
        };

        ReleaseReport {
            buffer_addr,
            byte_size,
            memory_type,
            tensor_name,
            outcome,
        }
    }

    /// Number of live allocations still tracked by the registry.
    pub fn outstanding(&self) -> usize {
        self.records().len()
    }

    /// Names of tensors whose buffers were never released.
    pub fn outstanding_tensors(&self) -> Vec<String> {
        self.records()
            .values()
            .map(|r| r.tensor_name.clone())
            .collect()
    }

    /// Bytes currently held by live allocations.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated_bytes.load(Ordering::Relaxed)
    }

    /// Select the device context, tolerating the two failures that simply
    /// mean "no accelerator here": the engine probes device-adjacent
    /// placements even on bare hosts.
    fn enter_device_context(&self, device: i64) -> Result<()> {
        match self.runtime.set_device(device) {
            Ok(()) => Ok(()),
            Err(err) if err.is_benign() => Ok(()),
            Err(err) => Err(Error::AllocationFailed(format!(
                "unable to set device context {}: {}",
                device, err
            ))),
        }
    }

    fn heap_alloc(&self, byte_size: usize) -> Result<(NonNull<u8>, Layout)> {
        let layout = Layout::from_size_align(byte_size, HOST_ALIGNMENT).map_err(|e| {
            Error::AllocationFailed(format!("invalid layout for {} bytes: {}", byte_size, e))
        })?;
        let ptr = unsafe { alloc::alloc(layout) };
        match NonNull::new(ptr) {
            Some(ptr) => Ok((ptr, layout)),
            None => Err(Error::AllocationFailed(format!(
                "host allocation of {} bytes failed",
                byte_size
            ))),
        }
    }

    /// Free through the primitive the record was allocated with, after
    /// re-selecting the device context the caller named. Context and free
    /// failures are logged, never raised; release stays non-blocking for
    /// teardown.
    fn free_record(&self, record: &AllocationRecord, device: i64) -> ReleaseOutcome {
        let addr = record.ptr.as_ptr() as usize;
        match record.memory_type {
            MemoryType::Cpu => {
                if let Some(layout) = record.layout {
                    unsafe { alloc::dealloc(record.ptr.as_ptr(), layout) };
                }
                ReleaseOutcome::Freed
            }
            MemoryType::CpuPinned => match self.runtime.set_device(device) {
                Ok(()) => match self.runtime.free_pinned(record.ptr, record.byte_size) {
                    Ok(()) => ReleaseOutcome::Freed,
                    Err(err) => {
                        error!("failed to free pinned buffer {:#x}: {}", addr, err);
                        ReleaseOutcome::FreeFailed(err)
                    }
                },
                Err(err) => {
                    error!(
                        "failed to set device context {} releasing buffer {:#x}: {}",
                        device, addr, err
                    );
                    ReleaseOutcome::DeviceContextFailed(err)
                }
            },
            MemoryType::Gpu => match self.runtime.set_device(device) {
                Ok(()) => match self.runtime.free_device(record.ptr, record.byte_size) {
                    Ok(()) => ReleaseOutcome::Freed,
                    Err(err) => {
                        error!("failed to free device buffer {:#x}: {}", addr, err);
                        ReleaseOutcome::FreeFailed(err)
                    }
                },
                Err(err) => {
                    error!(
                        "failed to set device context {} releasing buffer {:#x}: {}",
                        device, addr, err
                    );
                    ReleaseOutcome::DeviceContextFailed(err)
                }
            },
            // Records never carry this placement; requests for it were
            // forced to CPU at allocation time.
            MemoryType::Managed => {
                error!(
                    "allocation record {:#x} carries an unsupported placement",
                    addr
                );
                ReleaseOutcome::UnsupportedPlacement
            }
        }
    }
}

impl Drop for ResponseAllocator {
    fn drop(&mut self) {
        let records = std::mem::take(&mut *self.records());
        for (id, record) in records {
            warn!(
                "allocation {} ('{}', {} bytes in {}) was never released; reclaiming",
                id, record.tensor_name, record.byte_size, record.memory_type
            );
            self.free_record(&record, record.device);
        }
    }
}
