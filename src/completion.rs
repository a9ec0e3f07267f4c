//! One-shot hand-off of a completed response from the engine's callback
//! context to the single caller waiting on it, plus the request/response
//! lifecycle hooks built on top of it.
//!
//! The protocol is strictly one request, one response. Decoupled models
//! that emit zero or many responses per request need a queue-backed
//! completion strategy and are not handled here; a duplicate delivery
//! surfaces as [`CompletionError::AlreadyFulfilled`], a missing one as
//! [`CompletionError::Abandoned`].

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use log::error;
use thiserror::Error;

use crate::engine::RequestHandle;

/// Misuse of the one-shot slot, surfaced instead of being undefined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("completion slot already fulfilled")]
    AlreadyFulfilled,

    #[error("producer dropped without delivering a value")]
    Abandoned,

    #[error("completion value already taken")]
    AlreadyTaken,
}

enum SlotState<T> {
    Pending,
    Ready(T),
    Taken,
    Abandoned,
}

struct Slot<T> {
    state: Mutex<SlotState<T>>,
    ready: Condvar,
}

impl<T> Slot<T> {
    fn state(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create the producer/consumer pair for one request's response hand-off.
pub fn channel<T>() -> (CompletionProducer<T>, CompletionConsumer<T>) {
    let slot = Arc::new(Slot {
        state: Mutex::new(SlotState::Pending),
        ready: Condvar::new(),
    });
    (
        CompletionProducer {
            slot: Arc::clone(&slot),
        },
        CompletionConsumer { slot },
    )
}

/// Producer half: fulfills the slot at most once. Dropping an unused
/// producer wakes the consumer with [`CompletionError::Abandoned`].
pub struct CompletionProducer<T> {
    slot: Arc<Slot<T>>,
}

impl<T> CompletionProducer<T> {
    /// Deliver the value, waking the waiting consumer.
    pub fn send(&mut self, value: T) -> Result<(), CompletionError> {
        let mut state = self.slot.state();
        match *state {
            SlotState::Pending => {
                *state = SlotState::Ready(value);
                self.slot.ready.notify_one();
                Ok(())
            }
            _ => Err(CompletionError::AlreadyFulfilled),
        }
    }
}

impl<T> Drop for CompletionProducer<T> {
    fn drop(&mut self) {
        let mut state = self.slot.state();
        if let SlotState::Pending = *state {
            *state = SlotState::Abandoned;
            self.slot.ready.notify_one();
        }
    }
}

/// Consumer half: observes the delivered value exactly once.
pub struct CompletionConsumer<T> {
    slot: Arc<Slot<T>>,
}

impl<T> CompletionConsumer<T> {
    /// Block until the producer delivers or goes away.
    pub fn wait(&self) -> Result<T, CompletionError> {
        let mut state = self.slot.state();
        loop {
            match std::mem::replace(&mut *state, SlotState::Taken) {
                SlotState::Ready(value) => return Ok(value),
                SlotState::Taken => return Err(CompletionError::AlreadyTaken),
                SlotState::Abandoned => {
                    *state = SlotState::Abandoned;
                    return Err(CompletionError::Abandoned);
                }
                SlotState::Pending => {
                    *state = SlotState::Pending;
                    state = self
                        .slot
                        .ready
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    /// Non-blocking probe; `Ok(None)` while the producer is still live.
    pub fn try_wait(&self) -> Result<Option<T>, CompletionError> {
        let mut state = self.slot.state();
        match std::mem::replace(&mut *state, SlotState::Taken) {
            SlotState::Ready(value) => Ok(Some(value)),
            SlotState::Taken => Err(CompletionError::AlreadyTaken),
            SlotState::Abandoned => {
                *state = SlotState::Abandoned;
                Err(CompletionError::Abandoned)
            }
            SlotState::Pending => {
                *state = SlotState::Pending;
                Ok(None)
            }
        }
    }
}

/// Hook invoked when the engine is done with a request handle.
///
/// A missing handle is a no-op. Finalization failures are logged, never
/// raised: this hook runs on the engine's teardown path.
pub fn request_complete<R: RequestHandle>(request: Option<R>, _flags: u32) {
    if let Some(request) = request {
        if let Err(err) = request.finalize() {
            error!("failed to finalize inference request: {}", err);
        }
    }
}

/// Hook invoked when the engine completes a response.
///
/// Delivers the response to the single waiting consumer; the producer is
/// consumed on delivery and handed back untouched when the engine reports
/// no response (the hand-off stays open).
pub fn response_complete<T>(
    response: Option<T>,
    _flags: u32,
    mut producer: CompletionProducer<T>,
) -> Option<CompletionProducer<T>> {
    match response {
        Some(value) => {
            if let Err(err) = producer.send(value) {
                error!("failed to deliver completed response: {}", err);
            }
            None
        }
        None => Some(producer),
    }
}
