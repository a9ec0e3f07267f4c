use thiserror::Error;

use crate::engine::EngineError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("allocation failed: {0}")]
    AllocationFailed(String),

    #[error("unsupported memory type: {0}")]
    UnsupportedMemoryType(String),

    #[error("{0}")]
    Engine(String),
}

// The two error idioms coexist: the engine's plugin contract deals in
// EngineError objects, everything inside the wrapper deals in Error.
// Crossing the boundary is mechanical in both directions.

impl From<EngineError> for Error {
    fn from(err: EngineError) -> Self {
        Error::Engine(err.to_string())
    }
}

impl From<Error> for EngineError {
    fn from(err: Error) -> Self {
        EngineError::internal(err.to_string())
    }
}
