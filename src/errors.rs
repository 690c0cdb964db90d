//! Error types for the slot pool

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Pool is exhausted - every slot is in use")]
    PoolExhausted,

    #[error("Handle does not belong to this pool")]
    ForeignHandle,

    #[error("Slot is not in use - it was never acquired or has already been returned")]
    NotInUse,

    #[error("Handle refers to an earlier occupant of this slot")]
    StaleHandle,

    #[error("Index {index} is out of range for a pool of {capacity} slots")]
    IndexOutOfRange { index: usize, capacity: usize },

    #[error("Failed to allocate storage for {capacity} slots")]
    AllocationFailed { capacity: usize },

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Metrics export failed: {0}")]
    Metrics(String),
}

impl PoolError {
    /// Whether this error is one of the rejected-return cases.
    pub fn is_invalid_return(&self) -> bool {
        matches!(
            self,
            PoolError::ForeignHandle | PoolError::NotInUse | PoolError::StaleHandle
        )
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
