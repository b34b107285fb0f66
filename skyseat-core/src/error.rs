use uuid::Uuid;

use crate::lock::LockError;
use crate::repository::StoreError;

/// Coarse classification callers use to decide how to react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Payment,
    InvalidState,
    Validation,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Flight not found: {0}")]
    FlightNotFound(Uuid),

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Seats unavailable: {0}")]
    SeatsUnavailable(String),

    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    #[error("Invalid booking state: {0}")]
    InvalidState(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lock(#[from] LockError),
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::FlightNotFound(_) | BookingError::BookingNotFound(_) => ErrorKind::NotFound,
            BookingError::SeatsUnavailable(_) => ErrorKind::Conflict,
            BookingError::PaymentFailed(_) => ErrorKind::Payment,
            BookingError::InvalidState(_) => ErrorKind::InvalidState,
            BookingError::Validation(_) => ErrorKind::Validation,
            BookingError::Store(StoreError::StaleBooking(_)) => ErrorKind::InvalidState,
            BookingError::Store(_) | BookingError::Lock(_) => ErrorKind::Internal,
        }
    }

    /// Only contention is worth retrying unchanged; a failed payment consumes
    /// its booking id, so the caller has to submit a fresh attempt instead.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
