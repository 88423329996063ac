//! # Booking Repository
//!
//! The persistence store is the sole owner of durable booking state. The
//! lifecycle engine only reads snapshots and proposes field deltas; this
//! trait is the seam between the two.
//!
//! ## Implementations
//!
//! - **PgBookingRepository**: production implementation on PostgreSQL
//! - **InMemoryBookingRepository**: dev/test implementation behind a `RwLock`
//!
//! ## Concurrency
//!
//! There is no row version. Two commands touching different fields of the
//! same booking interleave freely and each field is last-write-wins.
//! Payment confirmations are conditional writes on the status they change.
//! The only multi-step mutation, the `notes` read-modify-append, is done
//! under a row lock (Postgres) or the write lock (in-memory).

mod inmemory;
mod postgres;

pub use inmemory::InMemoryBookingRepository;
pub use postgres::PgBookingRepository;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{BookingDelta, BookingRecord, ModelError, PaymentField};

/// Errors that can occur during booking repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Booking not found: {0}")]
    NotFound(Uuid),

    #[error("Booking already exists: {0}")]
    AlreadyExists(Uuid),

    #[error("Corrupt booking {id}: {source}")]
    DataIntegrity {
        id: Uuid,
        #[source]
        source: ModelError,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Load and update booking records by id
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Fetch one booking, `None` if it does not exist
    async fn fetch(&self, id: Uuid) -> RepoResult<Option<BookingRecord>>;

    /// All bookings, newest first
    async fn list(&self) -> RepoResult<Vec<BookingRecord>>;

    /// Persist a new booking
    async fn insert(&self, record: &BookingRecord) -> RepoResult<()>;

    /// Write the `Some` fields of `delta` in a single statement.
    ///
    /// Either every field is written or none is.
    async fn apply_delta(&self, id: Uuid, delta: &BookingDelta) -> RepoResult<BookingRecord>;

    /// Write `delta` only while `field` is still `unpaid`.
    ///
    /// The status check and the write are one statement, so of two
    /// concurrent confirmations exactly one succeeds. `Ok(None)` means the
    /// booking exists but `field` has already moved on.
    async fn apply_delta_if_unpaid(
        &self,
        id: Uuid,
        field: PaymentField,
        delta: &BookingDelta,
    ) -> RepoResult<Option<BookingRecord>>;

    /// Write `delta` and append `note_line` to the booking's notes.
    ///
    /// Reads the current notes, appends on a new line, and writes them back
    /// together with the delta as one unit.
    async fn apply_delta_with_note(
        &self,
        id: Uuid,
        delta: &BookingDelta,
        note_line: &str,
    ) -> RepoResult<BookingRecord>;
}

impl std::fmt::Debug for dyn BookingRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BookingRepository")
    }
}

/// Append a line to existing free-text notes
pub(crate) fn append_note(existing: Option<&str>, line: &str) -> String {
    match existing {
        Some(notes) if !notes.trim().is_empty() => format!("{}\n{}", notes.trim_end(), line),
        _ => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_note_to_empty() {
        assert_eq!(append_note(None, "first"), "first");
        assert_eq!(append_note(Some("  "), "first"), "first");
    }

    #[test]
    fn test_append_note_keeps_history() {
        assert_eq!(append_note(Some("first\n"), "second"), "first\nsecond");
    }

    #[test]
    fn test_repo_error_display() {
        let id = Uuid::new_v4();
        let err = RepoError::DataIntegrity {
            id,
            source: ModelError::UnknownValue {
                field: "refund_status",
                value: "bogus".to_string(),
            },
        };
        assert!(err.to_string().contains(&id.to_string()));
        assert!(err.to_string().contains("bogus"));
    }
}
