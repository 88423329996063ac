//! In-memory implementation of the BookingRepository trait for testing and development

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{append_note, BookingRepository, RepoError, RepoResult};
use crate::clock::{Clock, SystemClock};
use crate::models::{BookingDelta, BookingRecord, PaymentField, PaymentStatus};

/// BookingRepository backed by a shared `HashMap`
///
/// Suitable for:
/// - Unit and route tests (no database)
/// - Local development with `STORE_TYPE=inmemory`
///
/// Clones share the same underlying map. `updated_at` is stamped from the
/// repository's clock, the system clock unless replaced with `with_clock`.
#[derive(Clone)]
pub struct InMemoryBookingRepository {
    bookings: Arc<RwLock<HashMap<Uuid, BookingRecord>>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryBookingRepository {
    fn default() -> Self {
        Self {
            bookings: Arc::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository pre-loaded with the given bookings
    pub fn with_bookings(records: impl IntoIterator<Item = BookingRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.id, r)).collect();
        Self {
            bookings: Arc::new(RwLock::new(map)),
            ..Self::default()
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn fetch(&self, id: Uuid) -> RepoResult<Option<BookingRecord>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn list(&self) -> RepoResult<Vec<BookingRecord>> {
        let mut records: Vec<BookingRecord> = self.bookings.read().await.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn insert(&self, record: &BookingRecord) -> RepoResult<()> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&record.id) {
            return Err(RepoError::AlreadyExists(record.id));
        }
        bookings.insert(record.id, record.clone());
        Ok(())
    }

    async fn apply_delta(&self, id: Uuid, delta: &BookingDelta) -> RepoResult<BookingRecord> {
        let mut bookings = self.bookings.write().await;
        let record = bookings.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        delta.apply_to(record, self.clock.now());
        Ok(record.clone())
    }

    async fn apply_delta_if_unpaid(
        &self,
        id: Uuid,
        field: PaymentField,
        delta: &BookingDelta,
    ) -> RepoResult<Option<BookingRecord>> {
        let mut bookings = self.bookings.write().await;
        let record = bookings.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        if field.status_of(record.snapshot()) != PaymentStatus::Unpaid {
            return Ok(None);
        }
        delta.apply_to(record, self.clock.now());
        Ok(Some(record.clone()))
    }

    async fn apply_delta_with_note(
        &self,
        id: Uuid,
        delta: &BookingDelta,
        note_line: &str,
    ) -> RepoResult<BookingRecord> {
        let mut bookings = self.bookings.write().await;
        let record = bookings.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        delta.apply_to(record, self.clock.now());
        record.notes = Some(append_note(record.notes.as_deref(), note_line));
        Ok(record.clone())
    }
}
