//! Shared fixtures for the bookings integration tests
//!
//! All tests run against a pinned clock: 2025-06-15 10:30 UTC.

#![allow(dead_code)]

use async_trait::async_trait;
use bookings_rs::clock::FixedClock;
use bookings_rs::metrics::Metrics;
use bookings_rs::models::{BookingDelta, BookingRecord, BookingSnapshot, PaymentField};
use bookings_rs::repos::{BookingRepository, InMemoryBookingRepository, RepoError, RepoResult};
use bookings_rs::TransitionService;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 10, 30, 0).unwrap()
}

pub fn today() -> NaiveDate {
    now().date_naive()
}

pub fn yesterday() -> NaiveDate {
    today() - Duration::days(1)
}

pub fn tomorrow() -> NaiveDate {
    today() + Duration::days(1)
}

pub fn clock() -> FixedClock {
    FixedClock::at(now())
}

/// Booking for 1000.00 with a 300.00 deposit, ending tomorrow
pub fn snapshot() -> BookingSnapshot {
    BookingSnapshot {
        date_to: Some(tomorrow()),
        total_price: Some(1000.0),
        deposit_amount: Some(300.0),
        ..Default::default()
    }
}

pub fn record(snapshot: BookingSnapshot) -> BookingRecord {
    BookingRecord::new(Uuid::new_v4(), snapshot, now() - Duration::days(30))
}

/// Service over an in-memory store seeded with `records`
pub fn service_with(
    records: impl IntoIterator<Item = BookingRecord>,
) -> (TransitionService, InMemoryBookingRepository) {
    let repo = InMemoryBookingRepository::with_bookings(records).with_clock(Arc::new(clock()));
    (service_over(Arc::new(repo.clone())), repo)
}

/// Service over any repository, on the pinned clock
pub fn service_over(repo: Arc<dyn BookingRepository>) -> TransitionService {
    TransitionService::new(repo, Arc::new(clock()), Metrics::new().expect("metrics"))
}

/// Store whose reads work and whose writes fail like a lost connection
#[derive(Clone, Default)]
pub struct FailingWrites {
    pub inner: InMemoryBookingRepository,
}

fn connection_lost() -> RepoError {
    RepoError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl BookingRepository for FailingWrites {
    async fn fetch(&self, id: Uuid) -> RepoResult<Option<BookingRecord>> {
        self.inner.fetch(id).await
    }

    async fn list(&self) -> RepoResult<Vec<BookingRecord>> {
        self.inner.list().await
    }

    async fn insert(&self, record: &BookingRecord) -> RepoResult<()> {
        self.inner.insert(record).await
    }

    async fn apply_delta(&self, _id: Uuid, _delta: &BookingDelta) -> RepoResult<BookingRecord> {
        Err(connection_lost())
    }

    async fn apply_delta_if_unpaid(
        &self,
        _id: Uuid,
        _field: PaymentField,
        _delta: &BookingDelta,
    ) -> RepoResult<Option<BookingRecord>> {
        Err(connection_lost())
    }

    async fn apply_delta_with_note(
        &self,
        _id: Uuid,
        _delta: &BookingDelta,
        _note_line: &str,
    ) -> RepoResult<BookingRecord> {
        Err(connection_lost())
    }
}

/// Store whose reads return the bookings as first seeded, as a replica
/// lagging behind every write would
#[derive(Clone)]
pub struct StaleReads {
    pub inner: InMemoryBookingRepository,
    seeded: Arc<HashMap<Uuid, BookingRecord>>,
}

impl StaleReads {
    pub fn new(records: Vec<BookingRecord>) -> Self {
        Self {
            inner: InMemoryBookingRepository::with_bookings(records.clone())
                .with_clock(Arc::new(clock())),
            seeded: Arc::new(records.into_iter().map(|r| (r.id, r)).collect()),
        }
    }
}

#[async_trait]
impl BookingRepository for StaleReads {
    async fn fetch(&self, id: Uuid) -> RepoResult<Option<BookingRecord>> {
        Ok(self.seeded.get(&id).cloned())
    }

    async fn list(&self) -> RepoResult<Vec<BookingRecord>> {
        Ok(self.seeded.values().cloned().collect())
    }

    async fn insert(&self, record: &BookingRecord) -> RepoResult<()> {
        self.inner.insert(record).await
    }

    async fn apply_delta(&self, id: Uuid, delta: &BookingDelta) -> RepoResult<BookingRecord> {
        self.inner.apply_delta(id, delta).await
    }

    async fn apply_delta_if_unpaid(
        &self,
        id: Uuid,
        field: PaymentField,
        delta: &BookingDelta,
    ) -> RepoResult<Option<BookingRecord>> {
        self.inner.apply_delta_if_unpaid(id, field, delta).await
    }

    async fn apply_delta_with_note(
        &self,
        id: Uuid,
        delta: &BookingDelta,
        note_line: &str,
    ) -> RepoResult<BookingRecord> {
        self.inner.apply_delta_with_note(id, delta, note_line).await
    }
}
