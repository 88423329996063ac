//! PostgreSQL implementation of the BookingRepository trait

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgExecutor, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use super::{append_note, BookingRepository, RepoError, RepoResult};
use crate::models::{BookingDelta, BookingRecord, BookingSnapshot, ModelError, PaymentField};

const BOOKING_COLUMNS: &str = r#"
    id, status, date_to, total_price, deposit_amount,
    deposit_status, deposit_proof_url, deposit_paid_at,
    payment_status, payment_proof_url,
    payout_status, payout_proof_url,
    refund_status, refund_amount, refund_proof_url, refund_processed_at,
    notes, created_at, updated_at
"#;

/// Raw row as stored; status columns are plain text and validated on read
#[derive(Debug, Clone, FromRow)]
struct BookingRow {
    id: Uuid,
    status: String,
    date_to: Option<NaiveDate>,
    total_price: Option<f64>,
    deposit_amount: Option<f64>,
    deposit_status: String,
    deposit_proof_url: Option<String>,
    deposit_paid_at: Option<DateTime<Utc>>,
    payment_status: String,
    payment_proof_url: Option<String>,
    payout_status: String,
    payout_proof_url: Option<String>,
    refund_status: String,
    refund_amount: Option<f64>,
    refund_proof_url: Option<String>,
    refund_processed_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parse a status column, reporting the column name on failure
fn parse_column<T>(id: Uuid, column: &'static str, value: &str) -> RepoResult<T>
where
    T: FromStr<Err = ModelError>,
{
    value.parse().map_err(|_| RepoError::DataIntegrity {
        id,
        source: ModelError::UnknownValue {
            field: column,
            value: value.to_string(),
        },
    })
}

impl TryFrom<BookingRow> for BookingRecord {
    type Error = RepoError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let id = row.id;

        let snapshot = BookingSnapshot {
            status: parse_column(id, "status", &row.status)?,
            date_to: row.date_to,
            total_price: row.total_price,
            deposit_amount: row.deposit_amount,
            deposit_status: parse_column(id, "deposit_status", &row.deposit_status)?,
            deposit_proof_url: row.deposit_proof_url,
            payment_status: parse_column(id, "payment_status", &row.payment_status)?,
            payment_proof_url: row.payment_proof_url,
            payout_status: parse_column(id, "payout_status", &row.payout_status)?,
            refund_status: parse_column(id, "refund_status", &row.refund_status)?,
            refund_amount: row.refund_amount,
            refund_proof_url: row.refund_proof_url,
        };

        Ok(BookingRecord {
            id,
            snapshot,
            deposit_paid_at: row.deposit_paid_at,
            payout_proof_url: row.payout_proof_url,
            refund_processed_at: row.refund_processed_at,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// BookingRepository on a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Single UPDATE writing every `Some` field of the delta.
///
/// `notes` is written only when provided. With `unpaid_guard` the row is
/// only updated while that payment is still `unpaid`. Returns `None` if no
/// row matched.
async fn update_booking<'e, E: PgExecutor<'e>>(
    executor: E,
    id: Uuid,
    delta: &BookingDelta,
    notes: Option<&str>,
    unpaid_guard: Option<PaymentField>,
) -> Result<Option<BookingRow>, sqlx::Error> {
    let guard = unpaid_guard
        .map(|field| format!(" AND {} = 'unpaid'", field.column()))
        .unwrap_or_default();

    let sql = format!(
        r#"
        UPDATE bookings SET
            deposit_status      = COALESCE($2, deposit_status),
            deposit_paid_at     = COALESCE($3, deposit_paid_at),
            payment_status      = COALESCE($4, payment_status),
            payout_status       = COALESCE($5, payout_status),
            payout_proof_url    = COALESCE($6, payout_proof_url),
            refund_status       = COALESCE($7, refund_status),
            refund_amount       = COALESCE($8, refund_amount),
            refund_proof_url    = COALESCE($9, refund_proof_url),
            refund_processed_at = COALESCE($10, refund_processed_at),
            notes               = COALESCE($11, notes),
            updated_at          = NOW()
        WHERE id = $1{guard}
        RETURNING {BOOKING_COLUMNS}
        "#
    );

    sqlx::query_as::<_, BookingRow>(&sql)
        .bind(id)
        .bind(delta.deposit_status.map(|s| s.as_str()))
        .bind(delta.deposit_paid_at)
        .bind(delta.payment_status.map(|s| s.as_str()))
        .bind(delta.payout_status.map(|s| s.as_str()))
        .bind(delta.payout_proof_url.as_deref())
        .bind(delta.refund_status.map(|s| s.as_str()))
        .bind(delta.refund_amount)
        .bind(delta.refund_proof_url.as_deref())
        .bind(delta.refund_processed_at)
        .bind(notes)
        .fetch_optional(executor)
        .await
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn fetch(&self, id: Uuid) -> RepoResult<Option<BookingRecord>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(BookingRecord::try_from).transpose()
    }

    async fn list(&self) -> RepoResult<Vec<BookingRecord>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC, id");
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(BookingRecord::try_from).collect()
    }

    async fn insert(&self, record: &BookingRecord) -> RepoResult<()> {
        let snap = &record.snapshot;
        let result = sqlx::query(
            r#"
            INSERT INTO bookings (
                id, status, date_to, total_price, deposit_amount,
                deposit_status, deposit_proof_url, deposit_paid_at,
                payment_status, payment_proof_url,
                payout_status, payout_proof_url,
                refund_status, refund_amount, refund_proof_url, refund_processed_at,
                notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(record.id)
        .bind(snap.status.as_str())
        .bind(snap.date_to)
        .bind(snap.total_price)
        .bind(snap.deposit_amount)
        .bind(snap.deposit_status.as_str())
        .bind(snap.deposit_proof_url.as_deref())
        .bind(record.deposit_paid_at)
        .bind(snap.payment_status.as_str())
        .bind(snap.payment_proof_url.as_deref())
        .bind(snap.payout_status.as_str())
        .bind(record.payout_proof_url.as_deref())
        .bind(snap.refund_status.as_str())
        .bind(snap.refund_amount)
        .bind(snap.refund_proof_url.as_deref())
        .bind(record.refund_processed_at)
        .bind(record.notes.as_deref())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepoError::AlreadyExists(record.id));
        }
        Ok(())
    }

    async fn apply_delta(&self, id: Uuid, delta: &BookingDelta) -> RepoResult<BookingRecord> {
        let row = update_booking(&self.pool, id, delta, None, None)
            .await?
            .ok_or(RepoError::NotFound(id))?;
        BookingRecord::try_from(row)
    }

    async fn apply_delta_if_unpaid(
        &self,
        id: Uuid,
        field: PaymentField,
        delta: &BookingDelta,
    ) -> RepoResult<Option<BookingRecord>> {
        if let Some(row) = update_booking(&self.pool, id, delta, None, Some(field)).await? {
            return BookingRecord::try_from(row).map(Some);
        }

        // No row matched: either the booking is gone or the guard failed
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM bookings WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        if exists {
            Ok(None)
        } else {
            Err(RepoError::NotFound(id))
        }
    }

    async fn apply_delta_with_note(
        &self,
        id: Uuid,
        delta: &BookingDelta,
        note_line: &str,
    ) -> RepoResult<BookingRecord> {
        let mut tx = self.pool.begin().await?;

        // Row lock so a concurrent append cannot be lost between read and write
        let current: Option<(Option<String>,)> =
            sqlx::query_as("SELECT notes FROM bookings WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let (existing,) = current.ok_or(RepoError::NotFound(id))?;
        let notes = append_note(existing.as_deref(), note_line);

        let row = update_booking(&mut *tx, id, delta, Some(&notes), None)
            .await?
            .ok_or(RepoError::NotFound(id))?;

        tx.commit().await?;

        BookingRecord::try_from(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PayoutStatus;

    fn row(id: Uuid) -> BookingRow {
        let now = Utc::now();
        BookingRow {
            id,
            status: "confirmed".to_string(),
            date_to: None,
            total_price: Some(500.0),
            deposit_amount: Some(100.0),
            deposit_status: "paid".to_string(),
            deposit_proof_url: None,
            deposit_paid_at: Some(now),
            payment_status: "unpaid".to_string(),
            payment_proof_url: None,
            payout_status: "pending".to_string(),
            payout_proof_url: None,
            refund_status: "not_requested".to_string(),
            refund_amount: None,
            refund_proof_url: None,
            refund_processed_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_row_converts_to_record() {
        let id = Uuid::new_v4();
        let record = BookingRecord::try_from(row(id)).unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.snapshot.payout_status, PayoutStatus::Pending);
        assert_eq!(record.snapshot.total_price, Some(500.0));
    }

    #[test]
    fn test_unknown_status_is_data_integrity() {
        let id = Uuid::new_v4();
        let mut bad = row(id);
        bad.payout_status = "settled".to_string();

        match BookingRecord::try_from(bad) {
            Err(RepoError::DataIntegrity { id: found, source }) => {
                assert_eq!(found, id);
                assert_eq!(
                    source,
                    ModelError::UnknownValue {
                        field: "payout_status",
                        value: "settled".to_string(),
                    }
                );
            }
            other => panic!("expected DataIntegrity, got {:?}", other),
        }
    }
}
