use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, CorrelationId, RoomId, UserId};
use domain::{Booking, BookingStatus, NewBooking};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{BookingStore, Result, StoreError};

const CORRELATION_ID_CONSTRAINT: &str = "bookings_correlation_id_key";

/// PostgreSQL-backed booking store.
#[derive(Clone)]
pub struct PostgresBookingStore {
    pool: PgPool,
}

impl PostgresBookingStore {
    /// Creates a new PostgreSQL booking store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_booking(row: PgRow) -> Result<Booking> {
        let status: String = row.try_get("status")?;

        Ok(Booking {
            id: BookingId::new(row.try_get("id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            room_id: row.try_get::<Option<i64>, _>("room_id")?.map(RoomId::new),
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            status: status.parse::<BookingStatus>()?,
            created_at: row.try_get("created_at")?,
            correlation_id: CorrelationId::from(row.try_get::<String, _>("correlation_id")?),
        })
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    async fn find_by_correlation_id(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Option<Booking>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, room_id, start_date, end_date, status, created_at, correlation_id
            FROM bookings
            WHERE correlation_id = $1
            "#,
        )
        .bind(correlation_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, room_id, start_date, end_date, status, created_at, correlation_id
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_booking).transpose()
    }

    async fn insert(&self, booking: NewBooking) -> Result<Booking> {
        let row = sqlx::query(
            r#"
            INSERT INTO bookings (user_id, room_id, start_date, end_date, status, correlation_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, created_at
            "#,
        )
        .bind(booking.user_id.as_i64())
        .bind(booking.room_id.map(|r| r.as_i64()))
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.status.as_str())
        .bind(booking.correlation_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some(CORRELATION_ID_CONSTRAINT)
            {
                tracing::debug!(
                    correlation_id = %booking.correlation_id,
                    "correlation id already persisted"
                );
                return StoreError::DuplicateCorrelationId(booking.correlation_id.clone());
            }
            StoreError::Database(e)
        })?;

        let id = BookingId::new(row.try_get("id")?);
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        Ok(booking.into_booking(id, created_at))
    }

    async fn update(&self, booking: &Booking) -> Result<Booking> {
        let row = sqlx::query(
            r#"
            UPDATE bookings
            SET status = $2, room_id = $3
            WHERE id = $1
            RETURNING id, user_id, room_id, start_date, end_date, status, created_at, correlation_id
            "#,
        )
        .bind(booking.id.as_i64())
        .bind(booking.status.as_str())
        .bind(booking.room_id.map(|r| r.as_i64()))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Self::row_to_booking(row),
            None => Err(StoreError::NotFound(booking.id)),
        }
    }

    async fn find_pending_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, room_id, start_date, end_date, status, created_at, correlation_id
            FROM bookings
            WHERE status = $1 AND created_at < $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(BookingStatus::Pending.as_str())
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_booking).collect()
    }
}
