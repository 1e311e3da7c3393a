//! PostgreSQL storage for bookings, contact messages and sessions.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use uuid::Uuid;

use jbs_core::booking::{Booking, BookingLookup, ManageToken, NewBooking};
use jbs_core::config::DatabaseConfig;
use jbs_core::store::{BookingStore, ContactStore, SessionStore, normalize_email};
use jbs_core::validation::ContactInput;
use jbs_core::{JbsError, JbsResult};

const BOOKING_COLUMNS: &str = "id, cancellation_token, session_id, first_name, last_name, email, \
    phone_number, message, event_date, status, google_calendar_event_id, zoom_meeting_id, \
    zoom_join_url, created_at, rescheduled_at, cancelled_at, original_booking_id";

#[derive(Debug, FromRow)]
struct BookingRow {
    id: i64,
    cancellation_token: Uuid,
    session_id: Option<Uuid>,
    first_name: String,
    last_name: String,
    email: String,
    phone_number: Option<String>,
    message: Option<String>,
    event_date: DateTime<Utc>,
    status: String,
    google_calendar_event_id: Option<String>,
    zoom_meeting_id: Option<String>,
    zoom_join_url: Option<String>,
    created_at: DateTime<Utc>,
    rescheduled_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    original_booking_id: Option<i64>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: row.id,
            cancellation_token: row.cancellation_token,
            session_id: row.session_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone_number: row.phone_number,
            message: row.message,
            event_date: row.event_date,
            status: row.status.into(),
            google_calendar_event_id: row.google_calendar_event_id,
            zoom_meeting_id: row.zoom_meeting_id,
            zoom_join_url: row.zoom_join_url,
            created_at: row.created_at,
            rescheduled_at: row.rescheduled_at,
            cancelled_at: row.cancelled_at,
            original_booking_id: row.original_booking_id,
        }
    }
}

fn storage(err: sqlx::Error) -> JbsError {
    JbsError::Storage(err.to_string())
}

#[derive(Clone, Debug)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> JbsResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(300))
            .connect(&config.url)
            .await
            .map_err(storage)?;

        Ok(Database { pool })
    }

    /// Create the `jbs` schema and tables if they are missing.
    pub async fn init(&self) -> JbsResult<()> {
        let statements = [
            "CREATE SCHEMA IF NOT EXISTS jbs",
            r#"
            CREATE TABLE IF NOT EXISTS jbs.sessions (
                id UUID PRIMARY KEY,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                last_seen_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS jbs.bookings (
                id BIGSERIAL PRIMARY KEY,
                cancellation_token UUID NOT NULL UNIQUE,
                session_id UUID REFERENCES jbs.sessions(id),
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL,
                phone_number TEXT,
                message TEXT,
                event_date TIMESTAMPTZ NOT NULL,
                status TEXT NOT NULL DEFAULT 'confirmed',
                google_calendar_event_id TEXT,
                zoom_meeting_id TEXT,
                zoom_join_url TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                rescheduled_at TIMESTAMPTZ,
                cancelled_at TIMESTAMPTZ,
                original_booking_id BIGINT REFERENCES jbs.bookings(id)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS bookings_original_booking_idx \
             ON jbs.bookings (original_booking_id, created_at DESC)",
            r#"
            CREATE TABLE IF NOT EXISTS jbs.contact_messages (
                id BIGSERIAL PRIMARY KEY,
                session_id UUID REFERENCES jbs.sessions(id),
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await.map_err(storage)?;
        }

        tracing::info!("database schema ready");
        Ok(())
    }

    async fn insert_row(conn: &mut PgConnection, booking: &NewBooking) -> JbsResult<Booking> {
        let sql = format!(
            "INSERT INTO jbs.bookings \
             (cancellation_token, session_id, first_name, last_name, email, phone_number, message, \
              event_date, zoom_meeting_id, zoom_join_url, created_at, original_booking_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {BOOKING_COLUMNS}"
        );

        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking.cancellation_token)
            .bind(booking.session_id)
            .bind(&booking.first_name)
            .bind(&booking.last_name)
            .bind(&booking.email)
            .bind(&booking.phone_number)
            .bind(&booking.message)
            .bind(booking.event_date)
            .bind(&booking.zoom_meeting_id)
            .bind(&booking.zoom_join_url)
            .bind(booking.created_at)
            .bind(booking.original_booking_id)
            .fetch_one(conn)
            .await
            .map(Booking::from)
            .map_err(storage)
    }
}

#[async_trait]
impl BookingLookup for Database {
    async fn find_by_token(&self, token: &ManageToken) -> JbsResult<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM jbs.bookings WHERE cancellation_token = $1 LIMIT 1");
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(token.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.map(Booking::from))
    }

    async fn find_latest_descendant(&self, booking_id: i64) -> JbsResult<Option<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM jbs.bookings \
             WHERE original_booking_id = $1 ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.map(Booking::from))
    }
}

#[async_trait]
impl BookingStore for Database {
    async fn insert_booking(&self, booking: NewBooking) -> JbsResult<Booking> {
        let mut conn = self.pool.acquire().await.map_err(storage)?;
        Self::insert_row(&mut conn, &booking).await
    }

    async fn attach_calendar_event(&self, booking_id: i64, event_id: &str) -> JbsResult<()> {
        sqlx::query("UPDATE jbs.bookings SET google_calendar_event_id = $2 WHERE id = $1")
            .bind(booking_id)
            .bind(event_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn cancel(&self, booking_id: i64, now: DateTime<Utc>) -> JbsResult<Booking> {
        let sql = format!(
            "UPDATE jbs.bookings SET status = 'cancelled', cancelled_at = $2 \
             WHERE id = $1 AND status = 'confirmed' RETURNING {BOOKING_COLUMNS}"
        );
        sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking_id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?
            .map(Booking::from)
            .ok_or_else(|| JbsError::ActionNotAllowed("Booking can no longer be cancelled".into()))
    }

    async fn reschedule(&self, previous_id: i64, replacement: NewBooking, now: DateTime<Utc>) -> JbsResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let updated = sqlx::query(
            "UPDATE jbs.bookings SET status = 'rescheduled', rescheduled_at = $2 \
             WHERE id = $1 AND status = 'confirmed'",
        )
        .bind(previous_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        // Dropping `tx` rolls back.
        if updated.rows_affected() == 0 {
            return Err(JbsError::ActionNotAllowed("Booking can no longer be rescheduled".into()));
        }

        let booking = Self::insert_row(&mut *tx, &replacement).await?;
        tx.commit().await.map_err(storage)?;
        Ok(booking)
    }
}

#[async_trait]
impl ContactStore for Database {
    async fn insert_contact(&self, session_id: Uuid, contact: &ContactInput) -> JbsResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO jbs.contact_messages (session_id, first_name, last_name, email, message) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(session_id)
        .bind(&contact.first_name)
        .bind(&contact.last_name)
        .bind(normalize_email(&contact.email))
        .bind(&contact.message)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)
    }
}

#[async_trait]
impl SessionStore for Database {
    async fn get_or_create(&self, existing: Option<Uuid>, now: DateTime<Utc>) -> JbsResult<Uuid> {
        if let Some(id) = existing {
            let touched = sqlx::query("UPDATE jbs.sessions SET last_seen_at = $2 WHERE id = $1")
                .bind(id)
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(storage)?;
            if touched.rows_affected() > 0 {
                return Ok(id);
            }
        }

        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO jbs.sessions (id, created_at, last_seen_at) VALUES ($1, $2, $2)")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        tracing::debug!(session = %id, "session created");
        Ok(id)
    }
}
