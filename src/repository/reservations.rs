//! Reservations repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult, Conflict},
    models::Reservation,
};

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    /// Waiting reservation of a user for a book
    pub async fn find_waiting(&self, book_id: i32, user_id: i32) -> AppResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE book_id = $1 AND user_id = $2 AND status = 'waiting'
            ORDER BY reservation_date
            LIMIT 1
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reservation)
    }

    /// Whether anyone is queued for a book
    pub async fn has_waiting(&self, book_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM reservations WHERE book_id = $1 AND status = 'waiting')",
        )
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Queue a user for a book. One open reservation per user and book.
    pub async fn create(
        &self,
        book_id: i32,
        user_id: i32,
        now: DateTime<Utc>,
        expiry_date: DateTime<Utc>,
    ) -> AppResult<Reservation> {
        let mut tx = self.pool.begin().await?;

        let open: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reservations
                WHERE book_id = $1 AND user_id = $2 AND status IN ('waiting', 'available')
            )
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if open {
            return Err(Conflict::AlreadyReserved.into());
        }

        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservations (book_id, user_id, reservation_date, status, expiry_date)
            VALUES ($1, $2, $3, 'waiting', $4)
            RETURNING *
            "#,
        )
        .bind(book_id)
        .bind(user_id)
        .bind(now)
        .bind(expiry_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => Conflict::AlreadyReserved.into(),
            other => AppError::from(other),
        })?;

        tx.commit().await?;
        Ok(reservation)
    }

    pub async fn list_by_user(&self, user_id: i32) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservations WHERE user_id = $1 ORDER BY reservation_date DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    /// Open reservations of a book in queue order
    pub async fn list_open_by_book(&self, book_id: i32) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservations
            WHERE book_id = $1 AND status IN ('waiting', 'available')
            ORDER BY reservation_date ASC, id ASC
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reservations)
    }

    /// Cancel an open reservation
    pub async fn cancel(&self, id: i32, now: DateTime<Utc>) -> AppResult<Reservation> {
        let cancelled = sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservations SET status = 'cancelled', updated_at = $2
            WHERE id = $1 AND status IN ('waiting', 'available')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        match cancelled {
            Some(reservation) => Ok(reservation),
            None => {
                // Distinguish a missing row from a closed one
                self.get_by_id(id).await?;
                Err(Conflict::ReservationClosed.into())
            }
        }
    }
}
