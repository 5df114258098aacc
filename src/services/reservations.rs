//! Reservation queue service

use chrono::{Duration, Utc};

use crate::{
    config::LoansConfig,
    error::{AppResult, Conflict},
    models::{Reservation, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    config: LoansConfig,
}

impl ReservationsService {
    pub fn new(repository: Repository, config: LoansConfig) -> Self {
        Self { repository, config }
    }

    /// Queue a user for a book that has no copy on the shelf
    pub async fn create(&self, user_id: i32, book_id: i32) -> AppResult<Reservation> {
        let book = self.repository.books.get_active(book_id).await?;
        if book.available_copies > 0 {
            return Err(Conflict::BookAvailable.into());
        }

        let now = Utc::now();
        let expiry = now + Duration::days(self.config.reservation_hold_days);
        let reservation = self.repository.reservations.create(book_id, user_id, now, expiry).await?;

        tracing::info!(reservation_id = reservation.id, book_id, user_id, "Reservation created");
        Ok(reservation)
    }

    pub async fn list_by_user(&self, user_id: i32) -> AppResult<Vec<Reservation>> {
        self.repository.reservations.list_by_user(user_id).await
    }

    /// Waiting and available reservations of a book, oldest first
    pub async fn list_by_book(&self, book_id: i32) -> AppResult<Vec<Reservation>> {
        self.repository.books.get_active(book_id).await?;
        self.repository.reservations.list_open_by_book(book_id).await
    }

    /// Cancel a reservation; members may only cancel their own
    pub async fn cancel(&self, claims: &UserClaims, id: i32) -> AppResult<Reservation> {
        let reservation = self.repository.reservations.get_by_id(id).await?;
        claims.require_self_or_staff(reservation.user_id)?;

        let cancelled = self.repository.reservations.cancel(id, Utc::now()).await?;
        tracing::info!(reservation_id = id, cancelled_by = claims.user_id, "Reservation cancelled");
        Ok(cancelled)
    }
}
