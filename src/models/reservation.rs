//! Reservation (hold queue) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::ReservationStatus;

/// Reservation model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i32,
    pub book_id: i32,
    pub user_id: i32,
    pub reservation_date: DateTime<Utc>,
    pub status: ReservationStatus,
    pub notified_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create reservation request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReservation {
    pub book_id: i32,
}
