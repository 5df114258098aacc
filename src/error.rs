//! Error types for Libris server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable numeric error codes returned in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NotFound = 4,
    BadValue = 5,
    NoCopiesAvailable = 10,
    AlreadyBorrowed = 11,
    AlreadyReturned = 12,
    NotIssued = 13,
    RenewalLimitReached = 14,
    HasReservations = 15,
    AlreadyPaid = 16,
    AmountExceedsFine = 17,
    FineWaived = 18,
    ConcurrentModification = 19,
    BookAvailable = 20,
    AlreadyReserved = 21,
    ReservationClosed = 22,
    CopiesOnLoan = 23,
    UserHasActiveLoans = 24,
    EmailTaken = 25,
}

/// Lifecycle rule violated by an otherwise well-formed request
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    #[error("No copies available")]
    NoCopiesAvailable,
    #[error("User already has this book")]
    AlreadyBorrowed,
    #[error("Book already returned")]
    AlreadyReturned,
    #[error("Only issued books can be renewed")]
    NotIssued,
    #[error("Maximum renewal limit reached")]
    RenewalLimitReached,
    #[error("Cannot renew: book has pending reservations")]
    HasReservations,
    #[error("Fine already paid")]
    AlreadyPaid,
    #[error("Payment amount exceeds fine amount")]
    AmountExceedsFine,
    #[error("Fine has been waived")]
    FineWaived,
    #[error("Record was modified by a concurrent request")]
    ConcurrentModification,
    #[error("Book is currently available")]
    BookAvailable,
    #[error("A reservation for this book already exists")]
    AlreadyReserved,
    #[error("Reservation is already fulfilled or cancelled")]
    ReservationClosed,
    #[error("Cannot remove copies that are currently on loan")]
    CopiesOnLoan,
    #[error("User still has books on loan")]
    UserHasActiveLoans,
    #[error("Email is already registered")]
    EmailTaken,
}

impl Conflict {
    pub fn code(&self) -> ErrorCode {
        match self {
            Conflict::NoCopiesAvailable => ErrorCode::NoCopiesAvailable,
            Conflict::AlreadyBorrowed => ErrorCode::AlreadyBorrowed,
            Conflict::AlreadyReturned => ErrorCode::AlreadyReturned,
            Conflict::NotIssued => ErrorCode::NotIssued,
            Conflict::RenewalLimitReached => ErrorCode::RenewalLimitReached,
            Conflict::HasReservations => ErrorCode::HasReservations,
            Conflict::AlreadyPaid => ErrorCode::AlreadyPaid,
            Conflict::AmountExceedsFine => ErrorCode::AmountExceedsFine,
            Conflict::FineWaived => ErrorCode::FineWaived,
            Conflict::ConcurrentModification => ErrorCode::ConcurrentModification,
            Conflict::BookAvailable => ErrorCode::BookAvailable,
            Conflict::AlreadyReserved => ErrorCode::AlreadyReserved,
            Conflict::ReservationClosed => ErrorCode::ReservationClosed,
            Conflict::CopiesOnLoan => ErrorCode::CopiesOnLoan,
            Conflict::UserHasActiveLoans => ErrorCode::UserHasActiveLoans,
            Conflict::EmailTaken => ErrorCode::EmailTaken,
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(#[from] Conflict),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Conflict kind carried by this error, if any
    pub fn conflict(&self) -> Option<Conflict> {
        match self {
            AppError::Conflict(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::Authorization(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg.clone())
            }
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Conflict(kind) => (StatusCode::CONFLICT, kind.code(), kind.to_string()),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
