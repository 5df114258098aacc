//! API handlers for Libris REST endpoints

pub mod auth;
pub mod books;
pub mod dashboard;
pub mod fines;
pub mod health;
pub mod openapi;
pub mod reservations;
pub mod transactions;
pub mod users;

#[cfg(test)]
mod tests;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppError, models::user::UserClaims, repository::Page, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Items of the requested page
    pub items: Vec<T>,
    /// Total number of matching items
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Items per page
    pub per_page: i64,
    /// Number of pages
    pub pages: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>, total: i64, page: Page) -> Self {
        Self {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
            pages: page.pages(total),
        }
    }
}

/// Routes mounted under `/api/v1`
pub fn create_api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Books (catalog)
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/search", get(books::search_books))
        .route(
            "/books/:id",
            get(books::get_book).put(books::update_book).delete(books::delete_book),
        )
        // Users
        .route("/users", get(users::list_users))
        .route("/users/profile/me", get(users::get_my_profile))
        .route(
            "/users/:id",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .route("/users/:id/borrowing-history", get(users::borrowing_history))
        // Transactions (loan ledger)
        .route("/transactions", get(transactions::list_transactions))
        .route("/transactions/issue", post(transactions::issue_book))
        .route("/transactions/return/:id", post(transactions::return_book))
        .route("/transactions/renew/:id", post(transactions::renew_book))
        .route("/transactions/overdue", get(transactions::overdue_transactions))
        .route("/transactions/user/:user_id", get(transactions::user_transactions))
        .route("/transactions/:id", get(transactions::get_transaction))
        // Fines
        .route("/fines", get(fines::list_fines))
        .route("/fines/user/:user_id", get(fines::user_fines))
        .route("/fines/pay/:id", post(fines::pay_fine))
        .route("/fines/waive/:id", post(fines::waive_fine))
        // Reservations
        .route("/reservations", post(reservations::create_reservation))
        .route("/reservations/user/:user_id", get(reservations::user_reservations))
        .route("/reservations/book/:book_id", get(reservations::book_reservations))
        .route("/reservations/:id/cancel", put(reservations::cancel_reservation))
        // Dashboard
        .route("/dashboard/stats", get(dashboard::get_stats))
        .route("/dashboard/analytics", get(dashboard::get_analytics))
        .with_state(state)
}
