//! Reservation endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{reservation::CreateReservation, Reservation},
};

use super::AuthenticatedUser;

/// Reserve a book that is currently out on loan
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservation,
    responses(
        (status = 201, description = "Reservation created", body = Reservation),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Book available or already reserved")
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let reservation = state
        .services
        .reservations
        .create(claims.user_id, request.book_id)
        .await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Reservations of one user
#[utoipa::path(
    get,
    path = "/reservations/user/{user_id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("user_id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Reservations, newest first", body = Vec<Reservation>),
        (status = 403, description = "Not authorized")
    )
)]
pub async fn user_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<Reservation>>> {
    claims.require_self_or_staff(user_id)?;

    let reservations = state.services.reservations.list_by_user(user_id).await?;
    Ok(Json(reservations))
}

/// Reservation queue of a book
#[utoipa::path(
    get,
    path = "/reservations/book/{book_id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("book_id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Open reservations in queue order", body = Vec<Reservation>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn book_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i32>,
) -> AppResult<Json<Vec<Reservation>>> {
    claims.require_staff()?;

    let reservations = state.services.reservations.list_by_book(book_id).await?;
    Ok(Json(reservations))
}

/// Cancel a reservation
#[utoipa::path(
    put,
    path = "/reservations/{id}/cancel",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation already fulfilled or cancelled")
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.cancel(&claims, id).await?;
    Ok(Json(reservation))
}
