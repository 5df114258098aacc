//! Fine endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        fine::{FineQuery, PayFine, UserFines},
        Fine,
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

/// List fines
#[utoipa::path(
    get,
    path = "/fines",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(FineQuery),
    responses(
        (status = 200, description = "Fines, newest first", body = PaginatedResponse<Fine>),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn list_fines(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<FineQuery>,
) -> AppResult<Json<PaginatedResponse<Fine>>> {
    claims.require_staff()?;

    let listing = state.services.ledger.list_fines(&query).await?;
    Ok(Json(PaginatedResponse::new(listing.items, listing.total, listing.page)))
}

/// Fines of one user with the outstanding total
#[utoipa::path(
    get,
    path = "/fines/user/{user_id}",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(
        ("user_id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Fines of the user", body = UserFines),
        (status = 403, description = "Not authorized")
    )
)]
pub async fn user_fines(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<UserFines>> {
    claims.require_self_or_staff(user_id)?;

    let fines = state.services.ledger.user_fines(user_id).await?;
    Ok(Json(fines))
}

/// Pay a fine
#[utoipa::path(
    post,
    path = "/fines/pay/{id}",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Fine ID")
    ),
    request_body(content = PayFine, description = "Amount paid, full amount when omitted"),
    responses(
        (status = 200, description = "Fine paid", body = Fine),
        (status = 400, description = "Invalid amount"),
        (status = 404, description = "Fine not found"),
        (status = 409, description = "Already paid, waived or amount exceeds fine")
    )
)]
pub async fn pay_fine(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(fine_id): Path<i32>,
    request: Option<Json<PayFine>>,
) -> AppResult<Json<Fine>> {
    let fine = state.services.ledger.get_fine(fine_id).await?;
    claims.require_self_or_staff(fine.borrower_id)?;

    let amount = request.and_then(|Json(r)| r.amount);
    let paid = state.services.ledger.pay_fine(fine_id, amount).await?;
    Ok(Json(paid))
}

/// Waive a fine
#[utoipa::path(
    post,
    path = "/fines/waive/{id}",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Fine ID")
    ),
    responses(
        (status = 200, description = "Fine waived", body = Fine),
        (status = 403, description = "Administrator privileges required"),
        (status = 404, description = "Fine not found")
    )
)]
pub async fn waive_fine(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(fine_id): Path<i32>,
) -> AppResult<Json<Fine>> {
    claims.require_admin()?;

    let fine = state.services.ledger.waive_fine(fine_id).await?;
    Ok(Json(fine))
}
