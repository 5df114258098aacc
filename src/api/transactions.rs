//! Loan transaction endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        loan::{IssueLoan, LoanQuery, ReturnLoan},
        Fine, LoanView,
    },
};

use super::{AuthenticatedUser, PaginatedResponse};

/// Return response, with the fine created for a late return
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    pub loan: LoanView,
    pub fine: Option<Fine>,
}

/// Issue a book to a borrower
#[utoipa::path(
    post,
    path = "/transactions/issue",
    tag = "transactions",
    security(("bearer_auth" = [])),
    request_body = IssueLoan,
    responses(
        (status = 201, description = "Book issued", body = LoanView),
        (status = 400, description = "Invalid due date"),
        (status = 403, description = "Librarian privileges required"),
        (status = 404, description = "Book or borrower not found"),
        (status = 409, description = "No copies available or book already borrowed")
    )
)]
pub async fn issue_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<IssueLoan>,
) -> AppResult<(StatusCode, Json<LoanView>)> {
    claims.require_staff()?;

    let loan = state.services.ledger.issue(claims.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(LoanView::new(loan, Utc::now()))))
}

/// Return an issued book
#[utoipa::path(
    post,
    path = "/transactions/return/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body(content = ReturnLoan, description = "Condition and notes"),
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
    request: Option<Json<ReturnLoan>>,
) -> AppResult<Json<ReturnResponse>> {
    claims.require_staff()?;

    let request = request.map(|Json(r)| r).unwrap_or_default();
    let (loan, fine) = state.services.ledger.return_loan(loan_id, request).await?;

    Ok(Json(ReturnResponse {
        loan: LoanView::new(loan, Utc::now()),
        fine,
    }))
}

/// Renew an issued loan
#[utoipa::path(
    post,
    path = "/transactions/renew/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan renewed", body = LoanView),
        (status = 404, description = "Loan not found"),
        (status = 409, description = "Not issued, renewal limit reached or book reserved")
    )
)]
pub async fn renew_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanView>> {
    claims.require_staff()?;

    let loan = state.services.ledger.renew(loan_id).await?;
    Ok(Json(LoanView::new(loan, Utc::now())))
}

/// List loan transactions
#[utoipa::path(
    get,
    path = "/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(LoanQuery),
    responses(
        (status = 200, description = "Loans, newest first", body = PaginatedResponse<LoanView>),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn list_transactions(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanQuery>,
) -> AppResult<Json<PaginatedResponse<LoanView>>> {
    claims.require_staff()?;

    let listing = state.services.ledger.list_loans(&query).await?;
    Ok(Json(PaginatedResponse::new(listing.items, listing.total, listing.page)))
}

/// Issued loans past their due date
#[utoipa::path(
    get,
    path = "/transactions/overdue",
    tag = "transactions",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue loans, most overdue first", body = Vec<LoanView>)
    )
)]
pub async fn overdue_transactions(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanView>>> {
    claims.require_staff()?;

    let loans = state.services.ledger.overdue_loans().await?;
    Ok(Json(loans))
}

/// Loans of one user
#[utoipa::path(
    get,
    path = "/transactions/user/{user_id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("user_id" = i32, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Loans of the user", body = Vec<LoanView>),
        (status = 403, description = "Not authorized")
    )
)]
pub async fn user_transactions(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> AppResult<Json<Vec<LoanView>>> {
    claims.require_self_or_staff(user_id)?;

    let loans = state.services.ledger.user_loans(user_id).await?;
    Ok(Json(loans))
}

/// Get one loan
#[utoipa::path(
    get,
    path = "/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanView),
        (status = 404, description = "Loan not found")
    )
)]
pub async fn get_transaction(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<LoanView>> {
    claims.require_staff()?;

    let loan = state.services.ledger.get_loan(loan_id).await?;
    Ok(Json(LoanView::new(loan, Utc::now())))
}
