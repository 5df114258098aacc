//! Dashboard endpoints

use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    services::dashboard::{DashboardAnalytics, DashboardStats},
};

use super::AuthenticatedUser;

/// Library overview
#[utoipa::path(
    get,
    path = "/dashboard/stats",
    tag = "dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Library statistics", body = DashboardStats),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn get_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<DashboardStats>> {
    claims.require_staff()?;

    let stats = state.services.dashboard.stats().await?;
    Ok(Json(stats))
}

/// Borrowing and membership trends
#[utoipa::path(
    get,
    path = "/dashboard/analytics",
    tag = "dashboard",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Monthly and popularity analytics", body = DashboardAnalytics),
        (status = 403, description = "Librarian privileges required")
    )
)]
pub async fn get_analytics(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<DashboardAnalytics>> {
    claims.require_staff()?;

    let analytics = state.services.dashboard.analytics().await?;
    Ok(Json(analytics))
}
