//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, dashboard, fines, health, reservations, transactions, users};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Libris API",
        version = "0.1.0",
        description = "Library circulation REST API: catalog, members, loans, fines and reservations"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    modifiers(&BearerAuth),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        // Books
        books::list_books,
        books::search_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Users
        users::list_users,
        users::get_my_profile,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::borrowing_history,
        // Transactions
        transactions::issue_book,
        transactions::return_book,
        transactions::renew_book,
        transactions::list_transactions,
        transactions::overdue_transactions,
        transactions::user_transactions,
        transactions::get_transaction,
        // Fines
        fines::list_fines,
        fines::user_fines,
        fines::pay_fine,
        fines::waive_fine,
        // Reservations
        reservations::create_reservation,
        reservations::user_reservations,
        reservations::book_reservations,
        reservations::cancel_reservation,
        // Dashboard
        dashboard::get_stats,
        dashboard::get_analytics,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            // Books
            crate::models::book::Book,
            crate::models::book::BookSortBy,
            crate::models::book::SortOrder,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            // Users
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::RegisterUser,
            crate::models::user::UpdateUser,
            crate::models::enums::Role,
            crate::models::enums::MembershipStatus,
            // Transactions
            crate::models::loan::Loan,
            crate::models::loan::LoanView,
            crate::models::loan::IssueLoan,
            crate::models::loan::ReturnLoan,
            crate::models::enums::LoanStatus,
            transactions::ReturnResponse,
            // Fines
            crate::models::fine::Fine,
            crate::models::fine::PayFine,
            crate::models::fine::UserFines,
            crate::models::enums::FineStatus,
            // Reservations
            crate::models::reservation::Reservation,
            crate::models::reservation::CreateReservation,
            crate::models::enums::ReservationStatus,
            // Dashboard
            crate::services::dashboard::DashboardStats,
            crate::services::dashboard::DashboardAnalytics,
            crate::services::dashboard::BookCounts,
            crate::services::dashboard::MemberCounts,
            crate::services::dashboard::FineTotals,
            crate::services::dashboard::MonthlyCount,
            crate::services::dashboard::GenreCount,
            crate::services::dashboard::BookLoanCount,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and authentication"),
        (name = "books", description = "Catalog management"),
        (name = "users", description = "User management"),
        (name = "transactions", description = "Loan issue, return and renewal"),
        (name = "fines", description = "Overdue fines"),
        (name = "reservations", description = "Reservation queue"),
        (name = "dashboard", description = "Statistics")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
