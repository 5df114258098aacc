//! Dashboard statistics service

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, Row};
use utoipa::ToSchema;

use crate::{error::AppResult, models::Loan, repository::Repository};

#[derive(Debug, Serialize, ToSchema)]
pub struct BookCounts {
    pub total: i64,
    pub available: i64,
    pub borrowed: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MemberCounts {
    pub total: i64,
    pub active: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FineTotals {
    pub pending: Decimal,
    pub collected: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub books: BookCounts,
    pub members: MemberCounts,
    pub overdue_loans: i64,
    pub fines: FineTotals,
    pub recent_loans: Vec<Loan>,
}

/// Count for one month, formatted `YYYY-MM`
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct MonthlyCount {
    pub month: String,
    pub count: i64,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct GenreCount {
    pub genre: String,
    pub count: i64,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct BookLoanCount {
    pub book_id: i32,
    pub title: String,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardAnalytics {
    pub monthly_loans: Vec<MonthlyCount>,
    pub popular_genres: Vec<GenreCount>,
    pub popular_books: Vec<BookLoanCount>,
    pub monthly_members: Vec<MonthlyCount>,
}

#[derive(Clone)]
pub struct DashboardService {
    repository: Repository,
}

impl DashboardService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn stats(&self) -> AppResult<DashboardStats> {
        let pool = &self.repository.pool;

        let books = sqlx::query(
            r#"
            SELECT COALESCE(SUM(total_copies), 0)::BIGINT AS total,
                   COALESCE(SUM(available_copies), 0)::BIGINT AS available
            FROM books WHERE is_deleted = FALSE
            "#,
        )
        .fetch_one(pool)
        .await?;
        let total: i64 = books.get("total");
        let available: i64 = books.get("available");

        let members = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE membership_status = 'active') AS active
            FROM users WHERE role = 'member'
            "#,
        )
        .fetch_one(pool)
        .await?;

        let overdue_loans: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE status = 'issued' AND due_date < NOW()")
                .fetch_one(pool)
                .await?;

        let fines = sqlx::query(
            r#"
            SELECT COALESCE(SUM(amount) FILTER (WHERE status = 'pending'), 0) AS pending,
                   COALESCE(SUM(paid_amount) FILTER (WHERE status = 'paid'), 0) AS collected
            FROM fines
            "#,
        )
        .fetch_one(pool)
        .await?;

        let recent_loans = sqlx::query_as::<_, Loan>("SELECT * FROM loans ORDER BY issue_date DESC, id DESC LIMIT 10")
            .fetch_all(pool)
            .await?;

        Ok(DashboardStats {
            books: BookCounts {
                total,
                available,
                borrowed: total - available,
            },
            members: MemberCounts {
                total: members.get("total"),
                active: members.get("active"),
            },
            overdue_loans,
            fines: FineTotals {
                pending: fines.get("pending"),
                collected: fines.get("collected"),
            },
            recent_loans,
        })
    }

    pub async fn analytics(&self) -> AppResult<DashboardAnalytics> {
        let pool = &self.repository.pool;

        let monthly_loans = sqlx::query_as::<_, MonthlyCount>(
            r#"
            SELECT to_char(date_trunc('month', issue_date), 'YYYY-MM') AS month, COUNT(*) AS count
            FROM loans
            WHERE issue_date >= date_trunc('month', NOW()) - INTERVAL '11 months'
            GROUP BY 1 ORDER BY 1
            "#,
        )
        .fetch_all(pool)
        .await?;

        let popular_genres = sqlx::query_as::<_, GenreCount>(
            r#"
            SELECT g.genre, COUNT(*) AS count
            FROM loans l
            JOIN books b ON b.id = l.book_id
            CROSS JOIN LATERAL unnest(b.genres) AS g(genre)
            GROUP BY g.genre
            ORDER BY count DESC, g.genre
            LIMIT 10
            "#,
        )
        .fetch_all(pool)
        .await?;

        let popular_books = sqlx::query_as::<_, BookLoanCount>(
            r#"
            SELECT b.id AS book_id, b.title, COUNT(*) AS count
            FROM loans l
            JOIN books b ON b.id = l.book_id
            GROUP BY b.id, b.title
            ORDER BY count DESC, b.title
            LIMIT 10
            "#,
        )
        .fetch_all(pool)
        .await?;

        let monthly_members = sqlx::query_as::<_, MonthlyCount>(
            r#"
            SELECT to_char(date_trunc('month', join_date), 'YYYY-MM') AS month, COUNT(*) AS count
            FROM users
            WHERE role = 'member' AND join_date >= date_trunc('month', NOW()) - INTERVAL '11 months'
            GROUP BY 1 ORDER BY 1
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(DashboardAnalytics {
            monthly_loans,
            popular_genres,
            popular_books,
            monthly_members,
        })
    }
}
