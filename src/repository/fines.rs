//! Fines repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult, Conflict},
    models::{Fine, FineStatus},
};

use super::Page;

#[derive(Clone)]
pub struct FinesRepository {
    pool: Pool<Postgres>,
}

impl FinesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<Fine>> {
        let fine = sqlx::query_as::<_, Fine>("SELECT * FROM fines WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(fine)
    }

    pub async fn list(&self, status: Option<FineStatus>, page: Page) -> AppResult<(Vec<Fine>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM fines WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let fines = sqlx::query_as::<_, Fine>(
            r#"
            SELECT * FROM fines
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((fines, total))
    }

    pub async fn list_by_borrower(&self, borrower_id: i32) -> AppResult<Vec<Fine>> {
        let fines = sqlx::query_as::<_, Fine>(
            "SELECT * FROM fines WHERE borrower_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(fines)
    }

    /// Store a settled or waived fine if nobody changed its status meanwhile
    pub async fn update_status(&self, fine: &Fine, expected: FineStatus) -> AppResult<Fine> {
        let updated = sqlx::query_as::<_, Fine>(
            r#"
            UPDATE fines SET
                status = $2,
                paid_amount = $3,
                paid_date = $4,
                updated_at = $5
            WHERE id = $1 AND status = $6
            RETURNING *
            "#,
        )
        .bind(fine.id)
        .bind(fine.status)
        .bind(fine.paid_amount)
        .bind(fine.paid_date)
        .bind(fine.updated_at)
        .bind(expected)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(fine) => Ok(fine),
            None if self.find_by_id(fine.id).await?.is_some() => Err(Conflict::ConcurrentModification.into()),
            None => Err(AppError::NotFound(format!("Fine with id {} not found", fine.id))),
        }
    }
}
