//! Loans repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult, Conflict},
    models::{
        fine::NewFine,
        loan::{LoanRenewal, LoanReturn, NewLoan},
        Fine, Loan, LoanStatus,
    },
};

use super::Page;

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(loan)
    }

    /// Issued loan of a book to a borrower, if any
    pub async fn find_active(&self, book_id: i32, borrower_id: i32) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE book_id = $1 AND borrower_id = $2 AND status = 'issued'",
        )
        .bind(book_id)
        .bind(borrower_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(loan)
    }

    /// List loans, newest first
    pub async fn list(&self, status: Option<LoanStatus>, page: Page) -> AppResult<(Vec<Loan>, i64)> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE ($1::TEXT IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let loans = sqlx::query_as::<_, Loan>(
            r#"
            SELECT * FROM loans
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY issue_date DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(status)
        .bind(page.per_page)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((loans, total))
    }

    /// All loans of a borrower, newest first
    pub async fn list_by_borrower(&self, borrower_id: i32) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE borrower_id = $1 ORDER BY issue_date DESC, id DESC",
        )
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    /// Issued loans past their due date, most overdue first
    pub async fn list_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE status = 'issued' AND due_date < $1 ORDER BY due_date ASC, id",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    /// Issue a book in one transaction.
    ///
    /// The shelf decrement is conditional so two issues can never take the
    /// last copy, and the partial unique index on issued loans rejects a
    /// second active loan of the same book to the same borrower.
    pub async fn issue(&self, loan: &NewLoan, fulfilled_reservation: Option<i32>) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        let taken = sqlx::query(
            r#"
            UPDATE books SET available_copies = available_copies - 1, updated_at = $2
            WHERE id = $1 AND available_copies > 0 AND is_deleted = FALSE
            "#,
        )
        .bind(loan.book_id)
        .bind(loan.issue_date)
        .execute(&mut *tx)
        .await?;

        if taken.rows_affected() == 0 {
            return Err(Conflict::NoCopiesAvailable.into());
        }

        let created = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (book_id, borrower_id, issued_by, issue_date, due_date, status, renewal_count)
            VALUES ($1, $2, $3, $4, $5, 'issued', 0)
            RETURNING *
            "#,
        )
        .bind(loan.book_id)
        .bind(loan.borrower_id)
        .bind(loan.issued_by)
        .bind(loan.issue_date)
        .bind(loan.due_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => Conflict::AlreadyBorrowed.into(),
            other => AppError::from(other),
        })?;

        if let Some(reservation_id) = fulfilled_reservation {
            sqlx::query(
                r#"
                UPDATE reservations SET status = 'fulfilled', updated_at = $2
                WHERE id = $1 AND status = 'waiting'
                "#,
            )
            .bind(reservation_id)
            .bind(loan.issue_date)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(created)
    }

    /// Close an issued loan, shelve the copy and record the fine together
    pub async fn return_loan(
        &self,
        loan_return: &LoanReturn,
        fine: Option<&NewFine>,
    ) -> AppResult<(Loan, Option<Fine>)> {
        let mut tx = self.pool.begin().await?;

        let returned = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET
                status = 'returned',
                return_date = $2,
                condition = COALESCE($3, condition),
                notes = COALESCE($4, notes),
                updated_at = $2
            WHERE id = $1 AND status = 'issued'
            RETURNING *
            "#,
        )
        .bind(loan_return.loan_id)
        .bind(loan_return.return_date)
        .bind(&loan_return.condition)
        .bind(&loan_return.notes)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Conflict::AlreadyReturned)?;

        sqlx::query(
            r#"
            UPDATE books SET available_copies = LEAST(available_copies + 1, total_copies), updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(loan_return.book_id)
        .bind(loan_return.return_date)
        .execute(&mut *tx)
        .await?;

        let fine = match fine {
            Some(fine) => Some(
                sqlx::query_as::<_, Fine>(
                    r#"
                    INSERT INTO fines (borrower_id, loan_id, amount, reason, status, paid_amount)
                    VALUES ($1, $2, $3, $4, 'pending', 0)
                    RETURNING *
                    "#,
                )
                .bind(fine.borrower_id)
                .bind(fine.loan_id)
                .bind(fine.amount)
                .bind(&fine.reason)
                .fetch_one(&mut *tx)
                .await?,
            ),
            None => None,
        };

        tx.commit().await?;

        Ok((returned, fine))
    }

    /// Extend an issued loan unless another renewal got there first
    pub async fn renew(&self, renewal: &LoanRenewal) -> AppResult<Loan> {
        let renewed = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET
                due_date = $3,
                renewal_count = renewal_count + 1,
                updated_at = NOW()
            WHERE id = $1 AND status = 'issued' AND renewal_count = $2
            RETURNING *
            "#,
        )
        .bind(renewal.loan_id)
        .bind(renewal.previous_count)
        .bind(renewal.due_date)
        .fetch_optional(&self.pool)
        .await?;

        match renewed {
            Some(loan) => Ok(loan),
            None => match self.find_by_id(renewal.loan_id).await? {
                Some(loan) if !loan.is_active() => Err(Conflict::NotIssued.into()),
                Some(_) => Err(Conflict::ConcurrentModification.into()),
                None => Err(AppError::NotFound(format!("Loan with id {} not found", renewal.loan_id))),
            },
        }
    }
}
