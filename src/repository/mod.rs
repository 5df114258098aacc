//! Repository layer for database operations

pub mod books;
pub mod fines;
pub mod loans;
#[cfg(test)]
pub mod memory;
pub mod reservations;
pub mod users;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        loan::{LoanRenewal, LoanReturn},
        Book, Fine, FineStatus, Loan, LoanStatus, NewFine, NewLoan, Reservation, User,
    },
};

const DEFAULT_PER_PAGE: i64 = 10;
const MAX_PER_PAGE: i64 = 100;
// Keeps `offset()` within i64
const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;

/// Normalised pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub per_page: i64,
}

impl Page {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    /// Number of pages needed for `total` rows
    pub fn pages(&self, total: i64) -> i64 {
        (total + self.per_page - 1) / self.per_page
    }
}

/// Storage seen by the loan ledger.
///
/// Lookups never mutate. Every `commit_*` method is one atomic unit: it
/// re-checks the state it depends on and either applies all of its effects
/// or none, reporting a `Conflict` when the state moved underneath it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // Catalog
    async fn find_book(&self, book_id: i32) -> AppResult<Option<Book>>;

    // Identity
    async fn find_user(&self, user_id: i32) -> AppResult<Option<User>>;

    // Reservation queue
    async fn find_waiting_reservation(&self, book_id: i32, user_id: i32) -> AppResult<Option<Reservation>>;
    async fn has_waiting_reservation(&self, book_id: i32) -> AppResult<bool>;

    // Loans
    async fn find_loan(&self, loan_id: i32) -> AppResult<Option<Loan>>;
    async fn find_active_loan(&self, book_id: i32, borrower_id: i32) -> AppResult<Option<Loan>>;
    async fn list_loans(&self, status: Option<LoanStatus>, page: Page) -> AppResult<(Vec<Loan>, i64)>;
    async fn list_user_loans(&self, user_id: i32) -> AppResult<Vec<Loan>>;
    async fn list_overdue_loans(&self, now: DateTime<Utc>) -> AppResult<Vec<Loan>>;

    // Fines
    async fn find_fine(&self, fine_id: i32) -> AppResult<Option<Fine>>;
    async fn list_fines(&self, status: Option<FineStatus>, page: Page) -> AppResult<(Vec<Fine>, i64)>;
    async fn list_user_fines(&self, user_id: i32) -> AppResult<Vec<Fine>>;

    /// Take one copy off the shelf, record the loan and fulfil the
    /// borrower's reservation.
    async fn commit_issue(&self, loan: NewLoan, fulfilled_reservation: Option<i32>) -> AppResult<Loan>;

    /// Close the loan, put the copy back on the shelf and record the fine.
    async fn commit_return(&self, loan_return: LoanReturn, fine: Option<NewFine>) -> AppResult<(Loan, Option<Fine>)>;

    async fn commit_renewal(&self, renewal: LoanRenewal) -> AppResult<Loan>;

    /// Store `fine` if its status is still `expected`
    async fn commit_fine_update(&self, fine: Fine, expected: FineStatus) -> AppResult<Fine>;
}

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub books: books::BooksRepository,
    pub users: users::UsersRepository,
    pub loans: loans::LoansRepository,
    pub fines: fines::FinesRepository,
    pub reservations: reservations::ReservationsRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: books::BooksRepository::new(pool.clone()),
            users: users::UsersRepository::new(pool.clone()),
            loans: loans::LoansRepository::new(pool.clone()),
            fines: fines::FinesRepository::new(pool.clone()),
            reservations: reservations::ReservationsRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl LedgerStore for Repository {
    async fn find_book(&self, book_id: i32) -> AppResult<Option<Book>> {
        self.books.find_by_id(book_id).await
    }

    async fn find_user(&self, user_id: i32) -> AppResult<Option<User>> {
        self.users.find_by_id(user_id).await
    }

    async fn find_waiting_reservation(&self, book_id: i32, user_id: i32) -> AppResult<Option<Reservation>> {
        self.reservations.find_waiting(book_id, user_id).await
    }

    async fn has_waiting_reservation(&self, book_id: i32) -> AppResult<bool> {
        self.reservations.has_waiting(book_id).await
    }

    async fn find_loan(&self, loan_id: i32) -> AppResult<Option<Loan>> {
        self.loans.find_by_id(loan_id).await
    }

    async fn find_active_loan(&self, book_id: i32, borrower_id: i32) -> AppResult<Option<Loan>> {
        self.loans.find_active(book_id, borrower_id).await
    }

    async fn list_loans(&self, status: Option<LoanStatus>, page: Page) -> AppResult<(Vec<Loan>, i64)> {
        self.loans.list(status, page).await
    }

    async fn list_user_loans(&self, user_id: i32) -> AppResult<Vec<Loan>> {
        self.loans.list_by_borrower(user_id).await
    }

    async fn list_overdue_loans(&self, now: DateTime<Utc>) -> AppResult<Vec<Loan>> {
        self.loans.list_overdue(now).await
    }

    async fn find_fine(&self, fine_id: i32) -> AppResult<Option<Fine>> {
        self.fines.find_by_id(fine_id).await
    }

    async fn list_fines(&self, status: Option<FineStatus>, page: Page) -> AppResult<(Vec<Fine>, i64)> {
        self.fines.list(status, page).await
    }

    async fn list_user_fines(&self, user_id: i32) -> AppResult<Vec<Fine>> {
        self.fines.list_by_borrower(user_id).await
    }

    async fn commit_issue(&self, loan: NewLoan, fulfilled_reservation: Option<i32>) -> AppResult<Loan> {
        self.loans.issue(&loan, fulfilled_reservation).await
    }

    async fn commit_return(&self, loan_return: LoanReturn, fine: Option<NewFine>) -> AppResult<(Loan, Option<Fine>)> {
        self.loans.return_loan(&loan_return, fine.as_ref()).await
    }

    async fn commit_renewal(&self, renewal: LoanRenewal) -> AppResult<Loan> {
        self.loans.renew(&renewal).await
    }

    async fn commit_fine_update(&self, fine: Fine, expected: FineStatus) -> AppResult<Fine> {
        self.fines.update_status(&fine, expected).await
    }
}
