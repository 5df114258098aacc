//! Loan ledger: issue, return and renewal of loans, and the fines they produce.
//!
//! The ledger is authorization-agnostic; the HTTP layer checks capabilities
//! before calling it. Mutations of one book run under that book's lock and
//! end in a single conditional commit on the store, so an operation either
//! applies all of its effects or none.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    config::LoansConfig,
    error::{AppError, AppResult, Conflict},
    models::{
        fine::{FineQuery, UserFines},
        loan::{IssueLoan, LoanQuery, LoanRenewal, LoanReturn, ReturnLoan},
        Fine, FineStatus, Loan, LoanView, NewFine, NewLoan,
    },
    repository::{LedgerStore, Page},
};

/// One async mutex per book identity, kept only while someone holds or waits on it
#[derive(Default)]
pub struct BookLocks {
    locks: DashMap<i32, Arc<Mutex<()>>>,
}

impl BookLocks {
    pub async fn acquire(&self, book_id: i32) -> BookGuard<'_> {
        // Clone the handle out so the map shard is not held across the await
        let lock = self.locks.entry(book_id).or_default().clone();
        BookGuard {
            locks: self,
            book_id,
            guard: Some(lock.lock_owned().await),
        }
    }
}

/// Held lock on one book; the map entry goes away with its last user
pub struct BookGuard<'a> {
    locks: &'a BookLocks,
    book_id: i32,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for BookGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Waiters hold a clone of the Arc, so a count of 1 means only the map is left
        self.locks
            .locks
            .remove_if(&self.book_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Paginated listing returned by the ledger
#[derive(Debug)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: Page,
}

#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    config: LoansConfig,
    locks: Arc<BookLocks>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>, config: LoansConfig) -> Self {
        Self {
            store,
            config,
            locks: Arc::new(BookLocks::default()),
        }
    }

    fn loan_period(&self) -> Duration {
        Duration::days(self.config.loan_period_days)
    }

    /// Issue a book to a borrower on behalf of a staff member
    pub async fn issue(&self, staff_id: i32, request: IssueLoan) -> AppResult<Loan> {
        self.issue_at(staff_id, request, Utc::now()).await
    }

    pub async fn issue_at(&self, staff_id: i32, request: IssueLoan, now: DateTime<Utc>) -> AppResult<Loan> {
        if let Some(due_date) = request.due_date {
            if due_date <= now {
                return Err(AppError::Validation("Due date must be in the future".to_string()));
            }
        }

        let _guard = self.locks.acquire(request.book_id).await;

        let book = self
            .store
            .find_book(request.book_id)
            .await?
            .filter(|b| !b.is_deleted)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", request.book_id)))?;

        if book.available_copies <= 0 {
            return Err(Conflict::NoCopiesAvailable.into());
        }

        self.store
            .find_user(request.borrower_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", request.borrower_id)))?;

        if self.store.find_active_loan(book.id, request.borrower_id).await?.is_some() {
            return Err(Conflict::AlreadyBorrowed.into());
        }

        let reservation = self
            .store
            .find_waiting_reservation(book.id, request.borrower_id)
            .await?;

        let new_loan = NewLoan {
            book_id: book.id,
            borrower_id: request.borrower_id,
            issued_by: staff_id,
            issue_date: now,
            due_date: request.due_date.unwrap_or(now + self.loan_period()),
        };

        let loan = self
            .store
            .commit_issue(new_loan, reservation.as_ref().map(|r| r.id))
            .await?;

        tracing::info!(
            loan_id = loan.id,
            book_id = loan.book_id,
            borrower_id = loan.borrower_id,
            issued_by = staff_id,
            due_date = %loan.due_date,
            reservation_id = ?reservation.map(|r| r.id),
            "Book issued"
        );

        Ok(loan)
    }

    /// Return an issued loan, fining the borrower when it comes back late
    pub async fn return_loan(&self, loan_id: i32, request: ReturnLoan) -> AppResult<(Loan, Option<Fine>)> {
        self.return_at(loan_id, request, Utc::now()).await
    }

    pub async fn return_at(
        &self,
        loan_id: i32,
        request: ReturnLoan,
        now: DateTime<Utc>,
    ) -> AppResult<(Loan, Option<Fine>)> {
        let loan = self.get_loan(loan_id).await?;
        if !loan.is_active() {
            return Err(Conflict::AlreadyReturned.into());
        }

        let _guard = self.locks.acquire(loan.book_id).await;

        let return_date = now.max(loan.issue_date);
        let fine = NewFine::for_late_return(
            loan.id,
            loan.borrower_id,
            loan.due_date,
            return_date,
            self.config.daily_fine,
        );

        let loan_return = LoanReturn {
            loan_id: loan.id,
            book_id: loan.book_id,
            return_date,
            condition: request.condition,
            notes: request.notes,
        };

        let (loan, fine) = self.store.commit_return(loan_return, fine).await?;

        match fine {
            Some(ref fine) => tracing::info!(
                loan_id = loan.id,
                book_id = loan.book_id,
                fine_id = fine.id,
                amount = %fine.amount,
                "Book returned late, fine created"
            ),
            None => tracing::info!(loan_id = loan.id, book_id = loan.book_id, "Book returned"),
        }

        Ok((loan, fine))
    }

    /// Renew an issued loan for a fresh loan period starting now
    pub async fn renew(&self, loan_id: i32) -> AppResult<Loan> {
        self.renew_at(loan_id, Utc::now()).await
    }

    pub async fn renew_at(&self, loan_id: i32, now: DateTime<Utc>) -> AppResult<Loan> {
        let loan = self.get_loan(loan_id).await?;

        let _guard = self.locks.acquire(loan.book_id).await;

        if !loan.is_active() {
            return Err(Conflict::NotIssued.into());
        }
        if loan.renewal_count >= self.config.max_renewals {
            return Err(Conflict::RenewalLimitReached.into());
        }
        if self.store.has_waiting_reservation(loan.book_id).await? {
            return Err(Conflict::HasReservations.into());
        }

        let renewal = LoanRenewal {
            loan_id: loan.id,
            previous_count: loan.renewal_count,
            due_date: now + self.loan_period(),
        };

        let loan = self.store.commit_renewal(renewal).await?;

        tracing::info!(
            loan_id = loan.id,
            renewal_count = loan.renewal_count,
            due_date = %loan.due_date,
            "Loan renewed"
        );

        Ok(loan)
    }

    /// Pay a pending fine, in full unless a smaller amount is given
    pub async fn pay_fine(&self, fine_id: i32, amount: Option<Decimal>) -> AppResult<Fine> {
        self.pay_at(fine_id, amount, Utc::now()).await
    }

    pub async fn pay_at(&self, fine_id: i32, amount: Option<Decimal>, now: DateTime<Utc>) -> AppResult<Fine> {
        let fine = self.get_fine(fine_id).await?;
        let paid = fine.pay(amount, now)?;
        let paid = self.store.commit_fine_update(paid, fine.status).await?;

        tracing::info!(fine_id = paid.id, paid_amount = %paid.paid_amount, "Fine paid");

        Ok(paid)
    }

    /// Waive a fine whatever its status
    pub async fn waive_fine(&self, fine_id: i32) -> AppResult<Fine> {
        let fine = self.get_fine(fine_id).await?;
        if fine.status == FineStatus::Paid {
            tracing::warn!(fine_id = fine.id, paid_amount = %fine.paid_amount, "Waiving a fine that was already paid");
        }

        let waived = self.store.commit_fine_update(fine.waive(Utc::now()), fine.status).await?;

        tracing::info!(fine_id = waived.id, "Fine waived");

        Ok(waived)
    }

    pub async fn get_loan(&self, loan_id: i32) -> AppResult<Loan> {
        self.store
            .find_loan(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
    }

    pub async fn get_fine(&self, fine_id: i32) -> AppResult<Fine> {
        self.store
            .find_fine(fine_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Fine with id {} not found", fine_id)))
    }

    pub async fn list_loans(&self, query: &LoanQuery) -> AppResult<Listing<LoanView>> {
        let page = Page::new(query.page, query.per_page);
        let (loans, total) = self.store.list_loans(query.status, page).await?;
        let now = Utc::now();

        Ok(Listing {
            items: loans.into_iter().map(|l| LoanView::new(l, now)).collect(),
            total,
            page,
        })
    }

    /// Borrowing history of a user, newest first
    pub async fn user_loans(&self, user_id: i32) -> AppResult<Vec<LoanView>> {
        let now = Utc::now();
        let loans = self.store.list_user_loans(user_id).await?;
        Ok(loans.into_iter().map(|l| LoanView::new(l, now)).collect())
    }

    pub async fn overdue_loans(&self) -> AppResult<Vec<LoanView>> {
        let now = Utc::now();
        let loans = self.store.list_overdue_loans(now).await?;
        Ok(loans.into_iter().map(|l| LoanView::new(l, now)).collect())
    }

    pub async fn list_fines(&self, query: &FineQuery) -> AppResult<Listing<Fine>> {
        let page = Page::new(query.page, query.per_page);
        let (fines, total) = self.store.list_fines(query.status, page).await?;
        Ok(Listing { items: fines, total, page })
    }

    pub async fn user_fines(&self, user_id: i32) -> AppResult<UserFines> {
        let fines = self.store.list_user_fines(user_id).await?;
        Ok(UserFines::new(fines))
    }
}
