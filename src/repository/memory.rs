//! In-memory `LedgerStore` for tests.
//!
//! Every commit runs under one mutex, mirroring the single transaction the
//! Postgres repository uses, and re-checks the same conditions its SQL does.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{
    error::{AppError, AppResult, Conflict},
    models::{
        book::tests::sample_book,
        loan::{LoanRenewal, LoanReturn},
        Book, Fine, FineStatus, Loan, LoanStatus, MembershipStatus, NewFine, NewLoan, Reservation,
        ReservationStatus, Role, User,
    },
};

use super::{LedgerStore, Page};

#[derive(Default)]
struct State {
    next_id: i32,
    books: Vec<Book>,
    users: Vec<User>,
    loans: Vec<Loan>,
    fines: Vec<Fine>,
    reservations: Vec<Reservation>,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_book(&self, total_copies: i32, available_copies: i32) -> i32 {
        let mut state = self.lock();
        let id = state.next_id();
        state.books.push(sample_book(id, total_copies, available_copies));
        id
    }

    pub fn add_user(&self, role: Role) -> i32 {
        let mut state = self.lock();
        let id = state.next_id();
        let now = Utc::now();
        state.users.push(User {
            id,
            email: format!("user{}@example.org", id),
            password: String::new(),
            first_name: "Test".to_string(),
            last_name: format!("User {}", id),
            role,
            membership_id: Some(format!("LIB-{:08}", id)),
            membership_status: MembershipStatus::Active,
            membership_expiry: None,
            phone_number: None,
            address: None,
            profile_image: None,
            join_date: now,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn add_reservation(&self, book_id: i32, user_id: i32) -> i32 {
        let mut state = self.lock();
        let id = state.next_id();
        let now = Utc::now();
        state.reservations.push(Reservation {
            id,
            book_id,
            user_id,
            reservation_date: now,
            status: ReservationStatus::Waiting,
            notified_date: None,
            expiry_date: Some(now + chrono::Duration::days(7)),
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn delete_book(&self, book_id: i32) {
        if let Some(book) = self.lock().books.iter_mut().find(|b| b.id == book_id) {
            book.is_deleted = true;
        }
    }

    pub fn book(&self, book_id: i32) -> Option<Book> {
        self.lock().books.iter().find(|b| b.id == book_id).cloned()
    }

    pub fn reservation(&self, reservation_id: i32) -> Option<Reservation> {
        self.lock().reservations.iter().find(|r| r.id == reservation_id).cloned()
    }

    pub fn issued_count(&self, book_id: i32) -> i32 {
        self.lock()
            .loans
            .iter()
            .filter(|l| l.book_id == book_id && l.is_active())
            .count() as i32
    }

    pub fn fines(&self) -> Vec<Fine> {
        self.lock().fines.clone()
    }
}

fn paginate<T: Clone>(items: Vec<T>, page: Page) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let window = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.per_page as usize)
        .collect();
    (window, total)
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn find_book(&self, book_id: i32) -> AppResult<Option<Book>> {
        Ok(self.book(book_id))
    }

    async fn find_user(&self, user_id: i32) -> AppResult<Option<User>> {
        Ok(self.lock().users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn find_waiting_reservation(&self, book_id: i32, user_id: i32) -> AppResult<Option<Reservation>> {
        Ok(self
            .lock()
            .reservations
            .iter()
            .find(|r| r.book_id == book_id && r.user_id == user_id && r.status == ReservationStatus::Waiting)
            .cloned())
    }

    async fn has_waiting_reservation(&self, book_id: i32) -> AppResult<bool> {
        Ok(self
            .lock()
            .reservations
            .iter()
            .any(|r| r.book_id == book_id && r.status == ReservationStatus::Waiting))
    }

    async fn find_loan(&self, loan_id: i32) -> AppResult<Option<Loan>> {
        Ok(self.lock().loans.iter().find(|l| l.id == loan_id).cloned())
    }

    async fn find_active_loan(&self, book_id: i32, borrower_id: i32) -> AppResult<Option<Loan>> {
        Ok(self
            .lock()
            .loans
            .iter()
            .find(|l| l.book_id == book_id && l.borrower_id == borrower_id && l.is_active())
            .cloned())
    }

    async fn list_loans(&self, status: Option<LoanStatus>, page: Page) -> AppResult<(Vec<Loan>, i64)> {
        let mut loans: Vec<Loan> = self
            .lock()
            .loans
            .iter()
            .filter(|l| status.map_or(true, |s| l.status == s))
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.issue_date.cmp(&a.issue_date).then(b.id.cmp(&a.id)));
        Ok(paginate(loans, page))
    }

    async fn list_user_loans(&self, user_id: i32) -> AppResult<Vec<Loan>> {
        let mut loans: Vec<Loan> = self
            .lock()
            .loans
            .iter()
            .filter(|l| l.borrower_id == user_id)
            .cloned()
            .collect();
        loans.sort_by(|a, b| b.issue_date.cmp(&a.issue_date).then(b.id.cmp(&a.id)));
        Ok(loans)
    }

    async fn list_overdue_loans(&self, now: DateTime<Utc>) -> AppResult<Vec<Loan>> {
        let mut loans: Vec<Loan> = self
            .lock()
            .loans
            .iter()
            .filter(|l| l.is_overdue(now))
            .cloned()
            .collect();
        loans.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));
        Ok(loans)
    }

    async fn find_fine(&self, fine_id: i32) -> AppResult<Option<Fine>> {
        Ok(self.lock().fines.iter().find(|f| f.id == fine_id).cloned())
    }

    async fn list_fines(&self, status: Option<FineStatus>, page: Page) -> AppResult<(Vec<Fine>, i64)> {
        let mut fines: Vec<Fine> = self
            .lock()
            .fines
            .iter()
            .filter(|f| status.map_or(true, |s| f.status == s))
            .cloned()
            .collect();
        fines.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(paginate(fines, page))
    }

    async fn list_user_fines(&self, user_id: i32) -> AppResult<Vec<Fine>> {
        let mut fines: Vec<Fine> = self
            .lock()
            .fines
            .iter()
            .filter(|f| f.borrower_id == user_id)
            .cloned()
            .collect();
        fines.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(fines)
    }

    async fn commit_issue(&self, loan: NewLoan, fulfilled_reservation: Option<i32>) -> AppResult<Loan> {
        let mut state = self.lock();

        let state = &mut *state;

        let book = state
            .books
            .iter_mut()
            .find(|b| b.id == loan.book_id && !b.is_deleted && b.available_copies > 0)
            .ok_or(Conflict::NoCopiesAvailable)?;

        if state
            .loans
            .iter()
            .any(|l| l.book_id == loan.book_id && l.borrower_id == loan.borrower_id && l.is_active())
        {
            return Err(Conflict::AlreadyBorrowed.into());
        }

        book.available_copies -= 1;
        book.updated_at = loan.issue_date;

        let id = state.next_id();
        let created = Loan {
            id,
            book_id: loan.book_id,
            borrower_id: loan.borrower_id,
            issued_by: loan.issued_by,
            issue_date: loan.issue_date,
            due_date: loan.due_date,
            return_date: None,
            status: LoanStatus::Issued,
            renewal_count: 0,
            condition: None,
            notes: None,
            created_at: loan.issue_date,
            updated_at: loan.issue_date,
        };
        state.loans.push(created.clone());

        if let Some(reservation_id) = fulfilled_reservation {
            if let Some(reservation) = state
                .reservations
                .iter_mut()
                .find(|r| r.id == reservation_id && r.status == ReservationStatus::Waiting)
            {
                reservation.status = ReservationStatus::Fulfilled;
                reservation.updated_at = loan.issue_date;
            }
        }

        Ok(created)
    }

    async fn commit_return(&self, loan_return: LoanReturn, fine: Option<NewFine>) -> AppResult<(Loan, Option<Fine>)> {
        let mut state = self.lock();

        let loan = state
            .loans
            .iter_mut()
            .find(|l| l.id == loan_return.loan_id)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_return.loan_id)))?;
        if !loan.is_active() {
            return Err(Conflict::AlreadyReturned.into());
        }

        loan.status = LoanStatus::Returned;
        loan.return_date = Some(loan_return.return_date);
        if loan_return.condition.is_some() {
            loan.condition = loan_return.condition;
        }
        if loan_return.notes.is_some() {
            loan.notes = loan_return.notes;
        }
        loan.updated_at = loan_return.return_date;
        let returned = loan.clone();

        if let Some(book) = state.books.iter_mut().find(|b| b.id == loan_return.book_id) {
            book.available_copies = (book.available_copies + 1).min(book.total_copies);
            book.updated_at = loan_return.return_date;
        }

        let fine = fine.map(|fine| {
            let created = Fine {
                id: state.next_id(),
                borrower_id: fine.borrower_id,
                loan_id: fine.loan_id,
                amount: fine.amount,
                reason: fine.reason,
                status: FineStatus::Pending,
                paid_amount: Decimal::ZERO,
                paid_date: None,
                created_at: loan_return.return_date,
                updated_at: loan_return.return_date,
            };
            state.fines.push(created.clone());
            created
        });

        Ok((returned, fine))
    }

    async fn commit_renewal(&self, renewal: LoanRenewal) -> AppResult<Loan> {
        let mut state = self.lock();

        let loan = state
            .loans
            .iter_mut()
            .find(|l| l.id == renewal.loan_id)
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", renewal.loan_id)))?;
        if !loan.is_active() {
            return Err(Conflict::NotIssued.into());
        }
        if loan.renewal_count != renewal.previous_count {
            return Err(Conflict::ConcurrentModification.into());
        }

        loan.renewal_count += 1;
        loan.due_date = renewal.due_date;
        loan.updated_at = Utc::now();
        Ok(loan.clone())
    }

    async fn commit_fine_update(&self, fine: Fine, expected: FineStatus) -> AppResult<Fine> {
        let mut state = self.lock();

        let stored = state
            .fines
            .iter_mut()
            .find(|f| f.id == fine.id)
            .ok_or_else(|| AppError::NotFound(format!("Fine with id {} not found", fine.id)))?;
        if stored.status != expected {
            return Err(Conflict::ConcurrentModification.into());
        }

        *stored = fine;
        Ok(stored.clone())
    }
}
