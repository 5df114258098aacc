//! Loan (transaction) model and lifecycle rules

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::enums::LoanStatus;

/// Loan model from database, one row per issue event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub book_id: i32,
    pub borrower_id: i32,
    /// Staff member who issued the book
    pub issued_by: i32,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub renewal_count: i32,
    pub condition: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Issued
    }

    /// A loan is overdue while still issued past its due date
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.due_date < now
    }
}

/// Loan as exposed by the API, with the derived overdue flag
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoanView {
    #[serde(flatten)]
    pub loan: Loan,
    pub is_overdue: bool,
}

impl LoanView {
    pub fn new(loan: Loan, now: DateTime<Utc>) -> Self {
        let is_overdue = loan.is_overdue(now);
        Self { loan, is_overdue }
    }
}

/// Issue request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IssueLoan {
    pub book_id: i32,
    pub borrower_id: i32,
    /// Defaults to the configured loan period from now
    pub due_date: Option<DateTime<Utc>>,
}

/// Return request
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ReturnLoan {
    pub condition: Option<String>,
    pub notes: Option<String>,
}

/// Loan insert produced by the issue operation
#[derive(Debug, Clone, PartialEq)]
pub struct NewLoan {
    pub book_id: i32,
    pub borrower_id: i32,
    pub issued_by: i32,
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// Return of an issued loan
#[derive(Debug, Clone, PartialEq)]
pub struct LoanReturn {
    pub loan_id: i32,
    pub book_id: i32,
    pub return_date: DateTime<Utc>,
    pub condition: Option<String>,
    pub notes: Option<String>,
}

/// Renewal of an issued loan, guarded by the renewal count it was computed from
#[derive(Debug, Clone, PartialEq)]
pub struct LoanRenewal {
    pub loan_id: i32,
    pub previous_count: i32,
    pub due_date: DateTime<Utc>,
}

/// Loan listing query parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct LoanQuery {
    pub status: Option<LoanStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Whole days a return is late, counting any started day.
///
/// `None` for returns at or before the due date.
pub fn days_overdue(due_date: DateTime<Utc>, return_date: DateTime<Utc>) -> Option<i64> {
    if return_date <= due_date {
        return None;
    }
    let late = return_date - due_date;
    let whole_days = late.num_days();
    if late > Duration::days(whole_days) {
        Some(whole_days + 1)
    } else {
        Some(whole_days)
    }
}
