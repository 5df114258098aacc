//! Fine model and payment rules

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::{enums::FineStatus, loan::days_overdue};
use crate::error::{AppError, AppResult, Conflict};

/// Fine model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Fine {
    pub id: i32,
    pub borrower_id: i32,
    pub loan_id: i32,
    pub amount: Decimal,
    pub reason: String,
    pub status: FineStatus,
    pub paid_amount: Decimal,
    pub paid_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Fine {
    /// Settle the fine, fully or with a smaller negotiated amount.
    ///
    /// Returns the fine as it must be stored; the caller persists it
    /// conditionally on the status observed here.
    pub fn pay(&self, amount: Option<Decimal>, now: DateTime<Utc>) -> AppResult<Fine> {
        match self.status {
            FineStatus::Paid => return Err(Conflict::AlreadyPaid.into()),
            FineStatus::Waived => return Err(Conflict::FineWaived.into()),
            FineStatus::Pending => {}
        }

        let amount = amount.unwrap_or(self.amount);
        if amount <= Decimal::ZERO {
            return Err(AppError::Validation("Payment amount must be positive".to_string()));
        }
        if amount > self.amount {
            return Err(Conflict::AmountExceedsFine.into());
        }

        Ok(Fine {
            status: FineStatus::Paid,
            paid_amount: amount,
            paid_date: Some(now),
            updated_at: now,
            ..self.clone()
        })
    }

    /// Waive the fine whatever its current status
    pub fn waive(&self, now: DateTime<Utc>) -> Fine {
        Fine {
            status: FineStatus::Waived,
            updated_at: now,
            ..self.clone()
        }
    }
}

/// Fine insert produced by a late return
#[derive(Debug, Clone, PartialEq)]
pub struct NewFine {
    pub borrower_id: i32,
    pub loan_id: i32,
    pub amount: Decimal,
    pub reason: String,
}

impl NewFine {
    /// Fine owed for a return, `None` when the book came back in time
    pub fn for_late_return(
        loan_id: i32,
        borrower_id: i32,
        due_date: DateTime<Utc>,
        return_date: DateTime<Utc>,
        daily_fine: Decimal,
    ) -> Option<NewFine> {
        let days = days_overdue(due_date, return_date)?;
        Some(NewFine {
            borrower_id,
            loan_id,
            amount: daily_fine * Decimal::from(days),
            reason: format!("Overdue by {} day(s)", days),
        })
    }
}

/// Payment request; the full amount is paid when `amount` is omitted
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PayFine {
    pub amount: Option<Decimal>,
}

/// Fine listing query parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
pub struct FineQuery {
    pub status: Option<FineStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Fines of one user with the outstanding total
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserFines {
    pub total_pending: Decimal,
    pub fines: Vec<Fine>,
}

impl UserFines {
    pub fn new(fines: Vec<Fine>) -> Self {
        let total_pending = fines
            .iter()
            .filter(|f| f.status == FineStatus::Pending)
            .map(|f| f.amount)
            .sum();
        Self { total_pending, fines }
    }
}
