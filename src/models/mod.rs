//! Data models for Libris

pub mod book;
pub mod enums;
pub mod fine;
pub mod loan;
pub mod reservation;
pub mod user;

// Re-export commonly used types
pub use book::Book;
pub use enums::{FineStatus, LoanStatus, MembershipStatus, ReservationStatus, Role};
pub use fine::{Fine, NewFine};
pub use loan::{Loan, LoanView, NewLoan};
pub use reservation::Reservation;
pub use user::{User, UserClaims, UserShort};
