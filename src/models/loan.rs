//! Loan (borrow) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::policy;

/// Loan model from database.
///
/// A loan is open while `return_date` is `None` and closed once it is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub renew_count: i16,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }
}

/// Loan to insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoan {
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// Loan joined with its book, for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    pub id: i32,
    pub book_id: i32,
    pub book_title: String,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub renew_count: i16,
    pub is_overdue: bool,
    pub can_renew: bool,
    pub can_return: bool,
}

impl LoanDetails {
    pub fn new(loan: Loan, book_title: String, now: DateTime<Utc>) -> Self {
        Self {
            is_overdue: policy::is_overdue(&loan, now),
            can_renew: policy::can_renew(&loan, now),
            can_return: policy::can_return(&loan),
            id: loan.id,
            book_id: loan.book_id,
            book_title,
            borrow_date: loan.borrow_date,
            due_date: loan.due_date,
            return_date: loan.return_date,
            renew_count: loan.renew_count,
        }
    }
}

/// Reason a loan operation was not performed.
///
/// These are normal outcomes of the loan lifecycle, reported to the caller
/// rather than raised as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Refusal {
    /// The member already has an open loan for this book
    DuplicateOpenLoan,
    /// No copy of the book is currently available
    NoCopiesAvailable,
    /// The loan has been renewed the maximum number of times
    RenewalLimitReached,
    /// The loan is past its due date
    Overdue,
    /// The loan is already closed
    AlreadyReturned,
    /// The loan must be returned before it can be deleted
    StillOpen,
}

impl std::fmt::Display for Refusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Refusal::DuplicateOpenLoan => "You already have this book checked out",
            Refusal::NoCopiesAvailable => "No copies of this book are available",
            Refusal::RenewalLimitReached => "This loan cannot be renewed again",
            Refusal::Overdue => "Overdue loans cannot be renewed",
            Refusal::AlreadyReturned => "This loan has already been returned",
            Refusal::StillOpen => "Return the book before deleting the loan",
        };
        write!(f, "{}", message)
    }
}

/// Result of a loan lifecycle operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    Refused(Refusal),
}

impl<T> Outcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn refusal(&self) -> Option<Refusal> {
        match self {
            Outcome::Completed(_) => None,
            Outcome::Refused(refusal) => Some(*refusal),
        }
    }

    /// Convert into a `Result`, turning a refusal into [`AppError::Refused`](crate::error::AppError::Refused)
    pub fn into_result(self) -> crate::error::AppResult<T> {
        match self {
            Outcome::Completed(value) => Ok(value),
            Outcome::Refused(refusal) => Err(crate::error::AppError::Refused(refusal)),
        }
    }
}
