//! Loan eligibility rules
//!
//! Pure predicates over a [`Loan`] and the current time. The loan service and the
//! API layer both consult these, so a button hidden in the UI and a refusal from
//! the service always agree.

use chrono::{DateTime, Duration, Utc};

use crate::models::loan::Loan;

/// Length of a loan, in days
pub const LOAN_PERIOD_DAYS: i64 = 14;

/// Maximum number of renewals per loan
pub const MAX_RENEWALS: i16 = 2;

/// Due date for a loan borrowed at `borrow_date`
pub fn due_date_for(borrow_date: DateTime<Utc>) -> DateTime<Utc> {
    borrow_date + Duration::days(LOAN_PERIOD_DAYS)
}

/// An open loan whose due date has passed
pub fn is_overdue(loan: &Loan, now: DateTime<Utc>) -> bool {
    now > loan.due_date && loan.return_date.is_none()
}

pub fn can_renew(loan: &Loan, now: DateTime<Utc>) -> bool {
    loan.renew_count < MAX_RENEWALS && !is_overdue(loan, now) && loan.return_date.is_none()
}

pub fn can_return(loan: &Loan) -> bool {
    loan.return_date.is_none()
}
