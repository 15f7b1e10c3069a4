//! Loan management service
//!
//! Drives the loan lifecycle: a loan is created open, may be renewed while open
//! and not overdue, is closed by a return and may be deleted once closed.
//! Operations that are not allowed in the loan's current state come back as
//! [`Outcome::Refused`]; only missing records and storage failures are errors.

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::loan::{Loan, LoanDetails, NewLoan, Outcome, Refusal},
    policy,
    repository::Repository,
};

use super::{ledger::LedgerService, simulation::LoanDates};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    ledger: LedgerService,
    dates: LoanDates,
}

/// Why a loan cannot be renewed right now, if it cannot
fn renew_refusal(loan: &Loan, now: DateTime<Utc>) -> Option<Refusal> {
    if !policy::can_return(loan) {
        Some(Refusal::AlreadyReturned)
    } else if loan.renew_count >= policy::MAX_RENEWALS {
        Some(Refusal::RenewalLimitReached)
    } else if policy::is_overdue(loan, now) {
        Some(Refusal::Overdue)
    } else {
        None
    }
}

impl LoansService {
    pub fn new(repository: Repository, ledger: LedgerService, dates: LoanDates) -> Self {
        Self {
            repository,
            ledger,
            dates,
        }
    }

    /// Get a loan by ID
    pub async fn get_loan(&self, loan_id: i32) -> AppResult<Loan> {
        self.repository
            .loans
            .get_by_id(loan_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
    }

    /// Loans of a member, most recently borrowed first
    pub async fn list_loans_for_member(&self, member_id: i32) -> AppResult<Vec<LoanDetails>> {
        let now = Utc::now();
        let loans = self.repository.loans.list_for_user(member_id).await?;
        Ok(loans
            .into_iter()
            .map(|(loan, title)| LoanDetails::new(loan, title, now))
            .collect())
    }

    /// Check out a copy of a book for a member
    pub async fn create_loan(&self, member_id: i32, book_id: i32) -> AppResult<Outcome<Loan>> {
        // Verify user exists
        self.repository
            .users
            .get_by_id(member_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", member_id)))?;

        let mut book = self
            .repository
            .books
            .get_by_id(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        if self.repository.loans.find_open(member_id, book_id).await?.is_some() {
            tracing::info!("User {} already has '{}' checked out", member_id, book.title);
            return Ok(Outcome::Refused(Refusal::DuplicateOpenLoan));
        }

        if book.available == 0 || !self.ledger.checkout(&mut book).await? {
            tracing::info!("No copy of '{}' available for user {}", book.title, member_id);
            return Ok(Outcome::Refused(Refusal::NoCopiesAvailable));
        }

        let borrow_date = self.dates.borrow_date(Utc::now(), &mut rand::thread_rng());
        let new_loan = NewLoan {
            user_id: member_id,
            book_id,
            borrow_date,
            due_date: policy::due_date_for(borrow_date),
        };

        match self.repository.loans.create(&new_loan).await {
            Ok(loan) => {
                tracing::info!(
                    "Loan {} created: user {} borrowed '{}', due {}",
                    loan.id,
                    member_id,
                    book.title,
                    loan.due_date
                );
                Ok(Outcome::Completed(loan))
            }
            Err(AppError::Conflict(_)) => {
                // Lost a race against another checkout of the same book by this member
                self.ledger.return_copy(&mut book).await?;
                Ok(Outcome::Refused(Refusal::DuplicateOpenLoan))
            }
            Err(e) => {
                if let Err(release) = self.ledger.return_copy(&mut book).await {
                    tracing::error!(
                        "Failed to release reserved copy of '{}' after loan insert error: {}",
                        book.title,
                        release
                    );
                }
                Err(e)
            }
        }
    }

    /// Renew an open loan
    pub async fn renew_loan(&self, loan: &Loan) -> AppResult<Outcome<Loan>> {
        let now = Utc::now();
        if let Some(refusal) = renew_refusal(loan, now) {
            return Ok(Outcome::Refused(refusal));
        }

        let borrow_date = self
            .dates
            .renewed_borrow_date(loan, now, &mut rand::thread_rng());

        let renewed = self
            .repository
            .loans
            .renew(loan.id, loan.renew_count, borrow_date, policy::due_date_for(borrow_date))
            .await?;

        match renewed {
            Some(renewed) => {
                tracing::info!(
                    "Loan {} renewed ({}/{}), now due {}",
                    renewed.id,
                    renewed.renew_count,
                    policy::MAX_RENEWALS,
                    renewed.due_date
                );
                Ok(Outcome::Completed(renewed))
            }
            None => {
                // The stored loan changed since it was read
                let current = self.get_loan(loan.id).await?;
                match renew_refusal(&current, now) {
                    Some(refusal) => Ok(Outcome::Refused(refusal)),
                    None => Err(AppError::Conflict(format!(
                        "Loan {} was modified concurrently, please retry",
                        loan.id
                    ))),
                }
            }
        }
    }

    /// Return an open loan and put the copy back on the shelf
    pub async fn return_loan(&self, loan: &Loan) -> AppResult<Outcome<Loan>> {
        if !policy::can_return(loan) {
            return Ok(Outcome::Refused(Refusal::AlreadyReturned));
        }

        let return_date = self
            .dates
            .return_date(loan, Utc::now(), &mut rand::thread_rng());

        let Some(closed) = self.repository.loans.mark_returned(loan.id, return_date).await? else {
            return Ok(Outcome::Refused(Refusal::AlreadyReturned));
        };

        let mut book = self
            .repository
            .books
            .get_by_id(closed.book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", closed.book_id)))?;
        self.ledger.return_copy(&mut book).await?;

        tracing::info!("Loan {} returned: '{}' back on the shelf", closed.id, book.title);
        Ok(Outcome::Completed(closed))
    }

    /// Permanently delete a closed loan
    pub async fn delete_loan(&self, loan: &Loan) -> AppResult<Outcome<()>> {
        if loan.is_open() {
            return Ok(Outcome::Refused(Refusal::StillOpen));
        }

        if !self.repository.loans.delete_closed(loan.id).await? {
            return Err(AppError::NotFound(format!("Loan with id {} not found", loan.id)));
        }

        tracing::info!("Loan {} deleted", loan.id);
        Ok(Outcome::Completed(()))
    }
}
