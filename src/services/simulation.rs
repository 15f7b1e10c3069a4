//! Loan date sources
//!
//! Live loans are dated at the moment of the request. Demo catalogs can instead
//! simulate a borrowing history: borrow dates are pushed 10 to 20 days into the
//! past and later events move forward by the same random step, never past now.

use std::ops::RangeInclusive;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::{config::LoansConfig, models::loan::Loan};

/// Random step, in days, used by simulated history
pub const SIMULATED_STEP_DAYS: RangeInclusive<i64> = 10..=20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanDates {
    Live,
    SimulatedHistory,
}

impl LoanDates {
    pub fn from_config(config: &LoansConfig) -> Self {
        if config.simulate_history {
            LoanDates::SimulatedHistory
        } else {
            LoanDates::Live
        }
    }

    /// Borrow date of a new loan
    pub fn borrow_date<R: Rng + ?Sized>(&self, now: DateTime<Utc>, rng: &mut R) -> DateTime<Utc> {
        match self {
            LoanDates::Live => now,
            LoanDates::SimulatedHistory => now - random_step(rng),
        }
    }

    /// Borrow date a loan restarts from when renewed
    pub fn renewed_borrow_date<R: Rng + ?Sized>(
        &self,
        loan: &Loan,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> DateTime<Utc> {
        self.advance(loan.borrow_date, now, rng)
    }

    /// Date a loan is closed on
    pub fn return_date<R: Rng + ?Sized>(
        &self,
        loan: &Loan,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> DateTime<Utc> {
        self.advance(loan.borrow_date, now, rng)
    }

    fn advance<R: Rng + ?Sized>(
        &self,
        from: DateTime<Utc>,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> DateTime<Utc> {
        match self {
            LoanDates::Live => now,
            LoanDates::SimulatedHistory => (from + random_step(rng)).min(now),
        }
    }
}

fn random_step<R: Rng + ?Sized>(rng: &mut R) -> Duration {
    Duration::days(rng.gen_range(SIMULATED_STEP_DAYS))
}
