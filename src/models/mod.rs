//! Data models for Bookshelf

pub mod book;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use book::{Book, Category, Genre};
pub use loan::{Loan, LoanDetails, Outcome, Refusal};
pub use user::{Principal, Role, User};
