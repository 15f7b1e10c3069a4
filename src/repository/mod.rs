//! Repository layer for database operations

pub mod books;
pub mod loans;
pub mod memory;
pub mod users;

use std::sync::Arc;

use sqlx::{Pool, Postgres};

use crate::error::AppError;

pub use books::BookRepository;
pub use loans::LoanRepository;
pub use users::UserRepository;

/// Main repository struct holding one store per collection
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookRepository>,
    pub users: Arc<dyn UserRepository>,
    pub loans: Arc<dyn LoanRepository>,
}

impl Repository {
    /// Create a Postgres-backed repository with the given database pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::PgBookRepository::new(pool.clone())),
            users: Arc::new(users::PgUserRepository::new(pool.clone())),
            loans: Arc::new(loans::PgLoanRepository::new(pool)),
        }
    }

    /// Create a repository backed by a fresh in-process store
    pub fn in_memory() -> Self {
        let store = memory::MemoryStore::new();
        Self {
            books: Arc::new(store.clone()),
            users: Arc::new(store.clone()),
            loans: Arc::new(store),
        }
    }

    pub fn from_parts(
        books: Arc<dyn BookRepository>,
        users: Arc<dyn UserRepository>,
        loans: Arc<dyn LoanRepository>,
    ) -> Self {
        Self { books, users, loans }
    }
}

/// Turn a unique-constraint violation into a `Conflict`, leaving other errors as is
pub(crate) fn map_unique_violation(err: sqlx::Error, message: impl Into<String>) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Conflict(message.into()),
        _ => AppError::Database(err),
    }
}
