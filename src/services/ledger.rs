//! Book availability ledger
//!
//! The only writer of `Book::available`. Both operations are single
//! conditional updates in the store, so concurrent callers cannot push the
//! counter outside `0..=copies`.

use crate::{error::AppResult, models::book::Book, repository::Repository};

#[derive(Clone)]
pub struct LedgerService {
    repository: Repository,
}

impl LedgerService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Take one copy of `book` off the shelf.
    ///
    /// Returns `false` without writing anything when no copy is available.
    /// On success `book.available` reflects the stored count.
    pub async fn checkout(&self, book: &mut Book) -> AppResult<bool> {
        match self.repository.books.checkout(book.id).await? {
            Some(available) => {
                tracing::debug!("Checked out a copy of '{}' ({} left)", book.title, available);
                book.available = available;
                Ok(true)
            }
            None => {
                tracing::debug!("No copy of '{}' left to check out", book.title);
                Ok(false)
            }
        }
    }

    /// Put one copy of `book` back on the shelf.
    ///
    /// Returns `false` when every copy is already on the shelf.
    pub async fn return_copy(&self, book: &mut Book) -> AppResult<bool> {
        match self.repository.books.return_copy(book.id).await? {
            Some(available) => {
                book.available = available;
                Ok(true)
            }
            None => {
                tracing::warn!(
                    "Refusing to return a copy of '{}': all {} copies are already available",
                    book.title,
                    book.copies
                );
                Ok(false)
            }
        }
    }
}
