//! In-process storage backend.
//!
//! Holds every collection behind one `RwLock` so that each conditional update
//! (availability adjustments, loan state transitions) happens under a single
//! write guard. Enforces the same uniqueness rules as the Postgres schema.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, Category, NewBook},
        loan::{Loan, NewLoan},
        user::{NewUser, User},
    },
};

use super::{books::BookRepository, loans::LoanRepository, users::UserRepository};

#[derive(Default)]
struct MemoryState {
    books: BTreeMap<i32, Book>,
    users: BTreeMap<i32, User>,
    loans: BTreeMap<i32, Loan>,
    next_book_id: i32,
    next_user_id: i32,
    next_loan_id: i32,
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookRepository for MemoryStore {
    async fn count(&self) -> AppResult<i64> {
        Ok(self.state.read().await.books.len() as i64)
    }

    async fn list(&self, category: Option<Category>) -> AppResult<Vec<Book>> {
        let state = self.state.read().await;
        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|b| category.map_or(true, |c| b.category == c))
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(books)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        Ok(self.state.read().await.books.get(&id).cloned())
    }

    async fn get_by_title(&self, title: &str) -> AppResult<Option<Book>> {
        let state = self.state.read().await;
        Ok(state.books.values().find(|b| b.title == title).cloned())
    }

    async fn create(&self, book: &NewBook) -> AppResult<Book> {
        let mut state = self.state.write().await;
        if state.books.values().any(|b| b.title == book.title) {
            return Err(AppError::Conflict(format!(
                "A book titled '{}' already exists",
                book.title
            )));
        }
        if book.available < 0 || book.available > book.copies {
            return Err(AppError::Validation(format!(
                "Available copies must be between 0 and {}",
                book.copies
            )));
        }

        let id = next_id(&mut state.next_book_id);
        let created = Book {
            id,
            title: book.title.clone(),
            authors: book.authors.clone(),
            category: book.category,
            genres: book.genres.clone(),
            copies: book.copies,
            available: book.available,
            description: book.description.clone(),
            pages: book.pages,
            url: book.url.clone(),
        };
        state.books.insert(id, created.clone());
        Ok(created)
    }

    async fn checkout(&self, id: i32) -> AppResult<Option<i32>> {
        let mut state = self.state.write().await;
        Ok(state.books.get_mut(&id).and_then(|book| {
            (book.available > 0).then(|| {
                book.available -= 1;
                book.available
            })
        }))
    }

    async fn return_copy(&self, id: i32) -> AppResult<Option<i32>> {
        let mut state = self.state.write().await;
        Ok(state.books.get_mut(&id).and_then(|book| {
            (book.available < book.copies).then(|| {
                book.available += 1;
                book.available
            })
        }))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_by_name(&self, name: &str) -> AppResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.name == name).cloned())
    }

    async fn create(&self, user: &NewUser) -> AppResult<User> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|u| u.name == user.name || u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::Conflict(
                "Registration failed. User may already exist.".to_string(),
            ));
        }

        let id = next_id(&mut state.next_user_id);
        let created = User {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role,
            created_at: Utc::now(),
        };
        state.users.insert(id, created.clone());
        Ok(created)
    }
}

#[async_trait]
impl LoanRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Loan>> {
        Ok(self.state.read().await.loans.get(&id).cloned())
    }

    async fn find_open(&self, user_id: i32, book_id: i32) -> AppResult<Option<Loan>> {
        let state = self.state.read().await;
        Ok(state
            .loans
            .values()
            .find(|l| l.user_id == user_id && l.book_id == book_id && l.is_open())
            .cloned())
    }

    async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<(Loan, String)>> {
        let state = self.state.read().await;
        let mut loans: Vec<(Loan, String)> = state
            .loans
            .values()
            .filter(|l| l.user_id == user_id)
            .map(|l| {
                let title = state
                    .books
                    .get(&l.book_id)
                    .map(|b| b.title.clone())
                    .unwrap_or_default();
                (l.clone(), title)
            })
            .collect();
        loans.sort_by(|(a, _), (b, _)| b.borrow_date.cmp(&a.borrow_date).then(b.id.cmp(&a.id)));
        Ok(loans)
    }

    async fn create(&self, loan: &NewLoan) -> AppResult<Loan> {
        let mut state = self.state.write().await;
        if !state.books.contains_key(&loan.book_id) || !state.users.contains_key(&loan.user_id) {
            return Err(AppError::NotFound("Loan references a missing book or user".to_string()));
        }
        if state
            .loans
            .values()
            .any(|l| l.user_id == loan.user_id && l.book_id == loan.book_id && l.is_open())
        {
            return Err(AppError::Conflict(
                "An open loan already exists for this book".to_string(),
            ));
        }

        let id = next_id(&mut state.next_loan_id);
        let created = Loan {
            id,
            user_id: loan.user_id,
            book_id: loan.book_id,
            borrow_date: loan.borrow_date,
            due_date: loan.due_date,
            return_date: None,
            renew_count: 0,
        };
        state.loans.insert(id, created.clone());
        Ok(created)
    }

    async fn renew(
        &self,
        id: i32,
        expected_renew_count: i16,
        borrow_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<Option<Loan>> {
        let mut state = self.state.write().await;
        Ok(state.loans.get_mut(&id).and_then(|loan| {
            (loan.is_open() && loan.renew_count == expected_renew_count).then(|| {
                loan.borrow_date = borrow_date;
                loan.due_date = due_date;
                loan.renew_count += 1;
                loan.clone()
            })
        }))
    }

    async fn mark_returned(&self, id: i32, return_date: DateTime<Utc>) -> AppResult<Option<Loan>> {
        let mut state = self.state.write().await;
        Ok(state.loans.get_mut(&id).and_then(|loan| {
            loan.is_open().then(|| {
                loan.return_date = Some(return_date);
                loan.clone()
            })
        }))
    }

    async fn delete_closed(&self, id: i32) -> AppResult<bool> {
        let mut state = self.state.write().await;
        match state.loans.get(&id) {
            Some(loan) if !loan.is_open() => {
                state.loans.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
