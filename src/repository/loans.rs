//! Loans repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres};

use crate::{
    error::AppResult,
    models::loan::{Loan, NewLoan},
};

use super::map_unique_violation;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoanRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Loan>>;
    /// The open loan of a member for a book, if any
    async fn find_open(&self, user_id: i32, book_id: i32) -> AppResult<Option<Loan>>;
    /// Loans of a member with their book title, most recent borrow first
    async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<(Loan, String)>>;
    /// Insert a loan. A second open loan for the same member and book is a `Conflict`.
    async fn create(&self, loan: &NewLoan) -> AppResult<Loan>;
    /// Move the dates of an open loan and bump its renewal counter, provided it
    /// is still open and has been renewed exactly `expected_renew_count` times.
    async fn renew(
        &self,
        id: i32,
        expected_renew_count: i16,
        borrow_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<Option<Loan>>;
    /// Close an open loan. `None` if it was already closed.
    async fn mark_returned(&self, id: i32, return_date: DateTime<Utc>) -> AppResult<Option<Loan>>;
    /// Delete a closed loan. `false` if it is open or missing.
    async fn delete_closed(&self, id: i32) -> AppResult<bool>;
}

/// Row of the member loan listing
#[derive(Debug, FromRow)]
struct LoanWithTitleRow {
    #[sqlx(flatten)]
    loan: Loan,
    book_title: String,
}

#[derive(Clone)]
pub struct PgLoanRepository {
    pool: Pool<Postgres>,
}

impl PgLoanRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanRepository for PgLoanRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(loan)
    }

    async fn find_open(&self, user_id: i32, book_id: i32) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE user_id = $1 AND book_id = $2 AND return_date IS NULL",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(loan)
    }

    async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<(Loan, String)>> {
        let rows = sqlx::query_as::<_, LoanWithTitleRow>(
            r#"
            SELECT l.*, b.title AS book_title
            FROM loans l
            JOIN books b ON l.book_id = b.id
            WHERE l.user_id = $1
            ORDER BY l.borrow_date DESC, l.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| (r.loan, r.book_title)).collect())
    }

    async fn create(&self, loan: &NewLoan) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (user_id, book_id, borrow_date, due_date, renew_count)
            VALUES ($1, $2, $3, $4, 0)
            RETURNING *
            "#,
        )
        .bind(loan.user_id)
        .bind(loan.book_id)
        .bind(loan.borrow_date)
        .bind(loan.due_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "An open loan already exists for this book"))
    }

    async fn renew(
        &self,
        id: i32,
        expected_renew_count: i16,
        borrow_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET borrow_date = $3, due_date = $4, renew_count = renew_count + 1
            WHERE id = $1 AND renew_count = $2 AND return_date IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected_renew_count)
        .bind(borrow_date)
        .bind(due_date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(loan)
    }

    async fn mark_returned(&self, id: i32, return_date: DateTime<Utc>) -> AppResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(
            "UPDATE loans SET return_date = $2 WHERE id = $1 AND return_date IS NULL RETURNING *",
        )
        .bind(id)
        .bind(return_date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(loan)
    }

    async fn delete_closed(&self, id: i32) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM loans WHERE id = $1 AND return_date IS NOT NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
