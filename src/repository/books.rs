//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::book::{Book, BookRow, Category, NewBook},
};

use super::map_unique_violation;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Number of books in the catalog
    async fn count(&self) -> AppResult<i64>;
    /// Books ordered by title, optionally restricted to one category
    async fn list(&self, category: Option<Category>) -> AppResult<Vec<Book>>;
    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>>;
    async fn get_by_title(&self, title: &str) -> AppResult<Option<Book>>;
    /// Insert a book. A duplicate title is a `Conflict`.
    async fn create(&self, book: &NewBook) -> AppResult<Book>;
    /// Take one copy off the shelf if any is available.
    /// Returns the new available count, or `None` when nothing was available.
    async fn checkout(&self, id: i32) -> AppResult<Option<i32>>;
    /// Put one copy back unless every copy is already on the shelf.
    /// Returns the new available count, or `None` when the book was full.
    async fn return_copy(&self, id: i32) -> AppResult<Option<i32>>;
}

#[derive(Clone)]
pub struct PgBookRepository {
    pool: Pool<Postgres>,
}

impl PgBookRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn genre_names(book: &NewBook) -> Vec<String> {
    book.genres.iter().map(|g| g.as_str().to_string()).collect()
}

#[async_trait]
impl BookRepository for PgBookRepository {
    async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list(&self, category: Option<Category>) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(
            r#"
            SELECT * FROM books
            WHERE ($1::text IS NULL OR category = $1)
            ORDER BY title
            "#,
        )
        .bind(category.map(|c| c.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Book::try_from).collect()
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        sqlx::query_as::<_, BookRow>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Book::try_from)
            .transpose()
    }

    async fn get_by_title(&self, title: &str) -> AppResult<Option<Book>> {
        sqlx::query_as::<_, BookRow>("SELECT * FROM books WHERE title = $1")
            .bind(title)
            .fetch_optional(&self.pool)
            .await?
            .map(Book::try_from)
            .transpose()
    }

    async fn create(&self, book: &NewBook) -> AppResult<Book> {
        let row = sqlx::query_as::<_, BookRow>(
            r#"
            INSERT INTO books (title, authors, category, genres, copies, available,
                               description, pages, url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.authors)
        .bind(book.category)
        .bind(genre_names(book))
        .bind(book.copies)
        .bind(book.available)
        .bind(&book.description)
        .bind(book.pages)
        .bind(&book.url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, format!("A book titled '{}' already exists", book.title)))?;

        Book::try_from(row)
    }

    async fn checkout(&self, id: i32) -> AppResult<Option<i32>> {
        let available = sqlx::query_scalar::<_, i32>(
            "UPDATE books SET available = available - 1 WHERE id = $1 AND available > 0 RETURNING available",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(available)
    }

    async fn return_copy(&self, id: i32) -> AppResult<Option<i32>> {
        let available = sqlx::query_scalar::<_, i32>(
            "UPDATE books SET available = available + 1 WHERE id = $1 AND available < copies RETURNING available",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(available)
    }
}
