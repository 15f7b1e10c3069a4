//! Catalog management service

use std::path::Path;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, NewBook, SeedBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn book_count(&self) -> AppResult<i64> {
        self.repository.books.count().await
    }

    /// List books by title, optionally restricted to a category
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let category = query.category_filter()?;
        self.repository.books.list(category).await
    }

    /// Get a book by its title
    pub async fn get_book_by_title(&self, title: &str) -> AppResult<Book> {
        self.repository
            .books
            .get_by_title(title)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No book titled '{}'", title)))
    }

    /// Add a book to the catalog, with every copy available
    pub async fn add_book(&self, request: CreateBook) -> AppResult<Book> {
        let request = request.normalized();
        request.validate()?;
        let book = request.into_new_book()?;

        if self.repository.books.get_by_title(&book.title).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "A book titled '{}' already exists",
                book.title
            )));
        }

        let created = self.repository.books.create(&book).await?;
        tracing::info!("Added '{}' to the catalog ({} copies)", created.title, created.copies);
        Ok(created)
    }

    /// Load the static catalog from a JSON file
    pub async fn load_seed_file(path: impl AsRef<Path>) -> AppResult<Vec<SeedBook>> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::Internal(format!("Cannot read seed file {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            AppError::Internal(format!("Invalid seed file {}: {}", path.display(), e))
        })
    }

    /// Insert the static catalog, once.
    ///
    /// Does nothing unless the catalog is empty; entries whose title is already
    /// present are skipped. Returns the number of books inserted.
    pub async fn seed(&self, entries: Vec<SeedBook>) -> AppResult<usize> {
        if self.repository.books.count().await? > 0 {
            tracing::debug!("Catalog already populated, skipping seed");
            return Ok(0);
        }

        let mut inserted = 0;
        for entry in entries {
            if self.repository.books.get_by_title(&entry.title).await?.is_some() {
                tracing::debug!("Seed entry '{}' already present", entry.title);
                continue;
            }
            if entry.available > entry.copies {
                tracing::warn!(
                    "Seed entry '{}' lists {} available of {} copies, clamping",
                    entry.title,
                    entry.available,
                    entry.copies
                );
            }
            let book = match NewBook::try_from(entry) {
                Ok(book) => book,
                Err(e) => {
                    tracing::warn!("Skipping seed entry: {}", e);
                    continue;
                }
            };
            self.repository.books.create(&book).await?;
            inserted += 1;
        }

        tracing::info!("Seeded catalog with {} books", inserted);
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::book::{AuthorInput, Category, Genre};

    fn seed_entry(title: &str, category: Category) -> SeedBook {
        SeedBook {
            title: title.to_string(),
            authors: vec!["Someone".to_string()],
            category: category.to_string(),
            genres: vec![Genre::Fiction],
            copies: 2,
            available: 2,
            url: String::new(),
            description: vec![],
            pages: 100,
        }
    }

    #[tokio::test]
    async fn seed_runs_once_and_skips_duplicate_titles() {
        let catalog = CatalogService::new(Repository::in_memory());
        let entries = vec![
            seed_entry("Dune", Category::Adult),
            seed_entry("Matilda", Category::Children),
            seed_entry("Dune", Category::Adult),
        ];

        assert_eq!(catalog.seed(entries.clone()).await.unwrap(), 2);
        assert_eq!(catalog.seed(entries).await.unwrap(), 0);

        let books = catalog.list_books(&BookQuery::default()).await.unwrap();
        assert_eq!(books.len(), 2);
    }

    #[tokio::test]
    async fn seed_is_skipped_for_non_empty_catalog() {
        let catalog = CatalogService::new(Repository::in_memory());
        catalog
            .seed(vec![seed_entry("Dune", Category::Adult)])
            .await
            .unwrap();

        let inserted = catalog
            .seed(vec![seed_entry("Emma", Category::Adult)])
            .await
            .unwrap();
        assert_eq!(inserted, 0);
        assert!(catalog.get_book_by_title("Emma").await.is_err());
    }

    #[tokio::test]
    async fn list_filters_by_category_and_sorts_by_title() {
        let catalog = CatalogService::new(Repository::in_memory());
        catalog
            .seed(vec![
                seed_entry("Wonder", Category::Children),
                seed_entry("Dune", Category::Adult),
                seed_entry("Matilda", Category::Children),
            ])
            .await
            .unwrap();

        let all = catalog.list_books(&BookQuery::default()).await.unwrap();
        let titles: Vec<_> = all.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Dune", "Matilda", "Wonder"]);

        let query = BookQuery { category: Some("Children".to_string()) };
        let children = catalog.list_books(&query).await.unwrap();
        let titles: Vec<_> = children.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Matilda", "Wonder"]);
    }

    #[tokio::test]
    async fn add_book_rejects_duplicate_titles() {
        let catalog = CatalogService::new(Repository::in_memory());
        let request = || CreateBook {
            title: "Dune".to_string(),
            authors: vec![AuthorInput { name: "Frank Herbert".to_string(), illustrator: false }],
            category: Category::Adult,
            genres: vec![Genre::Fiction],
            url: "https://example.org/dune".to_string(),
            description: "Desert planet.".to_string(),
            pages: 412,
            copies: 3,
        };

        let book = catalog.add_book(request()).await.unwrap();
        assert_eq!(book.available, 3);
        assert_eq!(catalog.get_book_by_title("Dune").await.unwrap().id, book.id);

        let again = catalog.add_book(request()).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn seed_skips_entries_without_a_known_category() {
        let catalog = CatalogService::new(Repository::in_memory());
        let mut nameless = seed_entry("Nameless", Category::Adult);
        nameless.category = String::new();
        let mut odd = seed_entry("Odd", Category::Adult);
        odd.category = "Poetry".to_string();

        let inserted = catalog
            .seed(vec![nameless, seed_entry("Dune", Category::Adult), odd])
            .await
            .unwrap();
        assert_eq!(inserted, 1);
        assert!(catalog.get_book_by_title("Nameless").await.is_err());
        assert!(catalog.get_book_by_title("Dune").await.is_ok());
    }

    #[tokio::test]
    async fn add_book_rejects_blank_required_fields() {
        let catalog = CatalogService::new(Repository::in_memory());
        let request = || CreateBook {
            title: "Dune".to_string(),
            authors: vec![AuthorInput { name: "Frank Herbert".to_string(), illustrator: false }],
            category: Category::Adult,
            genres: vec![Genre::Fiction],
            url: "https://example.org/dune".to_string(),
            description: "Desert planet.".to_string(),
            pages: 412,
            copies: 3,
        };

        let blank_title = CreateBook { title: "   ".to_string(), ..request() };
        assert!(matches!(catalog.add_book(blank_title).await, Err(AppError::Validation(_))));

        let blank_description = CreateBook { description: "  \n\n  ".to_string(), ..request() };
        assert!(matches!(
            catalog.add_book(blank_description).await,
            Err(AppError::Validation(_))
        ));

        assert_eq!(catalog.book_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn seed_file_in_repository_parses() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/books.json");
        let entries = CatalogService::load_seed_file(path).await.unwrap();
        assert!(!entries.is_empty());
        assert!(entries.iter().all(|e| e.available <= e.copies));
        assert!(entries.into_iter().all(|e| NewBook::try_from(e).is_ok()));
    }
}
