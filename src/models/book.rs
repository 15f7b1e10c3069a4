//! Book (catalog entry) model and related types

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::AppError;

/// Audience category of a book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Category {
    Children,
    Teens,
    Adult,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Children, Category::Teens, Category::Adult];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Children => "Children",
            Category::Teens => "Teens",
            Category::Adult => "Adult",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Invalid category: {}", s))
    }
}

// SQLx conversion for Category
impl sqlx::Type<Postgres> for Category {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for Category {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Category {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Genre vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Genre {
    Animals,
    Business,
    Comics,
    Communication,
    #[serde(rename = "Dark Academia")]
    DarkAcademia,
    Emotion,
    Fantasy,
    Fiction,
    Friendship,
    #[serde(rename = "Graphic Novels")]
    GraphicNovels,
    Grief,
    #[serde(rename = "Historical Fiction")]
    HistoricalFiction,
    Indigenous,
    Inspirational,
    Magic,
    #[serde(rename = "Mental Health")]
    MentalHealth,
    Nonfiction,
    #[serde(rename = "Personal Development")]
    PersonalDevelopment,
    Philosophy,
    #[serde(rename = "Picture Books")]
    PictureBooks,
    Poetry,
    Productivity,
    Psychology,
    Romance,
    School,
    #[serde(rename = "Self Help")]
    SelfHelp,
}

impl Genre {
    pub const ALL: [Genre; 26] = [
        Genre::Animals,
        Genre::Business,
        Genre::Comics,
        Genre::Communication,
        Genre::DarkAcademia,
        Genre::Emotion,
        Genre::Fantasy,
        Genre::Fiction,
        Genre::Friendship,
        Genre::GraphicNovels,
        Genre::Grief,
        Genre::HistoricalFiction,
        Genre::Indigenous,
        Genre::Inspirational,
        Genre::Magic,
        Genre::MentalHealth,
        Genre::Nonfiction,
        Genre::PersonalDevelopment,
        Genre::Philosophy,
        Genre::PictureBooks,
        Genre::Poetry,
        Genre::Productivity,
        Genre::Psychology,
        Genre::Romance,
        Genre::School,
        Genre::SelfHelp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Animals => "Animals",
            Genre::Business => "Business",
            Genre::Comics => "Comics",
            Genre::Communication => "Communication",
            Genre::DarkAcademia => "Dark Academia",
            Genre::Emotion => "Emotion",
            Genre::Fantasy => "Fantasy",
            Genre::Fiction => "Fiction",
            Genre::Friendship => "Friendship",
            Genre::GraphicNovels => "Graphic Novels",
            Genre::Grief => "Grief",
            Genre::HistoricalFiction => "Historical Fiction",
            Genre::Indigenous => "Indigenous",
            Genre::Inspirational => "Inspirational",
            Genre::Magic => "Magic",
            Genre::MentalHealth => "Mental Health",
            Genre::Nonfiction => "Nonfiction",
            Genre::PersonalDevelopment => "Personal Development",
            Genre::Philosophy => "Philosophy",
            Genre::PictureBooks => "Picture Books",
            Genre::Poetry => "Poetry",
            Genre::Productivity => "Productivity",
            Genre::Psychology => "Psychology",
            Genre::Romance => "Romance",
            Genre::School => "School",
            Genre::SelfHelp => "Self Help",
        }
    }
}

impl std::fmt::Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Genre::ALL
            .into_iter()
            .find(|g| g.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Invalid genre: {}", s))
    }
}

/// Deduplicate genres, keeping first-appearance order
pub fn unique_genres(genres: impl IntoIterator<Item = Genre>) -> Vec<Genre> {
    let mut out: Vec<Genre> = Vec::new();
    for genre in genres {
        if !out.contains(&genre) {
            out.push(genre);
        }
    }
    out
}

/// Internal row structure for database queries (genres stored as text)
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    id: i32,
    title: String,
    authors: Vec<String>,
    category: Category,
    genres: Vec<String>,
    copies: i32,
    available: i32,
    description: Vec<String>,
    pages: Option<i32>,
    url: String,
}

impl TryFrom<BookRow> for Book {
    type Error = AppError;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        let genres = row
            .genres
            .iter()
            .map(|g| g.parse::<Genre>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Book {}: {}", row.id, e)))?;

        Ok(Book {
            id: row.id,
            title: row.title,
            authors: row.authors,
            category: row.category,
            genres,
            copies: row.copies,
            available: row.available,
            description: row.description,
            pages: row.pages,
            url: row.url,
        })
    }
}

/// Full book model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub authors: Vec<String>,
    pub category: Category,
    pub genres: Vec<Genre>,
    /// Copies owned by the library
    pub copies: i32,
    /// Copies currently on the shelf (`0 <= available <= copies`)
    pub available: i32,
    /// Description paragraphs
    pub description: Vec<String>,
    pub pages: Option<i32>,
    pub url: String,
}

/// Book to insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub authors: Vec<String>,
    pub category: Category,
    pub genres: Vec<Genre>,
    pub copies: i32,
    pub available: i32,
    pub description: Vec<String>,
    pub pages: Option<i32>,
    pub url: String,
}

/// Book list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Children, Teens or Adult (case-insensitive), or "All" (default).
    /// Unknown names are rejected.
    pub category: Option<String>,
}

impl BookQuery {
    /// Category to filter on; `None` means every category
    pub fn category_filter(&self) -> Result<Option<Category>, AppError> {
        match self.category.as_deref() {
            None | Some("") => Ok(None),
            Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
            Some(s) => s.parse().map(Some).map_err(AppError::Validation),
        }
    }
}

/// Author line of an add-book request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthorInput {
    pub name: String,
    #[serde(default)]
    pub illustrator: bool,
}

impl AuthorInput {
    pub fn display_name(&self) -> String {
        let name = self.name.trim();
        if self.illustrator {
            format!("{} (Illustrator)", name)
        } else {
            name.to_string()
        }
    }
}

/// Add book request (administrators only)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 200, message = "Title is required."))]
    pub title: String,
    #[validate(length(min = 1, max = 5, message = "Between one and five authors are required."))]
    pub authors: Vec<AuthorInput>,
    pub category: Category,
    #[validate(length(min = 1, message = "Please select at least one genre."))]
    pub genres: Vec<Genre>,
    #[validate(length(min = 1, max = 255, message = "URL is required."))]
    pub url: String,
    #[validate(length(min = 1, message = "Description is required."))]
    pub description: String,
    #[validate(range(min = 1, message = "Pages are required."))]
    pub pages: i32,
    #[validate(range(min = 1, message = "Copies are required."))]
    pub copies: i32,
}

impl CreateBook {
    /// Strip surrounding whitespace so blank fields fail validation
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.url = self.url.trim().to_string();
        self.description = self.description.trim().to_string();
        for author in &mut self.authors {
            author.name = author.name.trim().to_string();
        }
        self
    }

    pub fn into_new_book(self) -> Result<NewBook, AppError> {
        let authors: Vec<String> = self
            .authors
            .iter()
            .filter(|a| !a.name.trim().is_empty())
            .map(AuthorInput::display_name)
            .collect();
        if authors.is_empty() {
            return Err(AppError::Validation("Author is required.".to_string()));
        }
        if authors.iter().any(|a| a.chars().count() > 100) {
            return Err(AppError::Validation("Author names are limited to 100 characters.".to_string()));
        }

        let description = self
            .description
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();

        Ok(NewBook {
            title: self.title.trim().to_string(),
            authors,
            category: self.category,
            genres: unique_genres(self.genres),
            copies: self.copies,
            available: self.copies,
            description,
            pages: Some(self.pages),
            url: self.url,
        })
    }
}

/// Entry of the static catalog seed file. Missing fields take empty defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedBook {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    /// Parsed on insert; entries with a missing or unknown category are skipped
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub copies: i32,
    #[serde(default)]
    pub available: i32,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub description: Vec<String>,
    #[serde(default)]
    pub pages: i32,
}

impl TryFrom<SeedBook> for NewBook {
    type Error = AppError;

    fn try_from(seed: SeedBook) -> Result<Self, Self::Error> {
        let category = seed.category.parse::<Category>().map_err(|_| {
            AppError::Validation(format!(
                "Seed entry '{}' has unknown category '{}'",
                seed.title, seed.category
            ))
        })?;
        let copies = seed.copies.max(0);
        Ok(NewBook {
            title: seed.title,
            authors: seed.authors,
            category,
            genres: unique_genres(seed.genres),
            copies,
            available: seed.available.clamp(0, copies),
            description: seed.description,
            pages: (seed.pages > 0).then_some(seed.pages),
            url: seed.url,
        })
    }
}
