//! Book (catalog) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub authors: Vec<String>,
    pub isbn: String,
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub edition: Option<String>,
    pub language: String,
    pub genres: Vec<String>,
    pub description: Option<String>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub cover_image: Option<String>,
    pub shelf_location: Option<String>,
    pub created_by: Option<i32>,
    /// Soft-deleted books keep their loans but cannot be issued again
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Copies currently out on loan
    pub fn copies_on_loan(&self) -> i32 {
        self.total_copies - self.available_copies
    }

    pub fn is_issuable(&self) -> bool {
        !self.is_deleted && self.available_copies > 0
    }
}

/// Sort keys accepted by the book listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BookSortBy {
    #[default]
    CreatedAt,
    Title,
    PublicationDate,
    AvailableCopies,
}

impl BookSortBy {
    pub fn column(&self) -> &'static str {
        match self {
            BookSortBy::CreatedAt => "created_at",
            BookSortBy::Title => "title",
            BookSortBy::PublicationDate => "publication_date",
            BookSortBy::AvailableCopies => "available_copies",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Book listing query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Case-insensitive match on title, authors, ISBN and description
    pub search: Option<String>,
    pub genre: Option<String>,
    /// Only books with at least one copy on the shelf
    pub available: Option<bool>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub sort_by: Option<BookSortBy>,
    pub sort_order: Option<SortOrder>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Full-text search parameters
#[derive(Debug, Deserialize, IntoParams)]
pub struct BookSearchQuery {
    pub q: Option<String>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Book title is required"))]
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[validate(length(min = 1, message = "ISBN is required"))]
    pub isbn: String,
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub edition: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "Total copies must be at least 1"))]
    pub total_copies: i32,
    pub cover_image: Option<String>,
    pub shelf_location: Option<String>,
}

/// Update book request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Book title cannot be empty"))]
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    #[validate(length(min = 1, message = "ISBN cannot be empty"))]
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<NaiveDate>,
    pub edition: Option<String>,
    pub language: Option<String>,
    pub genres: Option<Vec<String>>,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "Total copies must be at least 1"))]
    pub total_copies: Option<i32>,
    pub cover_image: Option<String>,
    pub shelf_location: Option<String>,
}

/// Recompute the shelf count after `total_copies` changes.
///
/// Returns `None` when the new total would leave fewer copies than are
/// currently on loan.
pub fn adjusted_available_copies(book: &Book, new_total: i32) -> Option<i32> {
    let available = book.available_copies + (new_total - book.total_copies);
    (available >= 0).then_some(available)
}
