//! Catalog management service

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
    repository::{Page, Repository},
};

const FULL_TEXT_LIMIT: i64 = 20;

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books with filters and pagination
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<Book>, i64, Page)> {
        let page = Page::new(query.page, query.per_page);
        let (books, total) = self.repository.books.search(query, page).await?;
        Ok((books, total, page))
    }

    /// Full-text search, best matches first
    pub async fn full_text_search(&self, q: Option<&str>) -> AppResult<Vec<Book>> {
        let q = q.map(str::trim).filter(|q| !q.is_empty()).ok_or_else(|| {
            AppError::BadRequest("Search query is required".to_string())
        })?;
        self.repository.books.full_text_search(q, FULL_TEXT_LIMIT).await
    }

    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_active(id).await
    }

    pub async fn create_book(&self, book: CreateBook, created_by: i32) -> AppResult<Book> {
        let created = self.repository.books.create(&book, created_by).await?;
        tracing::info!(book_id = created.id, isbn = %created.isbn, copies = created.total_copies, "Book created");
        Ok(created)
    }

    pub async fn update_book(&self, id: i32, update: UpdateBook) -> AppResult<Book> {
        let updated = self.repository.books.update(id, &update).await?;
        tracing::info!(
            book_id = id,
            total_copies = updated.total_copies,
            available_copies = updated.available_copies,
            "Book updated"
        );
        Ok(updated)
    }

    /// Soft delete: the book leaves the catalog, its loans stay valid
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.soft_delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }
}
