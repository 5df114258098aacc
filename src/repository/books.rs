//! Books repository for database operations

use chrono::{NaiveDate, Utc};
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult, Conflict},
    models::book::{adjusted_available_copies, Book, BookQuery, CreateBook, UpdateBook},
};

use super::Page;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID, soft-deleted rows included
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    /// Get a book that has not been deleted
    pub async fn get_active(&self, id: i32) -> AppResult<Book> {
        self.find_by_id(id)
            .await?
            .filter(|b| !b.is_deleted)
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    fn push_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, query: &'a BookQuery) {
        builder.push(" WHERE is_deleted = FALSE");

        if let Some(ref search) = query.search {
            let pattern = format!("%{}%", search.trim());
            builder
                .push(" AND (title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR isbn ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR EXISTS (SELECT 1 FROM unnest(authors) a WHERE a ILIKE ")
                .push_bind(pattern)
                .push("))");
        }

        if let Some(ref genre) = query.genre {
            builder.push(" AND ").push_bind(genre).push(" = ANY(genres)");
        }

        if query.available == Some(true) {
            builder.push(" AND available_copies > 0");
        }

        if let Some(year) = query.year_from.and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1)) {
            builder.push(" AND publication_date >= ").push_bind(year);
        }

        if let Some(year) = query.year_to.and_then(|y| NaiveDate::from_ymd_opt(y, 12, 31)) {
            builder.push(" AND publication_date <= ").push_bind(year);
        }
    }

    /// Search books with filters, sorting and pagination
    pub async fn search(&self, query: &BookQuery, page: Page) -> AppResult<(Vec<Book>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM books");
        Self::push_filters(&mut count, query);
        let total = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let sort_by = query.sort_by.unwrap_or_default();
        let sort_order = query.sort_order.unwrap_or_default();

        let mut select = QueryBuilder::<Postgres>::new("SELECT * FROM books");
        Self::push_filters(&mut select, query);
        // Sort keys come from closed enums, never from raw input
        select
            .push(format!(" ORDER BY {} {}, id {}", sort_by.column(), sort_order.keyword(), sort_order.keyword()))
            .push(" LIMIT ")
            .push_bind(page.per_page)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let books = select.build_query_as::<Book>().fetch_all(&self.pool).await?;

        Ok((books, total))
    }

    /// Full-text search ranked by relevance
    pub async fn full_text_search(&self, q: &str, limit: i64) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE is_deleted = FALSE
              AND search_vector @@ plainto_tsquery('simple', $1)
            ORDER BY ts_rank(search_vector, plainto_tsquery('simple', $1)) DESC, id
            LIMIT $2
            "#,
        )
        .bind(q)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Create a new book, every copy on the shelf
    pub async fn create(&self, book: &CreateBook, created_by: i32) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (
                title, authors, isbn, publisher, publication_date, edition, language,
                genres, description, total_copies, available_copies, cover_image,
                shelf_location, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 'English'), $8, $9, $10, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.authors)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.publication_date)
        .bind(&book.edition)
        .bind(&book.language)
        .bind(&book.genres)
        .bind(&book.description)
        .bind(book.total_copies)
        .bind(&book.cover_image)
        .bind(&book.shelf_location)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::BadRequest(format!("A book with ISBN {} already exists", book.isbn))
            }
            other => other.into(),
        })?;

        Ok(created)
    }

    /// Update a book. A new total shifts the shelf count by the same delta.
    pub async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Book>(
            "SELECT * FROM books WHERE id = $1 AND is_deleted = FALSE FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let (total, available) = match update.total_copies {
            Some(total) if total != current.total_copies => {
                let available = adjusted_available_copies(&current, total).ok_or(Conflict::CopiesOnLoan)?;
                (total, available)
            }
            _ => (current.total_copies, current.available_copies),
        };

        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books SET
                title = COALESCE($2, title),
                authors = COALESCE($3, authors),
                isbn = COALESCE($4, isbn),
                publisher = COALESCE($5, publisher),
                publication_date = COALESCE($6, publication_date),
                edition = COALESCE($7, edition),
                language = COALESCE($8, language),
                genres = COALESCE($9, genres),
                description = COALESCE($10, description),
                total_copies = $11,
                available_copies = $12,
                cover_image = COALESCE($13, cover_image),
                shelf_location = COALESCE($14, shelf_location),
                updated_at = $15
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&update.title)
        .bind(&update.authors)
        .bind(&update.isbn)
        .bind(&update.publisher)
        .bind(update.publication_date)
        .bind(&update.edition)
        .bind(&update.language)
        .bind(&update.genres)
        .bind(&update.description)
        .bind(total)
        .bind(available)
        .bind(&update.cover_image)
        .bind(&update.shelf_location)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Soft delete a book
    pub async fn soft_delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("UPDATE books SET is_deleted = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        Ok(())
    }
}
