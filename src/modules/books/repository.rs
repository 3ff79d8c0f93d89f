//! Repository for the `book` table.

use bookshelf_db::DbPool;

use super::models::{Book, BookChanges, BookId, NewBook};

/// Column list shared across queries.
const COLUMNS: &str = "id, title, publication_date";

/// Provides CRUD operations for books.
pub struct BookRepo;

impl BookRepo {
    /// Insert a new book, returning the created row.
    pub async fn create(pool: &DbPool, input: &NewBook) -> Result<Book, sqlx::Error> {
        let query = format!(
            "INSERT INTO book (title, publication_date)
             VALUES (?1, ?2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Book>(&query)
            .bind(&input.title)
            .bind(input.publication_date)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &DbPool, id: BookId) -> Result<Option<Book>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM book WHERE id = ?1");
        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List all books in insertion order.
    pub async fn list(pool: &DbPool) -> Result<Vec<Book>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM book ORDER BY id");
        sqlx::query_as::<_, Book>(&query).fetch_all(pool).await
    }

    /// Update a book. Only `Some` fields in `changes` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &DbPool,
        id: BookId,
        changes: &BookChanges,
    ) -> Result<Option<Book>, sqlx::Error> {
        let query = format!(
            "UPDATE book SET
                title = COALESCE(?2, title),
                publication_date = COALESCE(?3, publication_date)
             WHERE id = ?1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Book>(&query)
            .bind(id)
            .bind(&changes.title)
            .bind(changes.publication_date)
            .fetch_optional(pool)
            .await
    }

    /// Delete a book by ID. Returns `true` if a row was removed.
    pub async fn delete(pool: &DbPool, id: BookId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM book WHERE id = ?1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &DbPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM book")
            .fetch_one(pool)
            .await
    }
}
