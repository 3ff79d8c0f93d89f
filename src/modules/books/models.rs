use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Maximum title length, in characters.
pub const TITLE_MAX_LENGTH: usize = 50;

pub type BookId = i64;

/// A row from the `book` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Book {
    /// Identifier assigned by the database
    pub id: BookId,
    /// Title of the book, at most 50 characters
    pub title: String,
    /// Year of publication
    pub publication_date: i32,
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Request body for creating or replacing a book.
///
/// Documentation only; handlers validate the raw JSON object so every
/// invalid field is reported.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookInput {
    /// Title of the book, at most 50 characters
    #[schema(max_length = 50)]
    pub title: String,
    /// Year of publication; integer strings such as `"1999"` are accepted
    pub publication_date: i32,
}

/// Validated fields for a new book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub publication_date: i32,
}

/// Validated changes to an existing book. `None` leaves the column as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub publication_date: Option<i32>,
}

impl From<NewBook> for BookChanges {
    fn from(book: NewBook) -> Self {
        Self {
            title: Some(book.title),
            publication_date: Some(book.publication_date),
        }
    }
}

impl BookChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.publication_date.is_none()
    }
}
