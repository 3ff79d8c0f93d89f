//! Handlers for the `/books/` collection and `/books/{id}/` detail routes.

use axum::{
    extract::{FromRequest, Path, Request, State},
    http::StatusCode,
    Json,
};
use bookshelf_db::DbPool;
use bookshelf_http::{error::ErrorResponse, extract::JsonObject, AppError, AppResult};

use super::models::{Book, BookChanges, BookId, BookInput};
use super::repository::BookRepo;
use super::validation::{validate_changes, validate_new};

fn book_not_found() -> AppError {
    AppError::not_found("No Book matches the given query.")
}

/// Detail ids are plain decimal digits; anything else is an unknown route.
fn parse_id(raw: &str) -> AppResult<BookId> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(book_not_found());
    }
    raw.parse().map_err(|_| book_not_found())
}

async fn existing_book(pool: &DbPool, raw_id: &str) -> AppResult<Book> {
    let id = parse_id(raw_id)?;
    BookRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(book_not_found)
}

/// Body of an update request. Parsed only once the target book is known to
/// exist, so a missing book wins over a bad payload.
async fn update_payload(request: Request) -> AppResult<serde_json::Map<String, serde_json::Value>> {
    let JsonObject(payload) = JsonObject::from_request(request, &()).await?;
    Ok(payload)
}

/// GET /books/
#[utoipa::path(
    get,
    path = "/books/",
    tag = "Books",
    operation_id = "list_books",
    responses(
        (status = 200, description = "All books", body = [Book]),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_books(State(pool): State<DbPool>) -> AppResult<Json<Vec<Book>>> {
    let books = BookRepo::list(&pool).await?;
    Ok(Json(books))
}

/// POST /books/
#[utoipa::path(
    post,
    path = "/books/",
    tag = "Books",
    operation_id = "create_book",
    request_body = BookInput,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid payload", body = ErrorResponse)
    )
)]
pub async fn create_book(
    State(pool): State<DbPool>,
    JsonObject(payload): JsonObject,
) -> AppResult<(StatusCode, Json<Book>)> {
    let input = validate_new(&payload)?;
    let book = BookRepo::create(&pool, &input).await?;

    tracing::info!(book_id = book.id, title = %book, "book created");
    Ok((StatusCode::CREATED, Json(book)))
}

/// GET /books/{id}/
#[utoipa::path(
    get,
    path = "/books/{id}/",
    tag = "Books",
    operation_id = "retrieve_book",
    params(("id" = i64, Path, description = "Book identifier")),
    responses(
        (status = 200, description = "The book", body = Book),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn retrieve_book(
    State(pool): State<DbPool>,
    Path(id): Path<String>,
) -> AppResult<Json<Book>> {
    let book = existing_book(&pool, &id).await?;
    Ok(Json(book))
}

/// PUT /books/{id}/
#[utoipa::path(
    put,
    path = "/books/{id}/",
    tag = "Books",
    operation_id = "replace_book",
    params(("id" = i64, Path, description = "Book identifier")),
    request_body = BookInput,
    responses(
        (status = 200, description = "Book replaced", body = Book),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn replace_book(
    State(pool): State<DbPool>,
    Path(id): Path<String>,
    request: Request,
) -> AppResult<Json<Book>> {
    let book = existing_book(&pool, &id).await?;
    let payload = update_payload(request).await?;
    let changes: BookChanges = validate_new(&payload)?.into();

    let updated = BookRepo::update(&pool, book.id, &changes)
        .await?
        .ok_or_else(book_not_found)?;

    tracing::info!(book_id = updated.id, "book replaced");
    Ok(Json(updated))
}

/// PATCH /books/{id}/
#[utoipa::path(
    patch,
    path = "/books/{id}/",
    tag = "Books",
    operation_id = "partial_update_book",
    params(("id" = i64, Path, description = "Book identifier")),
    request_body(content = BookInput, description = "Any subset of the book fields"),
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn partial_update_book(
    State(pool): State<DbPool>,
    Path(id): Path<String>,
    request: Request,
) -> AppResult<Json<Book>> {
    let book = existing_book(&pool, &id).await?;
    let payload = update_payload(request).await?;
    let changes = validate_changes(&payload, true)?;
    if changes.is_empty() {
        return Ok(Json(book));
    }

    let updated = BookRepo::update(&pool, book.id, &changes)
        .await?
        .ok_or_else(book_not_found)?;

    tracing::info!(book_id = updated.id, "book updated");
    Ok(Json(updated))
}

/// DELETE /books/{id}/
#[utoipa::path(
    delete,
    path = "/books/{id}/",
    tag = "Books",
    operation_id = "destroy_book",
    params(("id" = i64, Path, description = "Book identifier")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found", body = ErrorResponse)
    )
)]
pub async fn destroy_book(
    State(pool): State<DbPool>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id)?;
    if BookRepo::delete(&pool, id).await? {
        tracing::info!(book_id = id, "book deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(book_not_found())
    }
}
