pub mod handlers;
pub mod models;
pub mod repository;
pub mod validation;

use anyhow::Context;
use async_trait::async_trait;
use axum::{routing::get, Router};
use bookshelf_http::error::{ErrorBody, ErrorResponse};
use bookshelf_kernel::{InitCtx, Migration, Module};
use utoipa::OpenApi;

use models::{Book, BookInput};
use repository::BookRepo;

pub const MIGRATIONS: &[Migration] = &[Migration {
    id: "0001_initial",
    up: r#"
        CREATE TABLE book (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            title            VARCHAR(50) NOT NULL CHECK (length(title) <= 50),
            publication_date INTEGER NOT NULL
        );
        "#,
}];

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_books,
        handlers::create_book,
        handlers::retrieve_book,
        handlers::replace_book,
        handlers::partial_update_book,
        handlers::destroy_book
    ),
    components(schemas(Book, BookInput, ErrorResponse, ErrorBody)),
    tags((name = "Books", description = "Book catalogue"))
)]
struct BooksApi;

/// The book catalogue: `/books/` and `/books/{id}/`.
pub struct BooksModule;

impl BooksModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self, ctx: &InitCtx<'_>) -> Router {
        Router::new()
            .route(
                "/books/",
                get(handlers::list_books).post(handlers::create_book),
            )
            .route(
                "/books/{id}/",
                get(handlers::retrieve_book)
                    .put(handlers::replace_book)
                    .patch(handlers::partial_update_book)
                    .delete(handlers::destroy_book),
            )
            .with_state(ctx.db.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        match serde_json::to_value(BooksApi::openapi()) {
            Ok(spec) => Some(spec),
            Err(err) => {
                tracing::warn!(module = self.name(), error = %err, "failed to render OpenAPI");
                None
            }
        }
    }

    fn migrations(&self) -> Vec<Migration> {
        MIGRATIONS.to_vec()
    }

    async fn start(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let books = BookRepo::count(ctx.db)
            .await
            .context("failed to count books")?;
        tracing::info!(module = self.name(), books, "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create a new instance of the books module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new())
}
