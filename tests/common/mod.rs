#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use bookshelf::Application;
use bookshelf_kernel::settings::Settings;
use http_body_util::BodyExt;
use tower::ServiceExt;

/// Settings pointing at a private in-memory database.
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.database.url = "sqlite::memory:".to_string();
    settings
}

/// Bootstrap the full application (migrations included) and return its
/// router. Clones of the router share one database.
pub async fn test_app() -> Router {
    Application::bootstrap(test_settings())
        .await
        .expect("bootstrap failed")
        .router()
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<serde_json::Value>) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    app.clone().oneshot(request).await.unwrap()
}

/// Send `body` verbatim, with an optional content type.
pub async fn send_raw(
    app: &Router,
    method: Method,
    uri: &str,
    content_type: Option<&str>,
    body: &str,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();

    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, Some(body)).await
}

pub async fn put_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::PUT, uri, Some(body)).await
}

pub async fn patch_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::PATCH, uri, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str) -> Response {
    send(app, Method::DELETE, uri, None).await
}

pub async fn body_bytes(response: Response) -> axum::body::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Create a book through the API and return its id.
pub async fn create_book(app: &Router, title: &str, year: i64) -> i64 {
    let response = post_json(
        app,
        "/books/",
        serde_json::json!({"title": title, "publication_date": year}),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["id"].as_i64().unwrap()
}
