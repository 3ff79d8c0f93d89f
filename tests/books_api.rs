//! HTTP-level tests for the `/books/` collection and `/books/{id}/` detail
//! endpoints, driven through the full middleware stack.

mod common;

use axum::http::{Method, StatusCode};
use common::{
    body_bytes, body_json, create_book, delete, get, patch_json, post_json, put_json, send_raw,
    test_app,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_starts_empty() {
    let app = test_app().await;
    let response = get(&app, "/books/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn create_returns_201_and_record_is_retrievable() {
    let app = test_app().await;
    let response = post_json(
        &app,
        "/books/",
        json!({"title": "The Left Hand of Darkness", "publication_date": 1969}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["title"], "The Left Hand of Darkness");
    assert_eq!(created["publication_date"], 1969);
    let id = created["id"].as_i64().unwrap();

    let response = get(&app, &format!("/books/{id}/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, created);
}

#[tokio::test]
async fn created_ids_are_unique() {
    let app = test_app().await;
    let first = create_book(&app, "Dune", 1965).await;
    let second = create_book(&app, "Dune", 1965).await;
    assert_ne!(first, second);
}

#[tokio::test]
async fn overlong_title_is_rejected_and_nothing_persisted() {
    let app = test_app().await;
    let response = post_json(
        &app,
        "/books/",
        json!({"title": "x".repeat(51), "publication_date": 2000}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "validation_error");
    assert_eq!(json["error"]["details"][0]["field"], "title");
    assert_eq!(
        json["error"]["details"][0]["error"],
        "Ensure this field has no more than 50 characters."
    );

    let response = get(&app, "/books/").await;
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn fifty_character_title_is_accepted() {
    let app = test_app().await;
    let response = post_json(
        &app,
        "/books/",
        json!({"title": "y".repeat(50), "publication_date": 2000}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn create_reports_all_invalid_fields() {
    let app = test_app().await;
    let response = post_json(&app, "/books/", json!({"publication_date": "soon"})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let details = body_json(response).await["error"]["details"].clone();
    assert_eq!(
        details,
        json!([
            {"field": "title", "error": "This field is required."},
            {"field": "publication_date", "error": "A valid integer is required."}
        ])
    );
}

#[tokio::test]
async fn create_accepts_integer_strings() {
    let app = test_app().await;
    let response = post_json(
        &app,
        "/books/",
        json!({"title": "Middlemarch", "publication_date": "1871"}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["publication_date"], 1871);
}

#[tokio::test]
async fn client_supplied_id_is_ignored() {
    let app = test_app().await;
    let response = post_json(
        &app,
        "/books/",
        json!({"id": 999, "title": "Beloved", "publication_date": 1987}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_ne!(body_json(response).await["id"], 999);
}

#[tokio::test]
async fn list_returns_exactly_the_created_books() {
    let app = test_app().await;
    let titles = ["Kindred", "Ubik", "Solaris", "Frankenstein"];
    let mut ids = Vec::new();
    for (year, title) in (1970..).zip(titles) {
        ids.push(create_book(&app, title, year).await);
    }

    let response = get(&app, "/books/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let books = body_json(response).await;
    let books = books.as_array().unwrap();

    assert_eq!(books.len(), titles.len());
    for id in ids {
        assert!(books.iter().any(|b| b["id"] == id), "missing book {id}");
    }
}

// ---------------------------------------------------------------------------
// Detail
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_nonexistent_returns_404() {
    let app = test_app().await;
    let response = get(&app, "/books/4242/").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "not_found");
}

#[tokio::test]
async fn non_numeric_id_returns_404() {
    let app = test_app().await;
    for uri in ["/books/abc/", "/books/-1/", "/books/1e3/"] {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn put_replaces_the_record() {
    let app = test_app().await;
    let id = create_book(&app, "Original", 1900).await;

    let response = put_json(
        &app,
        &format!("/books/{id}/"),
        json!({"title": "Replaced", "publication_date": 2001}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"id": id, "title": "Replaced", "publication_date": 2001})
    );
}

#[tokio::test]
async fn put_requires_every_field() {
    let app = test_app().await;
    let id = create_book(&app, "Original", 1900).await;

    let response = put_json(&app, &format!("/books/{id}/"), json!({"title": "Only title"})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["details"][0]["field"], "publication_date");

    let response = get(&app, &format!("/books/{id}/")).await;
    assert_eq!(body_json(response).await["title"], "Original");
}

#[tokio::test]
async fn patch_changes_only_submitted_fields() {
    let app = test_app().await;
    let id = create_book(&app, "Persuasion", 1816).await;

    let response = patch_json(&app, &format!("/books/{id}/"), json!({"publication_date": 1817})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"id": id, "title": "Persuasion", "publication_date": 1817})
    );

    let response = patch_json(&app, &format!("/books/{id}/"), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["publication_date"], 1817);
}

#[tokio::test]
async fn patch_validates_submitted_fields() {
    let app = test_app().await;
    let id = create_book(&app, "Persuasion", 1816).await;

    let response = patch_json(&app, &format!("/books/{id}/"), json!({"title": ""})).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"]["details"][0]["error"],
        "This field may not be blank."
    );
}

#[tokio::test]
async fn update_of_missing_book_returns_404_even_with_bad_payload() {
    let app = test_app().await;

    let response = put_json(&app, "/books/77/", json!({"title": 5.5})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = patch_json(&app, "/books/77/", json!({"title": "Fine"})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send_raw(
        &app,
        Method::PUT,
        "/books/77/",
        Some("application/json"),
        r#"{"title": "#,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send_raw(&app, Method::PUT, "/books/77/", Some("application/json"), "[1]").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send_raw(&app, Method::PATCH, "/books/77/", None, r#"{"title": "x"}"#).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"]["code"], "not_found");
}

#[tokio::test]
async fn body_errors_still_apply_to_existing_books() {
    let app = test_app().await;
    let id = create_book(&app, "Present", 2001).await;
    let uri = format!("/books/{id}/");

    let response = send_raw(&app, Method::PUT, &uri, Some("application/json"), r#"{"title": "#).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send_raw(&app, Method::PATCH, &uri, None, r#"{"title": "x"}"#).await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn unsupported_method_returns_error_body() {
    let app = test_app().await;
    let id = create_book(&app, "Fixed", 1999).await;

    let response = post_json(&app, &format!("/books/{id}/"), json!({})).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "method_not_allowed");
    assert_eq!(body["error"]["message"], "Method \"POST\" not allowed.");

    let response = delete(&app, "/books/").await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn delete_returns_204_then_404() {
    let app = test_app().await;
    let id = create_book(&app, "Delete Me", 2020).await;

    let response = delete(&app, &format!("/books/{id}/")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(response).await.is_empty());

    let response = get(&app, &format!("/books/{id}/")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = delete(&app, &format!("/books/{id}/")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_json_returns_400() {
    let app = test_app().await;
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/books/")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{\"title\": "))
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "bad_request");
}

#[tokio::test]
async fn json_array_body_returns_400() {
    let app = test_app().await;
    let response = post_json(&app, "/books/", json!([{"title": "A", "publication_date": 1}])).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
