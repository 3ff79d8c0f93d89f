//! Response format negotiation via URL suffix (`/books.json`, `/books/3.api`)
//! or `?format=` query parameter.
//!
//! Negotiation rewrites the request URI before routing, so it has to wrap
//! the finished router rather than be added with `Router::layer`.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Query, Request, State},
    http::{header, uri::PathAndQuery, HeaderValue, StatusCode, Uri},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

use crate::error::AppError;

/// Rendering selected for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    /// Browsable HTML page wrapping the JSON payload.
    Api,
}

impl Format {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "json" => Some(Format::Json),
            "api" => Some(Format::Api),
            _ => None,
        }
    }
}

/// Result of splitting a request path.
#[derive(Debug, PartialEq, Eq)]
pub struct SuffixedPath {
    /// Path with the suffix removed and a trailing slash ensured.
    pub path: String,
    /// Raw suffix, e.g. `json`, if one was present.
    pub suffix: Option<String>,
}

fn is_suffix(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

/// Split a `.fmt` suffix off the last segment and normalise the trailing
/// slash: `/books/3.json/` and `/books/3` both become `/books/3/`.
pub fn split_suffix(path: &str) -> SuffixedPath {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    let (head, last) = match trimmed.rfind('/') {
        Some(idx) => trimmed.split_at(idx + 1),
        None => ("", trimmed),
    };

    let (stem, suffix) = match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && is_suffix(ext) => (stem, Some(ext.to_string())),
        _ => (last, None),
    };

    SuffixedPath {
        path: format!("{head}{stem}/"),
        suffix,
    }
}

#[derive(Debug, Deserialize)]
struct FormatParams {
    format: Option<String>,
}

/// Decoded `?format=` value, if any.
fn query_format(uri: &Uri) -> Result<Option<String>, AppError> {
    let Query(params) = Query::<FormatParams>::try_from_uri(uri)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    Ok(params.format)
}

fn owns_path(prefixes: &[&'static str], path: &str) -> bool {
    let first = path
        .trim_start_matches('/')
        .split(['/', '.'])
        .next()
        .unwrap_or_default();
    prefixes.contains(&first)
}

/// Middleware applying suffix negotiation to paths under the given
/// top-level segments. Other paths pass through untouched.
pub async fn negotiate(
    State(prefixes): State<Arc<Vec<&'static str>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = req.uri().path().to_string();
    if !owns_path(&prefixes, &path) {
        return Ok(next.run(req).await);
    }

    let split = split_suffix(&path);
    let requested = match split.suffix.clone() {
        Some(suffix) => Some(suffix),
        None => query_format(req.uri())?,
    };

    let format = match requested.as_deref() {
        None => Format::Json,
        Some(name) => Format::from_name(name)
            .ok_or_else(|| AppError::not_found(format!("Unsupported format '{name}'.")))?,
    };

    if split.path != path {
        let rewritten = rewrite_path(req.uri(), &split.path)?;
        *req.uri_mut() = rewritten;
    }

    let response = next.run(req).await;
    match format {
        Format::Json => Ok(response),
        Format::Api => render_browsable(response).await,
    }
}

fn rewrite_path(uri: &Uri, path: &str) -> Result<Uri, AppError> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("invalid rewritten path")))?,
    );
    Uri::from_parts(parts)
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("invalid rewritten uri")))
}

/// Wrap a JSON response in an HTML page. Bodiless statuses pass through.
async fn render_browsable(response: Response) -> Result<Response, AppError> {
    if matches!(
        response.status(),
        StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED
    ) {
        return Ok(response);
    }

    let (mut parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("failed to buffer response")))?;

    let pretty = match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_default(),
        Err(_) => String::from_utf8_lossy(&bytes).into_owned(),
    };

    let status = parts.status;
    let html = format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Bookshelf API</title></head>\n\
         <body>\n<h1>Bookshelf API</h1>\n<p><b>HTTP {} {}</b></p>\n<pre>{}</pre>\n</body>\n</html>\n",
        status.as_u16(),
        status.canonical_reason().unwrap_or_default(),
        html_escape::encode_safe(&pretty)
    );

    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    Ok(Response::from_parts(parts, Body::from(html)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(path: &str) -> (String, Option<String>) {
        let s = split_suffix(path);
        (s.path, s.suffix)
    }

    #[test]
    fn collection_paths() {
        assert_eq!(split("/books/"), ("/books/".to_string(), None));
        assert_eq!(split("/books"), ("/books/".to_string(), None));
        assert_eq!(
            split("/books.json"),
            ("/books/".to_string(), Some("json".to_string()))
        );
        assert_eq!(
            split("/books.api/"),
            ("/books/".to_string(), Some("api".to_string()))
        );
    }

    #[test]
    fn detail_paths() {
        assert_eq!(split("/books/12/"), ("/books/12/".to_string(), None));
        assert_eq!(
            split("/books/12.json"),
            ("/books/12/".to_string(), Some("json".to_string()))
        );
        assert_eq!(
            split("/books/12.xml/"),
            ("/books/12/".to_string(), Some("xml".to_string()))
        );
    }

    #[test]
    fn uppercase_or_empty_suffix_is_not_a_format() {
        assert_eq!(split("/books/12.JSON"), ("/books/12.JSON/".to_string(), None));
        assert_eq!(split("/books/12."), ("/books/12./".to_string(), None));
    }

    fn query(uri: &str) -> Option<String> {
        query_format(&uri.parse::<Uri>().unwrap()).unwrap()
    }

    #[test]
    fn format_query_parameter() {
        assert_eq!(query("/books/?a=1&format=api"), Some("api".to_string()));
        assert_eq!(query("/books/?format=ap%69"), Some("api".to_string()));
        assert_eq!(query("/books/?a=1"), None);
        assert_eq!(query("/books/"), None);
    }

    #[test]
    fn repeated_format_parameter_is_a_bad_request() {
        let uri = "/books/?format=api&format=json".parse::<Uri>().unwrap();
        let err = query_format(&uri).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn only_module_paths_are_negotiated() {
        let prefixes = vec!["books"];
        assert!(owns_path(&prefixes, "/books"));
        assert!(owns_path(&prefixes, "/books.json"));
        assert!(owns_path(&prefixes, "/books/3/"));
        assert!(!owns_path(&prefixes, "/docs/openapi.json"));
        assert!(!owns_path(&prefixes, "/bookstore/"));
    }

    #[tokio::test]
    async fn browsable_page_escapes_markup() {
        let response = Response::new(Body::from(r#"{"t":"<a & 'b'>"}"#));
        let rendered = render_browsable(response).await.unwrap();
        let bytes = to_bytes(rendered.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("&lt;a &amp; &#x27;b&#x27;&gt;"));
        assert!(html.contains("HTTP 200 OK"));
    }

    #[tokio::test]
    async fn no_content_is_not_wrapped() {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        let rendered = render_browsable(response).await.unwrap();

        assert_eq!(rendered.status(), StatusCode::NO_CONTENT);
        assert!(rendered.headers().get(header::CONTENT_TYPE).is_none());
        let bytes = to_bytes(rendered.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.is_empty());
    }
}
