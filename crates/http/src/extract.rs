//! Request extractors that reject with [`AppError`].

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde_json::{Map, Value};

use crate::error::AppError;

/// A JSON request body that must be an object.
///
/// Field-level validation is left to the handler so every bad field can be
/// reported at once instead of failing on the first type mismatch.
#[derive(Debug, Clone, Default)]
pub struct JsonObject(pub Map<String, Value>);

impl<S> FromRequest<S> for JsonObject
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<Value>::from_request(req, state).await {
            Ok(Json(Value::Object(map))) => Ok(Self(map)),
            Ok(Json(other)) => Err(AppError::bad_request(format!(
                "Invalid data. Expected a JSON object, but got {}.",
                json_type_name(&other)
            ))),
            Err(JsonRejection::MissingJsonContentType(rejection)) => {
                Err(AppError::unsupported_media_type(rejection.body_text()))
            }
            Err(rejection) => Err(AppError::bad_request(format!(
                "JSON parse error: {}",
                rejection.body_text()
            ))),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
