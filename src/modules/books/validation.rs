//! Field validation for book payloads.
//!
//! Works on the raw JSON object so that every invalid field is reported in a
//! single 400 response.

use bookshelf_http::AppError;
use serde_json::{Map, Value};

use super::models::{BookChanges, NewBook, TITLE_MAX_LENGTH};

const REQUIRED: &str = "This field is required.";
const NULL: &str = "This field may not be null.";
const BLANK: &str = "This field may not be blank.";
const NOT_A_STRING: &str = "Not a valid string.";
const NOT_AN_INTEGER: &str = "A valid integer is required.";

type FieldResult<T> = Result<T, String>;

fn clean_title(value: &Value) -> FieldResult<String> {
    let raw = match value {
        Value::Null => return Err(NULL.to_string()),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Err(NOT_A_STRING.to_string()),
    };

    let title = raw.trim();
    if title.is_empty() {
        return Err(BLANK.to_string());
    }
    if title.chars().count() > TITLE_MAX_LENGTH {
        return Err(format!(
            "Ensure this field has no more than {TITLE_MAX_LENGTH} characters."
        ));
    }
    Ok(title.to_string())
}

/// Integer text with an optional `.000` tail, e.g. `"1999"`, `" 1999.0 "`.
fn parse_integer_text(text: &str) -> Option<i128> {
    let trimmed = text.trim();
    let digits = match trimmed.split_once('.') {
        Some((whole, fraction)) if fraction.bytes().all(|b| b == b'0') => whole,
        Some(_) => return None,
        None => trimmed,
    };
    digits.parse::<i128>().ok()
}

fn clean_publication_date(value: &Value) -> FieldResult<i32> {
    let wide = match value {
        Value::Null => return Err(NULL.to_string()),
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| f as i128)
            }),
        Value::String(s) => parse_integer_text(s),
        _ => None,
    }
    .ok_or_else(|| NOT_AN_INTEGER.to_string())?;

    if wide > i128::from(i32::MAX) {
        return Err(format!(
            "Ensure this value is less than or equal to {}.",
            i32::MAX
        ));
    }
    if wide < i128::from(i32::MIN) {
        return Err(format!(
            "Ensure this value is greater than or equal to {}.",
            i32::MIN
        ));
    }
    Ok(wide as i32)
}

fn required<T>(
    payload: &Map<String, Value>,
    field: &str,
    clean: fn(&Value) -> FieldResult<T>,
) -> FieldResult<T> {
    payload
        .get(field)
        .ok_or_else(|| REQUIRED.to_string())
        .and_then(clean)
}

fn optional<T>(
    payload: &Map<String, Value>,
    field: &str,
    clean: fn(&Value) -> FieldResult<T>,
) -> FieldResult<Option<T>> {
    payload.get(field).map(clean).transpose()
}

/// Join the per-field outcomes, reporting every failed field at once.
fn combine<A, B>(title: FieldResult<A>, publication_date: FieldResult<B>) -> Result<(A, B), AppError> {
    match (title, publication_date) {
        (Ok(title), Ok(publication_date)) => Ok((title, publication_date)),
        (title, publication_date) => Err(AppError::invalid_fields(
            title
                .err()
                .map(|message| ("title", message))
                .into_iter()
                .chain(publication_date.err().map(|message| ("publication_date", message))),
        )),
    }
}

/// Validate a create/replace payload; every field is required.
pub fn validate_new(payload: &Map<String, Value>) -> Result<NewBook, AppError> {
    let (title, publication_date) = combine(
        required(payload, "title", clean_title),
        required(payload, "publication_date", clean_publication_date),
    )?;
    Ok(NewBook {
        title,
        publication_date,
    })
}

/// Validate `payload`. With `partial`, absent fields are left unchanged
/// instead of being reported as missing.
pub fn validate_changes(payload: &Map<String, Value>, partial: bool) -> Result<BookChanges, AppError> {
    if !partial {
        return validate_new(payload).map(BookChanges::from);
    }

    let (title, publication_date) = combine(
        optional(payload, "title", clean_title),
        optional(payload, "publication_date", clean_publication_date),
    )?;
    Ok(BookChanges {
        title,
        publication_date,
    })
}
