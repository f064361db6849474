//! Route path helpers.

use serde::Serialize;
use uuid::Uuid;

/// Normalizes a route path.
///
/// The result always starts with `/`, never contains repeated slashes and
/// has no trailing `/` unless it is the root itself.
#[must_use]
pub fn sanitize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// Joins a base path and a route path into one sanitized path.
#[must_use]
pub fn concatenate_endpoints(base_path: &str, path: &str) -> String {
    sanitize_path(&format!("/{base_path}/{path}"))
}

/// Reads a UUID from a query string.
///
/// Returns `Ok(None)` when `key` is absent or empty.
///
/// # Errors
///
/// Returns the parse error when the value is not a valid UUID.
pub fn query_id(query: Option<&str>, key: &str) -> Result<Option<Uuid>, uuid::Error> {
    let value = query
        .unwrap_or_default()
        .split('&')
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find_map(|(k, v)| (k == key).then_some(v));

    match value {
        None | Some("") => Ok(None),
        Some(raw) => Uuid::parse_str(raw).map(Some),
    }
}

/// Serializes a list, rendering a missing one as `[]` rather than `null`.
///
/// # Errors
///
/// Returns the serialization error of an item.
pub fn marshal_or_empty<T: Serialize>(items: Option<&[T]>) -> serde_json::Result<String> {
    serde_json::to_string(items.unwrap_or_default())
}
