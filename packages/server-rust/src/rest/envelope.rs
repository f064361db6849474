//! Response envelope wrapping handler output.
//!
//! Enveloped routes answer with
//! `{"requestId": "...", "status": "SUCCESS" | "ERROR", "details": ...}`
//! whatever the handler produced. JSON bodies are embedded as-is, any other
//! body becomes a JSON string.

use axum::body::Body;
use axum::extract::Request;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use toolkit_core::process::{error_from_panic, PanicPayload};
use tracing::warn;
use uuid::Uuid;

use crate::network::REQUEST_ID_HEADER;

/// Outcome reported in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnvelopeStatus {
    Success,
    Error,
}

impl EnvelopeStatus {
    fn of(status: StatusCode) -> Self {
        if status.is_success() {
            Self::Success
        } else {
            Self::Error
        }
    }
}

/// Body sent by enveloped routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub request_id: String,
    pub status: EnvelopeStatus,
    pub details: Value,
}

/// Middleware wrapping the inner response into a [`ResponseEnvelope`].
///
/// The request id comes from the `x-request-id` header, or is generated
/// when the request carries none.
pub async fn response_envelope(request: Request, next: Next) -> Response {
    let request_id = request_id_of(request.headers());
    let response = next.run(request).await;
    wrap(request_id, response).await
}

fn request_id_of(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), ToString::to_string)
}

async fn wrap(request_id: String, response: Response) -> Response {
    let (mut parts, body) = response.into_parts();

    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(request_id = %request_id, error = %err, "failed to read response body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let is_json = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    let details = if bytes.is_empty() {
        Value::Null
    } else if is_json {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    } else {
        Value::String(String::from_utf8_lossy(&bytes).into_owned())
    };

    let envelope = ResponseEnvelope {
        request_id,
        status: EnvelopeStatus::of(parts.status),
        details,
    };

    let body = match serde_json::to_vec(&envelope) {
        Ok(body) => body,
        Err(err) => {
            warn!(request_id = %envelope.request_id, error = %err, "failed to encode envelope");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    parts.headers.remove(CONTENT_LENGTH);
    parts
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Response::from_parts(parts, Body::from(body))
}

/// Renders a handler panic as a 500 `{"message": <panic text>}`.
///
/// Used with `tower_http::catch_panic::CatchPanicLayer::custom`.
pub fn panic_response(payload: PanicPayload) -> Response {
    let message = error_from_panic(payload).to_string();
    warn!(panic = %message, "route handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": message })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use crate::rest::ApiError;

    async fn call(router: Router, request_id: Option<&str>) -> (StatusCode, ResponseEnvelope) {
        let mut request = axum::http::Request::builder().uri("/");
        if let Some(id) = request_id {
            request = request.header(REQUEST_ID_HEADER, id);
        }
        let response = router
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn enveloped(router: Router) -> Router {
        router.layer(axum::middleware::from_fn(response_envelope))
    }

    #[tokio::test]
    async fn text_body_becomes_json_string() {
        let router = enveloped(Router::new().route("/", get(|| async { "OK" })));
        let (status, envelope) = call(router, Some("abc")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(envelope.request_id, "abc");
        assert_eq!(envelope.status, EnvelopeStatus::Success);
        assert_eq!(envelope.details, Value::String("OK".to_string()));
    }

    #[tokio::test]
    async fn json_body_is_embedded() {
        let router = enveloped(
            Router::new().route("/", get(|| async { Json(json!({ "name": "alice", "age": 3 })) })),
        );
        let (_, envelope) = call(router, None).await;

        assert_eq!(envelope.details, json!({ "name": "alice", "age": 3 }));
    }

    #[tokio::test]
    async fn missing_request_id_is_generated() {
        let router = enveloped(Router::new().route("/", get(|| async { "OK" })));
        let (_, envelope) = call(router, None).await;

        assert!(Uuid::parse_str(&envelope.request_id).is_ok());
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let router = enveloped(Router::new().route(
            "/",
            get(|| async { Err::<String, _>(ApiError::NotFound("no such user".to_string())) }),
        ));
        let (status, envelope) = call(router, Some("abc")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(envelope.status, EnvelopeStatus::Error);
        assert_eq!(envelope.details, json!({ "message": "no such user" }));
    }

    #[tokio::test]
    async fn empty_body_has_null_details() {
        let router = enveloped(Router::new().route("/", get(|| async {})));
        let (status, envelope) = call(router, Some("abc")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(envelope.details, Value::Null);
    }

    #[test]
    fn envelope_serializes_with_wire_names() {
        let envelope = ResponseEnvelope {
            request_id: "abc".to_string(),
            status: EnvelopeStatus::Success,
            details: json!(1),
        };
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({ "requestId": "abc", "status": "SUCCESS", "details": 1 })
        );
    }

    #[tokio::test]
    async fn panic_response_carries_the_panic_text() {
        let response = panic_response(Box::new("this handler panics"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "message": "this handler panics" }));
    }
}
