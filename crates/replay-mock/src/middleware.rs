//! # Validation Middleware
//!
//! Wraps the compiled mock routes: parses the request body, validates the
//! request against the interface document, runs the route, then validates the
//! canned response on its way out. Any failure is returned as a [`MockError`]
//! and rendered by its formatter.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::{to_bytes, Body, Bytes};
use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use replay_schema::{InboundRequest, OpenApiValidator, OutboundResponse};
use serde_json::{Map, Value};

use crate::compiler::MockReply;
use crate::error::MockError;

/// State shared by every invocation of [`validate_exchange`].
#[derive(Debug, Clone)]
pub struct ValidationState {
    validator: Arc<OpenApiValidator>,
    body_limit: usize,
}

impl ValidationState {
    /// Validate against `validator`, buffering at most `body_limit` bytes
    /// of each request and response body.
    pub fn new(validator: Arc<OpenApiValidator>, body_limit: usize) -> Self {
        Self {
            validator,
            body_limit,
        }
    }
}

/// Request/response validation around every route, including the fallback.
///
/// Only responses carrying a [`MockReply`] marker are validated outbound; the
/// router's own 405 answers and the fallback's errors pass through untouched.
pub async fn validate_exchange(
    State(state): State<ValidationState>,
    request: Request,
    next: Next,
) -> Result<Response, MockError> {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, state.body_limit)
        .await
        .map_err(|e| MockError::Body {
            what: "request",
            reason: e.to_string(),
        })?;

    let headers = flatten_headers(&parts.headers);
    let inbound = InboundRequest {
        method: parts.method.as_str().to_string(),
        path: parts.uri.path().to_string(),
        query: parts.uri.query().map(str::to_string),
        body: parse_body(headers.get("content-type").map(String::as_str), &bytes)?,
        headers,
    };
    let operation = state.validator.validate_request(&inbound)?;
    tracing::debug!(
        method = %inbound.method,
        path = %inbound.path,
        operation = %operation.path_template(),
        "request conforms"
    );

    let response = next
        .run(Request::from_parts(parts, Body::from(bytes)))
        .await;
    if response.extensions().get::<MockReply>().is_none() {
        return Ok(response);
    }

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, state.body_limit)
        .await
        .map_err(|e| MockError::Body {
            what: "response",
            reason: e.to_string(),
        })?;
    let outbound = OutboundResponse {
        status: parts.status.as_u16(),
        content_type: parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: decode_response_body(&bytes)?,
    };
    state.validator.validate_response(operation, &outbound)?;

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

/// Headers keyed by lower-case name; repeated headers are joined with `", "`.
fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    flat
}

/// Parse a request body according to its declared media type.
///
/// JSON media types must parse. Form bodies become an object of strings
/// (arrays for repeated keys). Text and unknown media types become a string.
/// Without a content type, JSON is tried first.
fn parse_body(content_type: Option<&str>, bytes: &Bytes) -> Result<Option<Value>, MockError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    let lossy = || Value::String(String::from_utf8_lossy(bytes).into_owned());

    let Some(declared) = content_type else {
        return Ok(Some(serde_json::from_slice(bytes).unwrap_or_else(|_| lossy())));
    };
    let essence = declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence == "application/json" || essence.ends_with("+json") {
        serde_json::from_slice(bytes)
            .map(Some)
            .map_err(|e| MockError::MalformedBody {
                content_type: declared.to_string(),
                reason: e.to_string(),
            })
    } else if essence == "application/x-www-form-urlencoded" {
        Ok(Some(parse_form(bytes)))
    } else {
        Ok(Some(lossy()))
    }
}

fn parse_form(bytes: &[u8]) -> Value {
    let mut fields = Map::new();
    for (key, value) in url::form_urlencoded::parse(bytes).into_owned() {
        match fields.get_mut(&key) {
            Some(Value::Array(values)) => values.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
            None => {
                fields.insert(key, Value::String(value));
            }
        }
    }
    Value::Object(fields)
}

/// Mock routes always emit JSON.
fn decode_response_body(bytes: &Bytes) -> Result<Option<Value>, MockError> {
    if bytes.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(bytes)
        .map(Some)
        .map_err(|e| MockError::Body {
            what: "response",
            reason: e.to_string(),
        })
}
