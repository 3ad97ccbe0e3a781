//! # Mock Errors
//!
//! Registration errors raised while compiling interactions into routes, and
//! the error formatter that turns every failure inside the mock into a
//! structured 500 response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use replay_core::UnsupportedMethod;
use replay_schema::{SchemaValidationError, Violation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An interaction that cannot be turned into a mock route.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Method other than GET or POST.
    #[error(transparent)]
    UnsupportedMethod(#[from] UnsupportedMethod),

    /// Path the router cannot register literally.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// Path as recorded.
        path: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Status code outside 100..=999.
    #[error("invalid response status {0}")]
    InvalidStatus(i64),

    /// Header name or value that HTTP cannot carry.
    #[error("invalid response header '{name}': {reason}")]
    InvalidHeader {
        /// Header name as recorded.
        name: String,
        /// Parser message.
        reason: String,
    },
}

/// Failure while serving a request through the mock.
#[derive(Error, Debug)]
pub enum MockError {
    /// Request or response does not conform to the interface document.
    #[error(transparent)]
    Validation(#[from] SchemaValidationError),

    /// The request body declares a media type it does not contain.
    #[error("malformed {content_type} request body: {reason}")]
    MalformedBody {
        /// Declared content type.
        content_type: String,
        /// Parser message.
        reason: String,
    },

    /// The request conforms but no interaction was registered for it.
    #[error("no interaction registered for {method} {path}")]
    Unmatched {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
    },

    /// A body could not be buffered.
    #[error("cannot buffer {what} body: {reason}")]
    Body {
        /// `request` or `response`.
        what: &'static str,
        /// Underlying message.
        reason: String,
    },
}

impl MockError {
    /// Structured violations, empty for non-validation failures.
    pub fn violations(&self) -> Vec<Violation> {
        match self {
            Self::Validation(e) => e.violations().as_slice().to_vec(),
            Self::MalformedBody { .. } | Self::Unmatched { .. } | Self::Body { .. } => Vec::new(),
        }
    }
}

/// JSON body of every error response produced by the mock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable summary.
    pub message: String,
    /// Structured violations, possibly empty.
    #[serde(default)]
    pub errors: Vec<Violation>,
}

impl From<&MockError> for ErrorBody {
    fn from(error: &MockError) -> Self {
        Self {
            message: error.to_string(),
            errors: error.violations(),
        }
    }
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        tracing::error!("{self}");
        let body = ErrorBody::from(&self);
        (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
    }
}
