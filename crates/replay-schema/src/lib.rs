//! # replay-schema — OpenAPI Validation
//!
//! Wraps the provider's OpenAPI 3.x interface document and exposes two
//! capabilities: validate an inbound request, validate an outbound response.
//!
//! ## Modules
//!
//! - [`validate`] — [`OpenApiValidator`], its inputs, and the structured
//!   [`SchemaValidationError`] / [`Violation`] types.
//! - [`path`] — OpenAPI path template matching.
//! - `document` — document loading, local `$ref` resolution and schema
//!   compilation via the `jsonschema` crate.
//!
//! ## Crate Policy
//!
//! - Has no state beyond the compiled document.
//! - Never performs network access: remote `$ref`s fail at load time.
//! - Independent of any HTTP framework; callers translate their request and
//!   response types into [`InboundRequest`] / [`OutboundResponse`].

mod document;
pub mod path;
pub mod validate;

pub use document::OpenApiVersion;
pub use validate::{
    InboundRequest, MatchedOperation, OpenApiValidator, OutboundResponse, SchemaLoadError,
    SchemaValidationError, ValidationViolations, Violation,
};
