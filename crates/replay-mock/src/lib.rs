//! # replay-mock — Schema-Validating Mock Provider
//!
//! Compiles contract interactions into axum routes and serves them behind
//! OpenAPI request/response validation.
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → validate_exchange → mock route | fallback
//! ```
//!
//! Every failure inside the stack surfaces as a [`MockError`] and is rendered
//! as HTTP 500 with a `{ message, errors }` body.
//!
//! ## Crate Policy
//!
//! - Routes are compiled once, before the socket is bound, and never change.
//! - Routing keys on (method, path) only; query strings and bodies are
//!   validated but do not select routes.

pub mod compiler;
pub mod error;
pub mod middleware;
pub mod server;

use std::sync::Arc;

use axum::http::{Method, Uri};
use axum::middleware::from_fn_with_state;
use axum::Router;
use replay_schema::OpenApiValidator;
use tower_http::trace::TraceLayer;

pub use compiler::{
    compile, compile_interaction, CompiledRoutes, MockReply, MockResponse, MockRoute,
    RejectedInteraction, ShadowedRoute,
};
pub use error::{ErrorBody, MockError, RegistrationError};
pub use middleware::ValidationState;
pub use server::{MockServer, ServerConfig, ServerError};

/// Assemble the mock application: compiled routes, fallback, validation
/// and tracing.
pub fn app(routes: &CompiledRoutes, validator: Arc<OpenApiValidator>, config: &ServerConfig) -> Router {
    let state = ValidationState::new(validator, config.body_limit);
    routes
        .router()
        .fallback(unmatched)
        .layer(from_fn_with_state(state, middleware::validate_exchange))
        .layer(TraceLayer::new_for_http())
}

async fn unmatched(method: Method, uri: Uri) -> MockError {
    MockError::Unmatched {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}
