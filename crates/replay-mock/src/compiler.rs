//! # Mock Route Compiler
//!
//! Turns each contract interaction into a route that answers with the
//! interaction's recorded response.
//!
//! Compilation is a single synchronous pass over the registry, in fixture
//! order, done before the server binds its socket. Routes are keyed purely on
//! (method, encoded path): when two interactions share a key, the later one
//! replaces the earlier one and the replacement is recorded in
//! [`CompiledRoutes::shadowed`]. Interactions that cannot be registered are
//! collected in [`CompiledRoutes::rejected`] without stopping the others.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use axum::{Json, Router};
use replay_core::{Interaction, InteractionRegistry, ReplayMethod};
use serde_json::Value;

use crate::error::RegistrationError;

/// Marker placed on every response produced by a mock route.
///
/// Lets the validation middleware tell canned responses apart from the
/// router's own 404/405 answers, which are not part of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockReply {
    /// Registry index of the interaction that answered.
    pub index: usize,
}

/// The canned response of one interaction, ready to be served.
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl MockResponse {
    /// Build from an interaction's recorded response.
    ///
    /// A missing status becomes 500 and a missing body becomes `{}`. Recorded
    /// framing headers are dropped so the served body's own length wins.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::InvalidStatus`] or
    /// [`RegistrationError::InvalidHeader`] if the recording cannot be
    /// expressed as an HTTP response.
    pub fn from_interaction(interaction: &Interaction) -> Result<Self, RegistrationError> {
        let recorded = &interaction.response;
        let status_code = recorded.status_or_default();
        let status = u16::try_from(status_code)
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or(RegistrationError::InvalidStatus(status_code))?;

        let mut headers = HeaderMap::new();
        for (name, value) in recorded.replayable_headers() {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| RegistrationError::InvalidHeader {
                    name: name.to_string(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| RegistrationError::InvalidHeader {
                    name: name.to_string(),
                    reason: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }

        Ok(Self {
            status,
            headers,
            body: recorded.body_or_default(),
        })
    }

    /// Status the route answers with.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Body the route answers with.
    pub fn body(&self) -> &Value {
        &self.body
    }

    fn render(&self) -> Response {
        let mut response = (self.status, Json(&self.body)).into_response();
        // Recorded headers win, including a recorded Content-Type.
        for (name, value) in &self.headers {
            response.headers_mut().insert(name.clone(), value.clone());
        }
        if !response.headers().contains_key(CONTENT_TYPE) {
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        response
    }
}

/// One registered (method, path) route.
#[derive(Debug, Clone)]
pub struct MockRoute {
    /// Registry index of the interaction that owns the route.
    pub index: usize,
    /// Description of that interaction.
    pub description: String,
    /// Route method.
    pub method: ReplayMethod,
    /// Percent-encoded route path.
    pub path: String,
    response: Arc<MockResponse>,
}

impl MockRoute {
    /// The canned response served by this route.
    pub fn response(&self) -> &MockResponse {
        &self.response
    }

    fn attach(&self, router: MethodRouter) -> MethodRouter {
        let response = Arc::clone(&self.response);
        let reply = MockReply { index: self.index };
        let handler = move || {
            let response = Arc::clone(&response);
            async move {
                let mut rendered = response.render();
                rendered.extensions_mut().insert(reply);
                rendered
            }
        };
        match self.method {
            ReplayMethod::Get => router.get(handler),
            ReplayMethod::Post => router.post(handler),
        }
    }
}

/// A route replaced by a later interaction with the same (method, path).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowedRoute {
    /// Route method.
    pub method: ReplayMethod,
    /// Percent-encoded route path.
    pub path: String,
    /// Index of the interaction whose route was replaced.
    pub shadowed: usize,
    /// Index of the interaction that now owns the route.
    pub by: usize,
}

/// An interaction that could not be registered.
#[derive(Debug)]
pub struct RejectedInteraction {
    /// Registry index.
    pub index: usize,
    /// Interaction description.
    pub description: String,
    /// Why registration failed.
    pub error: RegistrationError,
}

/// Result of compiling a registry into routes.
#[derive(Debug, Default)]
pub struct CompiledRoutes {
    routes: Vec<MockRoute>,
    shadowed: Vec<ShadowedRoute>,
    rejected: Vec<RejectedInteraction>,
}

impl CompiledRoutes {
    /// Live routes, in the order their keys were first registered.
    pub fn routes(&self) -> &[MockRoute] {
        &self.routes
    }

    /// Routes replaced by later duplicates, in registration order.
    pub fn shadowed(&self) -> &[ShadowedRoute] {
        &self.shadowed
    }

    /// Interactions that failed to register, in registry order.
    pub fn rejected(&self) -> &[RejectedInteraction] {
        &self.rejected
    }

    /// The registration error for the interaction at `index`, if any.
    pub fn rejection(&self, index: usize) -> Option<&RegistrationError> {
        self.rejected
            .iter()
            .find(|r| r.index == index)
            .map(|r| &r.error)
    }

    /// The live route for (method, encoded path), if any.
    pub fn route(&self, method: ReplayMethod, path: &str) -> Option<&MockRoute> {
        self.routes
            .iter()
            .find(|r| r.method == method && r.path == path)
    }

    /// Number of live routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True if nothing registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Build an axum router with one method-exact route per (method, path).
    pub fn router(&self) -> Router {
        let mut by_path: BTreeMap<&str, MethodRouter> = BTreeMap::new();
        for route in &self.routes {
            let methods = by_path.remove(route.path.as_str()).unwrap_or_default();
            by_path.insert(route.path.as_str(), route.attach(methods));
        }
        by_path
            .into_iter()
            .fold(Router::new(), |router, (path, methods)| router.route(path, methods))
    }

    fn register(&mut self, route: MockRoute) {
        match self
            .routes
            .iter_mut()
            .find(|r| r.method == route.method && r.path == route.path)
        {
            Some(existing) => {
                tracing::warn!(
                    method = %route.method,
                    path = %route.path,
                    shadowed = %existing.description,
                    by = %route.description,
                    "duplicate route: later interaction replaces earlier one"
                );
                self.shadowed.push(ShadowedRoute {
                    method: route.method,
                    path: route.path.clone(),
                    shadowed: existing.index,
                    by: route.index,
                });
                *existing = route;
            }
            None => self.routes.push(route),
        }
    }
}

/// Compile a single interaction into a route.
///
/// # Errors
///
/// Returns a [`RegistrationError`] for an unsupported method, a path the
/// router cannot express, or an unrepresentable response.
pub fn compile_interaction(
    index: usize,
    interaction: &Interaction,
) -> Result<MockRoute, RegistrationError> {
    let method = interaction.request.replay_method()?;

    let raw_path = &interaction.request.path;
    if !raw_path.starts_with('/') {
        return Err(RegistrationError::InvalidPath {
            path: raw_path.clone(),
            reason: "path must start with '/'".to_string(),
        });
    }
    let path = interaction.request.encoded_path();
    if let Some(segment) = path
        .split('/')
        .find(|s| s.starts_with(':') || s.starts_with('*'))
    {
        return Err(RegistrationError::InvalidPath {
            path: raw_path.clone(),
            reason: format!("segment '{segment}' would be read as a route wildcard"),
        });
    }

    let response = MockResponse::from_interaction(interaction)?;

    Ok(MockRoute {
        index,
        description: interaction.description.clone(),
        method,
        path,
        response: Arc::new(response),
    })
}

/// Compile every interaction of the registry, in registry order.
pub fn compile(registry: &InteractionRegistry) -> CompiledRoutes {
    let mut compiled = CompiledRoutes::default();
    for (index, interaction) in registry.iter().enumerate() {
        tracing::info!("Mocking interaction: {interaction}");
        match compile_interaction(index, interaction) {
            Ok(route) => {
                tracing::debug!(method = %route.method, path = %route.path, "registered mock route");
                compiled.register(route);
            }
            Err(error) => {
                tracing::error!(
                    description = %interaction.description,
                    method = %interaction.request.method,
                    path = %interaction.request.path,
                    "cannot register interaction: {error}"
                );
                compiled.rejected.push(RejectedInteraction {
                    index,
                    description: interaction.description.clone(),
                    error,
                });
            }
        }
    }
    compiled
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{CONNECTION, CONTENT_LENGTH, TRANSFER_ENCODING};
    use serde_json::json;

    fn registry(interactions: Value) -> InteractionRegistry {
        InteractionRegistry::from_value(interactions).unwrap()
    }

    #[test]
    fn compiles_get_route_with_recorded_response() {
        let compiled = compile(&registry(json!([{
            "description": "get widget",
            "providerState": "widget exists",
            "request": {"method": "GET", "path": "/widgets/1"},
            "response": {"status": 200, "body": {"id": 1, "name": "bolt"}}
        }])));
        assert_eq!(compiled.len(), 1);
        let route = compiled.route(ReplayMethod::Get, "/widgets/1").unwrap();
        assert_eq!(route.response().status(), StatusCode::OK);
        assert_eq!(route.response().body(), &json!({"id": 1, "name": "bolt"}));
    }

    #[test]
    fn missing_status_and_body_default() {
        let compiled = compile(&registry(json!([{
            "description": "bare",
            "providerState": "s",
            "request": {"method": "POST", "path": "/bare"}
        }])));
        let route = compiled.route(ReplayMethod::Post, "/bare").unwrap();
        assert_eq!(route.response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(route.response().body(), &json!({}));
    }

    #[test]
    fn duplicate_route_last_registration_wins() {
        let compiled = compile(&registry(json!([
            {"description": "first", "providerState": "s",
             "request": {"method": "GET", "path": "/dup"}, "response": {"status": 200, "body": {"v": 1}}},
            {"description": "other", "providerState": "s",
             "request": {"method": "POST", "path": "/dup"}, "response": {"status": 201}},
            {"description": "second", "providerState": "s",
             "request": {"method": "GET", "path": "/dup"}, "response": {"status": 202, "body": {"v": 2}}}
        ])));
        assert_eq!(compiled.len(), 2);
        let route = compiled.route(ReplayMethod::Get, "/dup").unwrap();
        assert_eq!(route.description, "second");
        assert_eq!(route.response().body(), &json!({"v": 2}));
        assert_eq!(
            compiled.shadowed(),
            &[ShadowedRoute {
                method: ReplayMethod::Get,
                path: "/dup".into(),
                shadowed: 0,
                by: 2,
            }]
        );
    }

    #[test]
    fn unsupported_method_is_rejected_but_others_register() {
        let compiled = compile(&registry(json!([
            {"description": "delete", "providerState": "s", "request": {"method": "DELETE", "path": "/w/1"}},
            {"description": "get", "providerState": "s", "request": {"method": "GET", "path": "/w/1"}}
        ])));
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled.rejected().len(), 1);
        assert!(matches!(
            compiled.rejection(0),
            Some(RegistrationError::UnsupportedMethod(_))
        ));
        assert!(compiled.rejection(1).is_none());
    }

    #[test]
    fn invalid_paths_statuses_and_headers_are_rejected() {
        let compiled = compile(&registry(json!([
            {"description": "relative", "providerState": "s", "request": {"method": "GET", "path": "w"}},
            {"description": "colon", "providerState": "s", "request": {"method": "GET", "path": "/w/:id"}},
            {"description": "status", "providerState": "s",
             "request": {"method": "GET", "path": "/s"}, "response": {"status": 42}},
            {"description": "header", "providerState": "s",
             "request": {"method": "GET", "path": "/h"}, "response": {"status": 200, "headers": {"bad name": "x"}}}
        ])));
        assert!(compiled.is_empty());
        let kinds: Vec<&RegistrationError> = compiled.rejected().iter().map(|r| &r.error).collect();
        assert!(matches!(kinds[0], RegistrationError::InvalidPath { .. }));
        assert!(matches!(kinds[1], RegistrationError::InvalidPath { .. }));
        assert!(matches!(kinds[2], RegistrationError::InvalidStatus(42)));
        assert!(matches!(kinds[3], RegistrationError::InvalidHeader { .. }));
    }

    #[test]
    fn recorded_content_type_is_kept() {
        let compiled = compile(&registry(json!([{
            "description": "problem",
            "providerState": "s",
            "request": {"method": "GET", "path": "/p"},
            "response": {"status": 404, "headers": {"Content-Type": "application/problem+json"}, "body": {"title": "x"}}
        }])));
        let rendered = compiled.routes()[0].response().render();
        assert_eq!(rendered.headers()[CONTENT_TYPE], "application/problem+json");
        assert_eq!(rendered.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn out_of_range_statuses_are_rejected_locally() {
        let compiled = compile(&registry(json!([
            {"description": "huge", "providerState": "s",
             "request": {"method": "GET", "path": "/a"}, "response": {"status": 70000}},
            {"description": "negative", "providerState": "s",
             "request": {"method": "GET", "path": "/b"}, "response": {"status": -1}},
            {"description": "fine", "providerState": "s",
             "request": {"method": "GET", "path": "/c"}, "response": {"status": 200}}
        ])));
        assert_eq!(compiled.len(), 1);
        assert!(matches!(compiled.rejection(0), Some(RegistrationError::InvalidStatus(70000))));
        assert!(matches!(compiled.rejection(1), Some(RegistrationError::InvalidStatus(-1))));
    }

    #[test]
    fn recorded_content_length_is_not_served() {
        let compiled = compile(&registry(json!([{
            "description": "get widget",
            "providerState": "s",
            "request": {"method": "GET", "path": "/widgets/1"},
            "response": {
                "status": 200,
                "headers": {"Content-Type": "application/json", "Content-Length": "64",
                            "Transfer-Encoding": "chunked", "Connection": "close"},
                "body": {"id": 1, "name": "bolt"}
            }
        }])));
        let rendered = compiled.routes()[0].response().render();
        assert!(rendered.headers().get(CONTENT_LENGTH).is_none());
        assert!(rendered.headers().get(TRANSFER_ENCODING).is_none());
        assert!(rendered.headers().get(CONNECTION).is_none());
        assert_eq!(rendered.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn paths_are_registered_encoded() {
        let compiled = compile(&registry(json!([{
            "description": "space", "providerState": "s",
            "request": {"method": "GET", "path": "/items/a b"}
        }])));
        assert!(compiled.route(ReplayMethod::Get, "/items/a%20b").is_some());
    }
}
