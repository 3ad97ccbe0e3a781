//! # Request/Response Validation
//!
//! [`OpenApiValidator`] checks inbound requests and outbound responses
//! against an OpenAPI document.
//!
//! ## Trust Boundary
//!
//! Validation is the whole point of the harness: a request the document does
//! not describe, or a canned response that does not conform, is rejected with
//! a structured list of [`Violation`]s rather than passed through. The
//! validator never mutates what it inspects and never logs.
//!
//! All schemas are compiled once at load time; validating is then a lookup
//! plus a `jsonschema` evaluation.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use jsonschema::Validator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::document::{OpenApiDocument, OpenApiVersion};
use crate::path::PathTemplate;

const HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Header parameters OpenAPI says to ignore when declared.
const IGNORED_HEADER_PARAMS: [&str; 3] = ["accept", "content-type", "authorization"];

// -- Errors -------------------------------------------------------------------

/// Error while loading the OpenAPI document or compiling its schemas.
#[derive(Error, Debug)]
pub enum SchemaLoadError {
    /// The document file could not be read.
    #[error("cannot read schema document '{path}': {source}")]
    Io {
        /// Document path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The document is not valid JSON/YAML.
    #[error("cannot parse schema document '{path}': {reason}")]
    Parse {
        /// Document path.
        path: String,
        /// Parser message.
        reason: String,
    },

    /// Not an OpenAPI 3.0/3.1 document.
    #[error("unsupported document version: {0} (expected OpenAPI 3.0.x or 3.1.x)")]
    UnsupportedVersion(String),

    /// Structurally not an OpenAPI document.
    #[error("invalid OpenAPI document: {0}")]
    InvalidDocument(String),

    /// A local `$ref` points nowhere.
    #[error("unresolved reference: {0}")]
    UnresolvedRef(String),

    /// An embedded schema could not be compiled.
    #[error("cannot compile schema at {location}: {reason}")]
    ValidatorBuild {
        /// Where in the document the schema lives.
        location: String,
        /// Compiler message.
        reason: String,
    },
}

/// A request or response that does not conform to the document.
#[derive(Error, Debug, Clone)]
pub enum SchemaValidationError {
    /// No path template matches the request path.
    #[error("not found: no route declared for {method} {path}")]
    RouteNotFound {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
        /// Always a single violation naming the path.
        violations: ValidationViolations,
    },

    /// The path is declared but not for this method.
    #[error("method not allowed: {method} is not declared for {path}")]
    MethodNotAllowed {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
        /// Always a single violation naming the method.
        violations: ValidationViolations,
    },

    /// The request violates the operation's parameters or body schema.
    #[error("request validation failed for {method} {path}:\n{violations}")]
    RequestInvalid {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
        /// Individual violations.
        violations: ValidationViolations,
    },

    /// The response violates the operation's declared responses.
    #[error("response validation failed for {method} {path} (status {status}):\n{violations}")]
    ResponseInvalid {
        /// Method of the request being answered.
        method: String,
        /// Path template of the operation.
        path: String,
        /// Response status.
        status: u16,
        /// Individual violations.
        violations: ValidationViolations,
    },
}

impl SchemaValidationError {
    /// The structured violations carried by any variant.
    pub fn violations(&self) -> &ValidationViolations {
        match self {
            Self::RouteNotFound { violations, .. }
            | Self::MethodNotAllowed { violations, .. }
            | Self::RequestInvalid { violations, .. }
            | Self::ResponseInvalid { violations, .. } => violations,
        }
    }
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Location of the offending value, e.g. `/body/name` or `/query/limit`.
    pub path: String,
    /// Human-readable description.
    pub message: String,
    /// Pointer into the schema that triggered the violation, when known.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub schema_path: String,
}

impl Violation {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            schema_path: String::new(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  {}: {}", self.path, self.message)
    }
}

/// Every violation found in one request or response, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    fn single(violation: Violation) -> Self {
        Self {
            violations: vec![violation],
        }
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn as_slice(&self) -> &[Violation] {
        &self.violations
    }

    /// Pointer-style locations (`/body/name`, `/query/limit`, ...) of each violation.
    pub fn paths(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.path.as_str()).collect()
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

// -- Inputs -------------------------------------------------------------------

/// The parts of an inbound HTTP request the validator inspects.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    /// Method, any case.
    pub method: String,
    /// Raw request path, without query.
    pub path: String,
    /// Encoded query string without `?`.
    pub query: Option<String>,
    /// Headers keyed by lower-case name.
    pub headers: BTreeMap<String, String>,
    /// Parsed body; `None` when the request had no body.
    pub body: Option<Value>,
}

impl InboundRequest {
    fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }
}

/// The parts of an outbound response the validator inspects.
#[derive(Debug, Clone, Default)]
pub struct OutboundResponse {
    /// Status code.
    pub status: u16,
    /// `Content-Type` header value, if any.
    pub content_type: Option<String>,
    /// Parsed body; `None` when the response is empty.
    pub body: Option<Value>,
}

// -- Compiled document --------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "headers",
            Self::Cookie => "cookies",
        }
    }
}

/// How a string parameter value is coerced before schema evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ParamKind {
    Integer,
    Number,
    Boolean,
    Array(Box<ParamKind>),
    Text,
}

impl ParamKind {
    fn of(schema: &Value, doc: &OpenApiDocument) -> Self {
        let Ok(schema) = doc.resolve(schema) else {
            return Self::Text;
        };
        let ty = match schema.get("type") {
            Some(Value::String(t)) => Some(t.as_str()),
            Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).find(|t| *t != "null"),
            _ => None,
        };
        match ty {
            Some("integer") => Self::Integer,
            Some("number") => Self::Number,
            Some("boolean") => Self::Boolean,
            Some("array") => Self::Array(Box::new(
                schema
                    .get("items")
                    .map(|items| Self::of(items, doc))
                    .unwrap_or(Self::Text),
            )),
            _ => Self::Text,
        }
    }

    fn coerce(&self, values: &[String]) -> Value {
        match self {
            Self::Array(item) => {
                let parts: Vec<String> = if values.len() == 1 {
                    values[0].split(',').map(str::to_string).collect()
                } else {
                    values.to_vec()
                };
                Value::Array(parts.iter().map(|p| item.coerce_one(p)).collect())
            }
            _ => values
                .first()
                .map(|v| self.coerce_one(v))
                .unwrap_or(Value::Null),
        }
    }

    fn coerce_one(&self, raw: &str) -> Value {
        let coerced = match self {
            Self::Integer => raw.parse::<i64>().ok().map(Value::from),
            Self::Number => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            Self::Boolean => match raw {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            Self::Array(_) | Self::Text => None,
        };
        coerced.unwrap_or_else(|| Value::String(raw.to_string()))
    }
}

struct Parameter {
    name: String,
    location: ParamLocation,
    required: bool,
    kind: ParamKind,
    validator: Option<Validator>,
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("location", &self.location)
            .field("required", &self.required)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Media types of a body with their compiled schemas.
#[derive(Default)]
struct Content {
    media: Vec<(String, Option<Validator>)>,
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.media.iter().map(|(media_type, _)| media_type))
            .finish()
    }
}

impl Content {
    /// Pick the declared media range for `content_type`: exact, then
    /// `type/*`, then `*/*`. Without a content type, JSON is assumed.
    fn select(&self, content_type: Option<&str>) -> Option<&(String, Option<Validator>)> {
        let essence = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_else(|| "application/json".to_string());
        let wildcard = essence
            .split('/')
            .next()
            .map(|major| format!("{major}/*"))
            .unwrap_or_default();
        self.media
            .iter()
            .find(|(m, _)| *m == essence)
            .or_else(|| self.media.iter().find(|(m, _)| *m == wildcard))
            .or_else(|| self.media.iter().find(|(m, _)| m == "*/*"))
    }
}

#[derive(Debug)]
struct RequestBody {
    required: bool,
    content: Content,
}

#[derive(Debug)]
struct ResponseSpec {
    key: String,
    content: Content,
}

#[derive(Debug)]
struct Operation {
    method: String,
    parameters: Vec<Parameter>,
    body: Option<RequestBody>,
    responses: Vec<ResponseSpec>,
}

#[derive(Debug)]
struct Route {
    template: PathTemplate,
    operations: BTreeMap<String, Operation>,
}

/// Handle to the operation a request matched; feed it back into
/// [`OpenApiValidator::validate_response`].
#[derive(Debug, Clone, Copy)]
pub struct MatchedOperation<'a> {
    route: &'a Route,
    operation: &'a Operation,
}

impl MatchedOperation<'_> {
    /// Upper-case method of the operation.
    pub fn method(&self) -> &str {
        &self.operation.method
    }

    /// Path template the request matched.
    pub fn path_template(&self) -> &str {
        self.route.template.as_str()
    }
}

/// An OpenAPI 3.x document compiled for request and response validation.
///
/// ## Thread Safety
///
/// `OpenApiValidator` is `Send + Sync`; share it behind an `Arc`.
#[derive(Debug)]
pub struct OpenApiValidator {
    title: Option<String>,
    version: OpenApiVersion,
    base_path: String,
    routes: Vec<Route>,
}

impl OpenApiValidator {
    /// Load and compile a document from a JSON or YAML file.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaLoadError`] if the file cannot be read or parsed, is
    /// not OpenAPI 3.0/3.1, or contains a schema that does not compile.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaLoadError> {
        let path = path.as_ref();
        let validator = Self::compile(OpenApiDocument::from_path(path)?)?;
        tracing::debug!(
            path = %path.display(),
            routes = validator.routes.len(),
            "compiled schema document"
        );
        Ok(validator)
    }

    /// Compile an already-parsed document.
    ///
    /// # Errors
    ///
    /// See [`OpenApiValidator::from_path`].
    pub fn from_value(document: Value) -> Result<Self, SchemaLoadError> {
        Self::compile(OpenApiDocument::from_value(document)?)
    }

    fn compile(doc: OpenApiDocument) -> Result<Self, SchemaLoadError> {
        let title = doc
            .root()
            .pointer("/info/title")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut routes = Vec::new();
        if let Some(paths) = doc.root().get("paths").and_then(Value::as_object) {
            for (raw_path, item) in paths {
                let item = doc.resolve(item)?;
                let template = PathTemplate::parse(raw_path);
                let shared_params = item.get("parameters");

                let mut operations = BTreeMap::new();
                for method in HTTP_METHODS {
                    let Some(op) = item.get(method) else {
                        continue;
                    };
                    let upper = method.to_ascii_uppercase();
                    let location = format!("{upper} {raw_path}");
                    let operation = compile_operation(&doc, &upper, &location, shared_params, op)?;
                    operations.insert(upper, operation);
                }
                routes.push(Route {
                    template,
                    operations,
                });
            }
        }
        // Stable: document order breaks ties between equally specific templates.
        routes.sort_by_key(|r| std::cmp::Reverse(r.template.specificity()));

        Ok(Self {
            title,
            version: doc.version(),
            base_path: doc.base_path().to_string(),
            routes,
        })
    }

    /// Document title from `info.title`.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// OpenAPI line the document declares.
    pub fn version(&self) -> OpenApiVersion {
        self.version
    }

    /// Number of declared (method, path template) operations.
    pub fn operation_count(&self) -> usize {
        self.routes.iter().map(|r| r.operations.len()).sum()
    }

    /// Validate an inbound request.
    ///
    /// On success returns the matched operation, which is needed to validate
    /// the response to this request.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaValidationError::RouteNotFound`],
    /// [`SchemaValidationError::MethodNotAllowed`] or
    /// [`SchemaValidationError::RequestInvalid`].
    pub fn validate_request(
        &self,
        request: &InboundRequest,
    ) -> Result<MatchedOperation<'_>, SchemaValidationError> {
        let method = request.method.to_ascii_uppercase();
        let not_found = || SchemaValidationError::RouteNotFound {
            method: method.clone(),
            path: request.path.clone(),
            violations: ValidationViolations::single(Violation::new(
                request.path.clone(),
                "not found",
            )),
        };

        let relative = if self.base_path.is_empty() {
            request.path.as_str()
        } else {
            match request.path.strip_prefix(self.base_path.as_str()) {
                Some("") => "/",
                Some(rest) if rest.starts_with('/') => rest,
                _ => return Err(not_found()),
            }
        };

        let mut path_matched = false;
        let mut matched = None;
        for route in &self.routes {
            if let Some(captures) = route.template.matches(relative) {
                path_matched = true;
                if let Some(op) = route.operations.get(&method) {
                    matched = Some((route, op, captures));
                    break;
                }
            }
        }
        let Some((route, operation, captures)) = matched else {
            if path_matched {
                return Err(SchemaValidationError::MethodNotAllowed {
                    method: method.clone(),
                    path: request.path.clone(),
                    violations: ValidationViolations::single(Violation::new(
                        "/method",
                        format!("{method} method not allowed"),
                    )),
                });
            }
            return Err(not_found());
        };

        let mut violations = Vec::new();
        check_parameters(operation, request, &captures, &mut violations);
        check_request_body(operation, request, &mut violations);

        if violations.is_empty() {
            Ok(MatchedOperation { route, operation })
        } else {
            Err(SchemaValidationError::RequestInvalid {
                method,
                path: request.path.clone(),
                violations: ValidationViolations { violations },
            })
        }
    }

    /// Validate the response produced for a request that matched `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaValidationError::ResponseInvalid`] when the status is
    /// not declared or the body does not conform.
    pub fn validate_response(
        &self,
        operation: MatchedOperation<'_>,
        response: &OutboundResponse,
    ) -> Result<(), SchemaValidationError> {
        let fail = |violation: Vec<Violation>| SchemaValidationError::ResponseInvalid {
            method: operation.method().to_string(),
            path: operation.path_template().to_string(),
            status: response.status,
            violations: ValidationViolations {
                violations: violation,
            },
        };

        let Some(spec) = response_for(operation.operation, response.status) else {
            return Err(fail(vec![Violation::new(
                "/response",
                format!("no response declared for status {}", response.status),
            )]));
        };

        if spec.content.media.is_empty() {
            return Ok(());
        }
        let Some(body) = &response.body else {
            return Ok(());
        };
        match spec.content.select(response.content_type.as_deref()) {
            Some((_, Some(validator))) => {
                let violations = collect(validator, body, "/response");
                if violations.is_empty() {
                    Ok(())
                } else {
                    Err(fail(violations))
                }
            }
            Some((_, None)) => Ok(()),
            None => Err(fail(vec![Violation::new(
                "/response/headers/content-type",
                format!(
                    "unsupported media type {} for status {}",
                    response.content_type.as_deref().unwrap_or("(none)"),
                    spec.key
                ),
            )])),
        }
    }
}

fn response_for(operation: &Operation, status: u16) -> Option<&ResponseSpec> {
    let exact = status.to_string();
    let range = format!("{}XX", status / 100);
    operation
        .responses
        .iter()
        .find(|r| r.key == exact)
        .or_else(|| {
            operation
                .responses
                .iter()
                .find(|r| r.key.eq_ignore_ascii_case(&range))
        })
        .or_else(|| operation.responses.iter().find(|r| r.key == "default"))
}

// -- Checks -------------------------------------------------------------------

fn collect(validator: &Validator, instance: &Value, prefix: &str) -> Vec<Violation> {
    validator
        .iter_errors(instance)
        .map(|e| Violation {
            path: format!("{prefix}{}", e.instance_path),
            message: e.to_string(),
            schema_path: e.schema_path.to_string(),
        })
        .collect()
}

fn check_parameters(
    operation: &Operation,
    request: &InboundRequest,
    captures: &[(String, String)],
    violations: &mut Vec<Violation>,
) {
    let query: Vec<(String, String)> = request
        .query
        .as_deref()
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    for param in &operation.parameters {
        let values: Vec<String> = match param.location {
            ParamLocation::Path => captures
                .iter()
                .filter(|(n, _)| *n == param.name)
                .map(|(_, v)| v.clone())
                .collect(),
            ParamLocation::Query => query
                .iter()
                .filter(|(n, _)| *n == param.name)
                .map(|(_, v)| v.clone())
                .collect(),
            ParamLocation::Header => request
                .headers
                .get(&param.name.to_ascii_lowercase())
                .cloned()
                .into_iter()
                .collect(),
            ParamLocation::Cookie => cookie(request, &param.name).into_iter().collect(),
        };

        let path = format!("/{}/{}", param.location.as_str(), param.name);
        if values.is_empty() {
            if param.required {
                violations.push(Violation::new(
                    path,
                    format!("must have required property '{}'", param.name),
                ));
            }
            continue;
        }
        if let Some(validator) = &param.validator {
            violations.extend(collect(validator, &param.kind.coerce(&values), &path));
        }
    }

    for (name, _) in &query {
        let declared = operation
            .parameters
            .iter()
            .any(|p| p.location == ParamLocation::Query && p.name == *name);
        if !declared {
            violations.push(Violation::new(
                format!("/query/{name}"),
                format!("unknown query parameter '{name}'"),
            ));
        }
    }
}

fn cookie(request: &InboundRequest, name: &str) -> Option<String> {
    request.headers.get("cookie")?.split(';').find_map(|pair| {
        let (k, v) = pair.trim().split_once('=')?;
        (k == name).then(|| v.to_string())
    })
}

fn check_request_body(
    operation: &Operation,
    request: &InboundRequest,
    violations: &mut Vec<Violation>,
) {
    let Some(spec) = &operation.body else {
        return;
    };
    let Some(body) = &request.body else {
        if spec.required {
            violations.push(Violation::new("/body", "request body is required"));
        }
        return;
    };
    match spec.content.select(request.content_type()) {
        Some((_, Some(validator))) => violations.extend(collect(validator, body, "/body")),
        Some((_, None)) => {}
        None => violations.push(Violation::new(
            "/headers/content-type",
            format!(
                "unsupported media type {}",
                request.content_type().unwrap_or("(none)")
            ),
        )),
    }
}

// -- Compilation --------------------------------------------------------------

fn compile_operation(
    doc: &OpenApiDocument,
    method: &str,
    location: &str,
    shared_params: Option<&Value>,
    op: &Value,
) -> Result<Operation, SchemaLoadError> {
    // Operation-level parameters override path-level ones with the same (name, in).
    let mut declared: Vec<&Value> = Vec::new();
    for list in [shared_params, op.get("parameters")].into_iter().flatten() {
        for raw in list.as_array().into_iter().flatten() {
            let param = doc.resolve(raw)?;
            declared.retain(|p| p.get("name") != param.get("name") || p.get("in") != param.get("in"));
            declared.push(param);
        }
    }

    let mut parameters = Vec::new();
    for param in declared {
        let name = param
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaLoadError::InvalidDocument(format!("{location}: parameter without name")))?;
        let Some(param_location) = param.get("in").and_then(Value::as_str).and_then(ParamLocation::parse)
        else {
            return Err(SchemaLoadError::InvalidDocument(format!(
                "{location}: parameter '{name}' has no valid `in`"
            )));
        };
        if param_location == ParamLocation::Header
            && IGNORED_HEADER_PARAMS.contains(&name.to_ascii_lowercase().as_str())
        {
            continue;
        }
        let required = param_location == ParamLocation::Path
            || param.get("required").and_then(Value::as_bool).unwrap_or(false);
        let (kind, validator) = match param.get("schema") {
            Some(schema) => (
                ParamKind::of(schema, doc),
                Some(doc.compile(schema, &format!("{location} parameter {name}"))?),
            ),
            None => (ParamKind::Text, None),
        };
        parameters.push(Parameter {
            name: name.to_string(),
            location: param_location,
            required,
            kind,
            validator,
        });
    }

    let body = match op.get("requestBody") {
        Some(raw) => {
            let body = doc.resolve(raw)?;
            Some(RequestBody {
                required: body.get("required").and_then(Value::as_bool).unwrap_or(false),
                content: compile_content(doc, body.get("content"), &format!("{location} requestBody"))?,
            })
        }
        None => None,
    };

    let mut responses = Vec::new();
    if let Some(map) = op.get("responses").and_then(Value::as_object) {
        for (key, raw) in map {
            let response = doc.resolve(raw)?;
            responses.push(ResponseSpec {
                key: key.clone(),
                content: compile_content(
                    doc,
                    response.get("content"),
                    &format!("{location} response {key}"),
                )?,
            });
        }
    }

    Ok(Operation {
        method: method.to_string(),
        parameters,
        body,
        responses,
    })
}

fn compile_content(
    doc: &OpenApiDocument,
    content: Option<&Value>,
    location: &str,
) -> Result<Content, SchemaLoadError> {
    let mut media = Vec::new();
    for (media_type, entry) in content.and_then(Value::as_object).into_iter().flatten() {
        let validator = match entry.get("schema") {
            Some(schema) => Some(doc.compile(schema, &format!("{location} {media_type}"))?),
            None => None,
        };
        media.push((media_type.to_ascii_lowercase(), validator));
    }
    Ok(Content { media })
}
