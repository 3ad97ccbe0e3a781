//! # OpenAPI Documents
//!
//! Loading an OpenAPI 3.x document, resolving its local references, and
//! compiling embedded schemas into `jsonschema` validators.
//!
//! ## Schema Resolution
//!
//! Every compiled schema becomes the root of a small document that also
//! carries the source document's `components`, so `#/components/schemas/...`
//! references resolve without touching the network. Remote references are
//! refused at compile time.
//!
//! OpenAPI 3.0 schemas are a Draft 4 dialect with a `nullable` extension; they
//! are compiled as Draft 4 after `nullable: true` is rewritten into a JSON
//! Schema union with `null`. OpenAPI 3.1 schemas are Draft 2020-12.

use std::path::Path;

use jsonschema::{Draft, Retrieve, Uri, Validator};
use serde_json::{json, Map, Value};

use crate::validate::SchemaLoadError;

/// Upper bound on chained `$ref` hops for parameters, bodies and responses.
const MAX_REF_DEPTH: usize = 32;

/// OpenAPI major.minor line of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenApiVersion {
    /// 3.0.x
    V30,
    /// 3.1.x
    V31,
}

impl OpenApiVersion {
    fn draft(self) -> Draft {
        match self {
            Self::V30 => Draft::Draft4,
            Self::V31 => Draft::Draft202012,
        }
    }
}

/// Retriever that refuses every external `$ref`.
struct LocalOnlyRetriever;

impl Retrieve for LocalOnlyRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        Err(format!("remote reference '{}' is not allowed", uri.as_str()).into())
    }
}

/// A parsed, normalized OpenAPI document.
#[derive(Debug)]
pub(crate) struct OpenApiDocument {
    root: Value,
    version: OpenApiVersion,
    base_path: String,
}

impl OpenApiDocument {
    /// Load from a `.json`, `.yaml` or `.yml` file.
    pub(crate) fn from_path(path: &Path) -> Result<Self, SchemaLoadError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| SchemaLoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let root: Value = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| SchemaLoadError::Parse {
                path: path.display().to_string(),
                reason: format!("invalid YAML: {e}"),
            })?,
            _ => serde_json::from_str(&content).map_err(|e| SchemaLoadError::Parse {
                path: path.display().to_string(),
                reason: format!("invalid JSON: {e}"),
            })?,
        };

        Self::from_value(root)
    }

    pub(crate) fn from_value(mut root: Value) -> Result<Self, SchemaLoadError> {
        if !root.is_object() {
            return Err(SchemaLoadError::InvalidDocument(
                "document root must be an object".to_string(),
            ));
        }
        if let Some(swagger) = root.get("swagger").and_then(Value::as_str) {
            return Err(SchemaLoadError::UnsupportedVersion(format!("swagger {swagger}")));
        }
        let declared = root
            .get("openapi")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                SchemaLoadError::InvalidDocument("missing `openapi` version field".to_string())
            })?
            .to_string();
        let version = if declared.starts_with("3.0") {
            OpenApiVersion::V30
        } else if declared.starts_with("3.1") {
            OpenApiVersion::V31
        } else {
            return Err(SchemaLoadError::UnsupportedVersion(declared));
        };

        if !root.get("paths").is_some_and(Value::is_object) {
            return Err(SchemaLoadError::InvalidDocument(
                "missing `paths` object".to_string(),
            ));
        }

        if version == OpenApiVersion::V30 {
            widen_nullable(&mut root);
        }
        let base_path = base_path(&root);

        Ok(Self {
            root,
            version,
            base_path,
        })
    }

    pub(crate) fn root(&self) -> &Value {
        &self.root
    }

    pub(crate) fn version(&self) -> OpenApiVersion {
        self.version
    }

    /// Path prefix of the first declared server, without a trailing slash.
    pub(crate) fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Follow local `$ref`s until reaching a concrete object.
    pub(crate) fn resolve<'a>(&'a self, mut value: &'a Value) -> Result<&'a Value, SchemaLoadError> {
        for _ in 0..MAX_REF_DEPTH {
            match value.get("$ref").and_then(Value::as_str) {
                Some(reference) => value = self.pointer(reference)?,
                None => return Ok(value),
            }
        }
        Err(SchemaLoadError::UnresolvedRef(format!(
            "reference chain deeper than {MAX_REF_DEPTH} hops"
        )))
    }

    fn pointer(&self, reference: &str) -> Result<&Value, SchemaLoadError> {
        reference
            .strip_prefix('#')
            .and_then(|ptr| self.root.pointer(ptr))
            .ok_or_else(|| SchemaLoadError::UnresolvedRef(reference.to_string()))
    }

    /// Compile one embedded schema. `location` names it in errors.
    pub(crate) fn compile(&self, schema: &Value, location: &str) -> Result<Validator, SchemaLoadError> {
        let mut root = match schema {
            Value::Object(map) => map.clone(),
            other => {
                let mut map = Map::new();
                map.insert("allOf".to_string(), json!([other]));
                map
            }
        };
        if let Some(components) = self.root.get("components") {
            root.insert("components".to_string(), components.clone());
        }

        let mut opts = jsonschema::options();
        opts.with_draft(self.version.draft());
        opts.with_retriever(LocalOnlyRetriever);
        opts.build(&Value::Object(root))
            .map_err(|e| SchemaLoadError::ValidatorBuild {
                location: location.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Rewrite OpenAPI 3.0 `nullable: true` into Draft 4 unions with `null`.
fn widen_nullable(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                widen_nullable(child);
            }
            if map.get("nullable") != Some(&Value::Bool(true)) {
                return;
            }
            map.remove("nullable");
            match map.get("type").cloned() {
                Some(Value::String(ty)) => {
                    map.insert("type".to_string(), json!([ty, "null"]));
                    if let Some(Value::Array(variants)) = map.get_mut("enum") {
                        if !variants.contains(&Value::Null) {
                            variants.push(Value::Null);
                        }
                    }
                }
                _ => {
                    let inner = Value::Object(std::mem::take(map));
                    map.insert("anyOf".to_string(), json!([inner, {"type": "null"}]));
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(widen_nullable),
        _ => {}
    }
}

fn base_path(root: &Value) -> String {
    let Some(server) = root
        .get("servers")
        .and_then(|s| s.get(0))
        .and_then(|s| s.get("url"))
        .and_then(Value::as_str)
    else {
        return String::new();
    };

    let path = if server.starts_with('/') {
        server.to_string()
    } else {
        match url::Url::parse(server) {
            Ok(url) => url.path().to_string(),
            Err(e) => {
                tracing::warn!(server, "ignoring unparseable server url: {e}");
                return String::new();
            }
        }
    };
    path.trim_end_matches('/').to_string()
}
