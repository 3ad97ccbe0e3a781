//! # Interaction Registry
//!
//! Holds the ordered, immutable interaction sequence of one contract.
//!
//! The registry is built once at process start and only read afterwards. Its
//! ordering is significant: routes are compiled in this order (so a later
//! duplicate shadows an earlier one) and the runner replays in this order.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::error::FixtureError;
use crate::interaction::{Interaction, RawInteraction};

/// Immutable, cheaply clonable view of a contract's interactions.
#[derive(Debug, Clone)]
pub struct InteractionRegistry {
    consumer: Option<String>,
    provider: Option<String>,
    interactions: Arc<[Interaction]>,
}

impl InteractionRegistry {
    /// Load a contract fixture from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Io`] if the file cannot be read, and any of the
    /// errors of [`InteractionRegistry::from_value`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json_str(&content)?;
        tracing::debug!(
            path = %path.display(),
            interactions = registry.len(),
            "loaded contract fixture"
        );
        Ok(registry)
    }

    /// Parse a contract fixture from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::Parse`] for invalid JSON, and any of the errors
    /// of [`InteractionRegistry::from_value`].
    pub fn from_json_str(content: &str) -> Result<Self, FixtureError> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(value)
    }

    /// Build a registry from an already-parsed fixture document.
    ///
    /// Accepts either a contract object (`{consumer, provider, interactions}`)
    /// or a bare array of interactions. Every record is normalized; the first
    /// record that cannot be normalized aborts the load.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::InvalidShape`], [`FixtureError::InvalidInteraction`],
    /// [`FixtureError::MissingDescription`] or [`FixtureError::MissingProviderState`].
    pub fn from_value(value: Value) -> Result<Self, FixtureError> {
        let (consumer, provider, records) = match value {
            Value::Array(records) => (None, None, records),
            Value::Object(mut doc) => {
                let records = match doc.remove("interactions") {
                    Some(Value::Array(records)) => records,
                    Some(other) => {
                        return Err(FixtureError::InvalidShape(format!(
                            "`interactions` must be an array, found {}",
                            json_kind(&other)
                        )))
                    }
                    None => {
                        return Err(FixtureError::InvalidShape(
                            "missing `interactions` array".to_string(),
                        ))
                    }
                };
                (party_name(&doc, "consumer"), party_name(&doc, "provider"), records)
            }
            other => {
                return Err(FixtureError::InvalidShape(format!(
                    "expected an object or array, found {}",
                    json_kind(&other)
                )))
            }
        };

        let interactions = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| {
                serde_json::from_value::<RawInteraction>(record)
                    .map_err(|source| FixtureError::InvalidInteraction { index, source })?
                    .normalize(index)
            })
            .collect::<Result<Vec<_>, _>>()?;

        if interactions.is_empty() {
            tracing::warn!("contract fixture contains no interactions");
        }

        Ok(Self {
            consumer,
            provider,
            interactions: interactions.into(),
        })
    }

    /// Build a registry directly from normalized interactions.
    pub fn from_interactions(interactions: Vec<Interaction>) -> Self {
        Self {
            consumer: None,
            provider: None,
            interactions: interactions.into(),
        }
    }

    /// Consumer name declared by the contract, if any.
    pub fn consumer(&self) -> Option<&str> {
        self.consumer.as_deref()
    }

    /// Provider name declared by the contract, if any.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// All interactions in fixture order.
    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    /// Iterate in fixture order.
    pub fn iter(&self) -> std::slice::Iter<'_, Interaction> {
        self.interactions.iter()
    }

    /// Interaction at `index`.
    pub fn get(&self, index: usize) -> Option<&Interaction> {
        self.interactions.get(index)
    }

    /// Number of interactions.
    pub fn len(&self) -> usize {
        self.interactions.len()
    }

    /// True if the contract has no interactions.
    pub fn is_empty(&self) -> bool {
        self.interactions.is_empty()
    }
}

impl<'a> IntoIterator for &'a InteractionRegistry {
    type Item = &'a Interaction;
    type IntoIter = std::slice::Iter<'a, Interaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn party_name(doc: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    doc.get(key)?.get("name")?.as_str().map(str::to_string)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
