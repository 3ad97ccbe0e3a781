//! # Verification Runner
//!
//! Replays every interaction of a registry against the live mock, strictly in
//! registry order and one call at a time. A call for interaction `i + 1` is
//! only issued after interaction `i` has resolved, and no single failure stops
//! the run.
//!
//! ## Classification
//!
//! | Observed                        | Outcome                               |
//! |---------------------------------|---------------------------------------|
//! | any status except 500           | `Passed` (non-2xx also logs a warning) |
//! | 500                             | `Failed(ServerRejected)`              |
//! | connection/protocol error       | `Failed(Transport)`                   |
//! | no response before the deadline | `Failed(TimedOut)`                    |
//! | interaction has no mock route   | `Failed(NotRegistered)`               |

use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;

use replay_core::{Interaction, InteractionRegistry, ReplayMethod};

use crate::config::ReplayConfig;
use crate::summary::{FailureReason, InteractionOutcome, Outcome, ReplaySummary};

/// Longest server message kept in a failure reason.
const MAX_MESSAGE_LEN: usize = 512;

/// Fatal runner errors.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// The HTTP client could not be constructed.
    #[error("cannot build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Drives an HTTP client through a registry.
#[derive(Debug, Clone)]
pub struct Runner {
    client: Client,
    config: ReplayConfig,
}

impl Runner {
    /// Build a runner with one client for the whole run.
    ///
    /// Redirects are not followed, so recorded 3xx responses are observed as
    /// recorded.
    pub fn new(config: ReplayConfig) -> Result<Self, ReplayError> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client, config })
    }

    /// The target configuration.
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Replay every interaction.
    pub async fn replay(&self, registry: &InteractionRegistry) -> ReplaySummary {
        self.replay_except(registry, &BTreeMap::new()).await
    }

    /// Replay every interaction, failing those listed in `not_registered`
    /// (registry index to registration error) without calling the mock.
    pub async fn replay_except(
        &self,
        registry: &InteractionRegistry,
        not_registered: &BTreeMap<usize, String>,
    ) -> ReplaySummary {
        let mut outcomes = Vec::with_capacity(registry.len());
        for (index, interaction) in registry.iter().enumerate() {
            tracing::info!("Testing interaction: {interaction}");
            tracing::info!("{} {}", interaction.request.method, interaction.request.path);

            let outcome = match not_registered.get(&index) {
                Some(message) => Outcome::Failed {
                    reason: FailureReason::NotRegistered {
                        message: message.clone(),
                    },
                },
                None => self.replay_one(interaction).await,
            };

            match &outcome {
                Outcome::Passed { status } => {
                    tracing::info!(status, "Interaction passed!");
                }
                Outcome::Failed { reason } => {
                    tracing::error!(description = %interaction.description, %reason, "Interaction failed!");
                }
            }
            outcomes.push(InteractionOutcome::new(index, interaction, outcome));
        }

        let summary = ReplaySummary::from_outcomes(outcomes);
        tracing::info!(
            passed = summary.passed(),
            failed = summary.failed(),
            "replay complete"
        );
        summary
    }

    /// Replay a single interaction and classify the result.
    pub async fn replay_one(&self, interaction: &Interaction) -> Outcome {
        let failed = |reason| Outcome::Failed { reason };

        let method = match interaction.request.replay_method() {
            Ok(method) => method,
            Err(e) => return failed(FailureReason::NotRegistered { message: e.to_string() }),
        };
        let url = match self.config.target_url(&interaction.request) {
            Ok(url) => url,
            Err(e) => return failed(FailureReason::Transport { message: e.to_string() }),
        };
        let builder = match self.build_request(method, url, interaction) {
            Ok(builder) => builder,
            Err(message) => return failed(FailureReason::Transport { message }),
        };

        let call = async {
            let response = builder.send().await?;
            let status = response.status();
            let text = response.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        };

        match tokio::time::timeout(self.config.request_timeout, call).await {
            Err(_) => failed(FailureReason::TimedOut {
                after: self.config.request_timeout,
            }),
            Ok(Err(e)) => failed(FailureReason::Transport {
                message: e.to_string(),
            }),
            Ok(Ok((status, text))) => classify(status, &text),
        }
    }

    fn build_request(
        &self,
        method: ReplayMethod,
        url: url::Url,
        interaction: &Interaction,
    ) -> Result<RequestBuilder, String> {
        let method = match method {
            ReplayMethod::Get => Method::GET,
            ReplayMethod::Post => Method::POST,
        };

        let mut headers = HeaderMap::new();
        for (name, value) in interaction.request.replayable_headers() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| format!("invalid request header '{name}': {e}"))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| format!("invalid value for request header '{name}': {e}"))?;
            headers.insert(name, value);
        }

        let builder = self.client.request(method, url);
        let Some(body) = &interaction.request.body else {
            return Ok(builder.headers(headers));
        };

        let declared = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.to_ascii_lowercase());
        let builder = match declared.as_deref() {
            None => builder.json(body),
            Some(ct) if ct.contains("json") => builder.body(body.to_string()),
            Some(ct) if ct.starts_with("application/x-www-form-urlencoded") => {
                builder.body(encode_form(body))
            }
            Some(_) => match body {
                Value::String(text) => builder.body(text.clone()),
                other => builder.body(other.to_string()),
            },
        };
        Ok(builder.headers(headers))
    }
}

/// Object bodies become `a=1&b=x`; arrays repeat the key. Anything else is
/// sent as its JSON text.
fn encode_form(body: &Value) -> String {
    let Value::Object(fields) = body else {
        return match body {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
    };
    let mut form = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in fields {
        match value {
            Value::Array(items) => {
                for item in items {
                    form.append_pair(key, &scalar_text(item));
                }
            }
            other => {
                form.append_pair(key, &scalar_text(other));
            }
        }
    }
    form.finish()
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn classify(status: StatusCode, body: &str) -> Outcome {
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        return Outcome::Failed {
            reason: FailureReason::ServerRejected {
                status: status.as_u16(),
                message: server_message(body),
            },
        };
    }
    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), "non-2xx response accepted");
    }
    Outcome::Passed {
        status: status.as_u16(),
    }
}

/// The `message` of a `{ message, errors }` body, else the body itself.
fn server_message(body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.to_string());
    if message.len() <= MAX_MESSAGE_LEN {
        return message;
    }
    let mut end = MAX_MESSAGE_LEN;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &message[..end])
}
