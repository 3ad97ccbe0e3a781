//! # Interactions
//!
//! One recorded request/response exchange of a provider contract, plus the
//! raw wire shapes it is decoded from.
//!
//! Two contract generations disagree on where the precondition label lives:
//! older fixtures carry a `providerState` string, newer ones a
//! `providerStates` list whose first element's `name` is the label. Both are
//! folded into [`Interaction::provider_state`] here, at load time.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FixtureError;

// -- Canonical model ----------------------------------------------------------

/// Headers that describe how a message is framed on the wire. Bodies are
/// re-serialized on replay, so recorded values for these are never sent.
const FRAMING_HEADERS: [&str; 3] = ["content-length", "transfer-encoding", "connection"];

fn is_framing(name: &str) -> bool {
    FRAMING_HEADERS.iter().any(|f| name.eq_ignore_ascii_case(f))
}

/// A normalized contract interaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    /// Human-readable label. Never empty.
    pub description: String,
    /// Resolved precondition label. Never empty.
    pub provider_state: String,
    /// The request the consumer sends.
    pub request: InteractionRequest,
    /// The response the provider promises.
    pub response: InteractionResponse,
}

impl fmt::Display for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} given {}", self.description, self.provider_state)
    }
}

/// Recorded request half of an interaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionRequest {
    /// HTTP method, upper-cased at load time. Not yet checked for support;
    /// see [`InteractionRequest::replay_method`].
    pub method: String,
    /// Request path as recorded, expected to start with `/`.
    pub path: String,
    /// Encoded query string without the leading `?`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Request headers.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Request payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl InteractionRequest {
    /// The path percent-encoded the way it appears on the wire.
    ///
    /// Both the mock route table and the replay client use this form, so a
    /// recorded `/items/a b` is registered and requested as `/items/a%20b`.
    pub fn encoded_path(&self) -> String {
        match url::Url::parse("http://contract.invalid/") {
            Ok(mut url) => {
                url.set_path(&self.path);
                url.path().to_string()
            }
            Err(_) => self.path.clone(),
        }
    }

    /// Recorded headers minus framing headers and `Host`, which the client
    /// derives from the target URL.
    pub fn replayable_headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .filter(|(name, _)| !is_framing(name) && !name.eq_ignore_ascii_case("host"))
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Resolve the method into one the harness can mock and replay.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedMethod`] for anything other than GET or POST.
    pub fn replay_method(&self) -> Result<ReplayMethod, UnsupportedMethod> {
        self.method.parse()
    }
}

/// Recorded response half of an interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InteractionResponse {
    /// Status code; `None` when the fixture leaves it out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    /// Response headers.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Response payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl InteractionResponse {
    /// Status the mock answers with. An unspecified status is a server error.
    pub fn status_or_default(&self) -> i64 {
        self.status.unwrap_or(500)
    }

    /// Recorded headers minus framing headers.
    pub fn replayable_headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .filter(|(name, _)| !is_framing(name))
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Body the mock answers with. An unspecified body is the empty object.
    pub fn body_or_default(&self) -> Value {
        self.body
            .clone()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()))
    }
}

// -- Methods ------------------------------------------------------------------

/// The HTTP methods the harness can mock and replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReplayMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl ReplayMethod {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for ReplayMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReplayMethod {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("GET") {
            Ok(Self::Get)
        } else if s.eq_ignore_ascii_case("POST") {
            Ok(Self::Post)
        } else {
            Err(UnsupportedMethod(s.to_string()))
        }
    }
}

/// A recorded method the harness cannot mock.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported method '{0}': only GET and POST interactions can be mocked")]
pub struct UnsupportedMethod(pub String);

// -- Wire shapes --------------------------------------------------------------

/// Interaction exactly as it appears in the fixture.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawInteraction {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    provider_state: Option<String>,
    #[serde(default)]
    provider_states: Option<Vec<RawProviderState>>,
    request: RawRequest,
    #[serde(default)]
    response: Option<RawResponse>,
}

#[derive(Debug, Deserialize)]
struct RawProviderState {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    method: String,
    path: String,
    #[serde(default)]
    query: Option<RawQuery>,
    #[serde(default)]
    headers: Option<BTreeMap<String, RawHeaderValue>>,
    #[serde(default)]
    body: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawResponse {
    #[serde(default)]
    status: Option<i64>,
    #[serde(default)]
    headers: Option<BTreeMap<String, RawHeaderValue>>,
    #[serde(default)]
    body: Option<Value>,
}

/// Query as either an encoded string or a name → values map.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawQuery {
    Encoded(String),
    Map(BTreeMap<String, RawQueryValues>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawQueryValues {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawHeaderValue {
    One(String),
    Many(Vec<String>),
}

impl RawHeaderValue {
    fn joined(self) -> String {
        match self {
            Self::One(v) => v,
            Self::Many(vs) => vs.join(", "),
        }
    }
}

fn headers(raw: Option<BTreeMap<String, RawHeaderValue>>) -> BTreeMap<String, String> {
    raw.unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, v.joined()))
        .collect()
}

fn query(raw: Option<RawQuery>) -> Option<String> {
    let encoded = match raw? {
        RawQuery::Encoded(s) => s.trim_start_matches('?').to_string(),
        RawQuery::Map(map) => {
            let mut ser = url::form_urlencoded::Serializer::new(String::new());
            for (name, values) in &map {
                match values {
                    RawQueryValues::One(v) => {
                        ser.append_pair(name, v);
                    }
                    RawQueryValues::Many(vs) => {
                        for v in vs {
                            ser.append_pair(name, v);
                        }
                    }
                }
            }
            ser.finish()
        }
    };
    (!encoded.is_empty()).then_some(encoded)
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.trim().is_empty())
}

impl RawInteraction {
    /// Normalize into a canonical [`Interaction`].
    ///
    /// `index` is the record's position in the fixture and only feeds error
    /// messages.
    pub(crate) fn normalize(self, index: usize) -> Result<Interaction, FixtureError> {
        let description =
            non_blank(self.description).ok_or(FixtureError::MissingDescription { index })?;

        let provider_state = non_blank(self.provider_state)
            .or_else(|| {
                self.provider_states
                    .and_then(|states| states.into_iter().next())
                    .and_then(|first| non_blank(first.name))
            })
            .ok_or_else(|| FixtureError::MissingProviderState {
                index,
                description: description.clone(),
            })?;

        let response = self.response.unwrap_or_default();

        Ok(Interaction {
            description,
            provider_state,
            request: InteractionRequest {
                method: self.request.method.to_ascii_uppercase(),
                path: self.request.path,
                query: query(self.request.query),
                headers: headers(self.request.headers),
                body: self.request.body,
            },
            response: InteractionResponse {
                status: response.status,
                headers: headers(response.headers),
                body: response.body,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawInteraction {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn direct_provider_state_is_used() {
        let i = raw(json!({
            "description": "get widget",
            "providerState": "widget exists",
            "request": {"method": "GET", "path": "/widgets/1"},
            "response": {"status": 200, "body": {"id": 1, "name": "bolt"}}
        }))
        .normalize(0)
        .unwrap();
        assert_eq!(i.provider_state, "widget exists");
        assert_eq!(i.response.status, Some(200));
        assert_eq!(i.to_string(), "get widget given widget exists");
    }

    #[test]
    fn provider_states_first_name_is_fallback() {
        let i = raw(json!({
            "description": "list widgets",
            "providerStates": [{"name": "two widgets"}, {"name": "ignored"}],
            "request": {"method": "get", "path": "/widgets"}
        }))
        .normalize(3)
        .unwrap();
        assert_eq!(i.provider_state, "two widgets");
        assert_eq!(i.request.method, "GET");
    }

    #[test]
    fn direct_field_wins_over_list() {
        let i = raw(json!({
            "description": "d",
            "providerState": "direct",
            "providerStates": [{"name": "listed"}],
            "request": {"method": "GET", "path": "/"}
        }))
        .normalize(0)
        .unwrap();
        assert_eq!(i.provider_state, "direct");
    }

    #[test]
    fn missing_both_shapes_is_fatal() {
        let err = raw(json!({
            "description": "orphan",
            "request": {"method": "GET", "path": "/x"}
        }))
        .normalize(7)
        .unwrap_err();
        match err {
            FixtureError::MissingProviderState { index, description } => {
                assert_eq!(index, 7);
                assert_eq!(description, "orphan");
            }
            other => panic!("expected MissingProviderState, got: {other}"),
        }
    }

    #[test]
    fn empty_provider_states_list_is_fatal() {
        let err = raw(json!({
            "description": "empty list",
            "providerStates": [],
            "request": {"method": "GET", "path": "/x"}
        }))
        .normalize(0)
        .unwrap_err();
        assert!(matches!(err, FixtureError::MissingProviderState { .. }));
    }

    #[test]
    fn blank_direct_state_falls_back_then_fails() {
        let err = raw(json!({
            "description": "blank",
            "providerState": "  ",
            "providerStates": [{"params": {}}],
            "request": {"method": "GET", "path": "/x"}
        }))
        .normalize(0)
        .unwrap_err();
        assert!(matches!(err, FixtureError::MissingProviderState { .. }));
    }

    #[test]
    fn empty_description_is_fatal() {
        let err = raw(json!({
            "description": "",
            "providerState": "s",
            "request": {"method": "GET", "path": "/x"}
        }))
        .normalize(2)
        .unwrap_err();
        assert!(matches!(err, FixtureError::MissingDescription { index: 2 }));
    }

    #[test]
    fn absent_response_defaults_to_server_error_and_empty_body() {
        let i = raw(json!({
            "description": "no response",
            "providerState": "s",
            "request": {"method": "POST", "path": "/x"}
        }))
        .normalize(0)
        .unwrap();
        assert_eq!(i.response.status, None);
        assert_eq!(i.response.status_or_default(), 500);
        assert_eq!(i.response.body_or_default(), json!({}));
    }

    #[test]
    fn query_map_is_encoded_in_key_order() {
        let i = raw(json!({
            "description": "search",
            "providerState": "s",
            "request": {
                "method": "GET",
                "path": "/widgets",
                "query": {"tag": ["a", "b c"], "limit": "5"}
            }
        }))
        .normalize(0)
        .unwrap();
        assert_eq!(i.request.query.as_deref(), Some("limit=5&tag=a&tag=b+c"));
    }

    #[test]
    fn query_string_drops_leading_question_mark() {
        let i = raw(json!({
            "description": "search",
            "providerState": "s",
            "request": {"method": "GET", "path": "/widgets", "query": "?limit=5"}
        }))
        .normalize(0)
        .unwrap();
        assert_eq!(i.request.query.as_deref(), Some("limit=5"));
    }

    #[test]
    fn multi_valued_headers_are_joined() {
        let i = raw(json!({
            "description": "h",
            "providerState": "s",
            "request": {"method": "GET", "path": "/", "headers": {"Accept": ["a", "b"]}},
            "response": {"status": 200, "headers": {"X-Trace": "t"}}
        }))
        .normalize(0)
        .unwrap();
        assert_eq!(i.request.headers["Accept"], "a, b");
        assert_eq!(i.response.headers["X-Trace"], "t");
    }

    #[test]
    fn out_of_range_status_still_loads() {
        for status in [70000, -1] {
            let i = raw(json!({
                "description": "odd status",
                "providerState": "s",
                "request": {"method": "GET", "path": "/x"},
                "response": {"status": status}
            }))
            .normalize(0)
            .unwrap();
            assert_eq!(i.response.status_or_default(), status);
        }
    }

    #[test]
    fn framing_headers_are_not_replayable() {
        let i = raw(json!({
            "description": "framed",
            "providerState": "s",
            "request": {"method": "POST", "path": "/x", "headers": {
                "Content-Type": "application/json", "Content-Length": "40",
                "Host": "provider.internal", "Connection": "keep-alive"
            }},
            "response": {"status": 200, "headers": {
                "Content-Type": "application/json", "Content-Length": "64",
                "Transfer-Encoding": "chunked", "X-Trace": "t"
            }}
        }))
        .normalize(0)
        .unwrap();
        let request: Vec<_> = i.request.replayable_headers().collect();
        assert_eq!(request, vec![("Content-Type", "application/json")]);
        let response: Vec<_> = i.response.replayable_headers().collect();
        assert_eq!(
            response,
            vec![("Content-Type", "application/json"), ("X-Trace", "t")]
        );
    }

    #[test]
    fn encoded_path_escapes_spaces_only_once() {
        let mut request = InteractionRequest {
            method: "GET".into(),
            path: "/items/a b".into(),
            query: None,
            headers: BTreeMap::new(),
            body: None,
        };
        assert_eq!(request.encoded_path(), "/items/a%20b");
        request.path = "/items/a%20b".into();
        assert_eq!(request.encoded_path(), "/items/a%20b");
    }

    #[test]
    fn replay_method_accepts_get_and_post_only() {
        assert_eq!("get".parse::<ReplayMethod>().unwrap(), ReplayMethod::Get);
        assert_eq!("POST".parse::<ReplayMethod>().unwrap(), ReplayMethod::Post);
        let err = "DELETE".parse::<ReplayMethod>().unwrap_err();
        assert_eq!(err, UnsupportedMethod("DELETE".into()));
        assert!(err.to_string().contains("DELETE"));
    }
}
