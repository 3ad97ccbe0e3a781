//! Per-interaction outcomes and the aggregate replay summary.

use std::fmt;
use std::time::Duration;

use replay_core::Interaction;
use serde::{Serialize, Serializer};

/// Why a replayed interaction failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// The mock answered 500: a schema violation, an unregistered route or
    /// a recorded 500.
    ServerRejected {
        /// Always 500.
        status: u16,
        /// The error formatter's message, or the raw body.
        message: String,
    },
    /// Connection or protocol failure.
    Transport {
        /// Client error message.
        message: String,
    },
    /// No response within the per-call deadline.
    TimedOut {
        /// The deadline that elapsed.
        #[serde(rename = "after_ms", serialize_with = "as_millis")]
        after: Duration,
    },
    /// The interaction never got a mock route.
    NotRegistered {
        /// Registration error.
        message: String,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerRejected { status, message } => {
                write!(f, "server rejected the exchange with {status}: {message}")
            }
            Self::Transport { message } => write!(f, "transport error: {message}"),
            Self::TimedOut { after } => write!(f, "no response within {after:?}"),
            Self::NotRegistered { message } => write!(f, "not registered: {message}"),
        }
    }
}

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Classification of one replayed interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    /// Any status other than 500.
    Passed {
        /// Observed status.
        status: u16,
    },
    /// The exchange failed.
    Failed {
        /// Why.
        reason: FailureReason,
    },
}

impl Outcome {
    /// True for [`Outcome::Passed`].
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }
}

/// Outcome of one interaction, with enough context to identify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractionOutcome {
    /// Registry index.
    pub index: usize,
    /// Interaction description.
    pub description: String,
    /// Provider state the interaction assumes.
    pub provider_state: String,
    /// Recorded method.
    pub method: String,
    /// Recorded path.
    pub path: String,
    /// Classification.
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl InteractionOutcome {
    pub(crate) fn new(index: usize, interaction: &Interaction, outcome: Outcome) -> Self {
        Self {
            index,
            description: interaction.description.clone(),
            provider_state: interaction.provider_state.clone(),
            method: interaction.request.method.clone(),
            path: interaction.request.path.clone(),
            outcome,
        }
    }
}

/// Aggregate result of a full replay, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    passed: usize,
    failed: usize,
    outcomes: Vec<InteractionOutcome>,
}

impl ReplaySummary {
    /// Build from outcomes in registry order.
    pub fn from_outcomes(outcomes: Vec<InteractionOutcome>) -> Self {
        let passed = outcomes.iter().filter(|o| o.outcome.is_passed()).count();
        Self {
            passed,
            failed: outcomes.len() - passed,
            outcomes,
        }
    }

    /// Every outcome, in registry order.
    pub fn outcomes(&self) -> &[InteractionOutcome] {
        &self.outcomes
    }

    /// Number of passed interactions.
    pub fn passed(&self) -> usize {
        self.passed
    }

    /// Number of failed interactions.
    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Total number of replayed interactions.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Descriptions of failed interactions, in registry order.
    pub fn failing_descriptions(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.outcome.is_passed())
            .map(|o| o.description.as_str())
            .collect()
    }

    /// True when nothing failed. An empty run counts as passed.
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// Pass/fail per interaction, for comparing runs.
    pub fn classifications(&self) -> Vec<bool> {
        self.outcomes.iter().map(|o| o.outcome.is_passed()).collect()
    }
}

impl fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} interactions: {} passed, {} failed",
            self.total(),
            self.passed,
            self.failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outcome(index: usize, description: &str, outcome: Outcome) -> InteractionOutcome {
        InteractionOutcome {
            index,
            description: description.into(),
            provider_state: "s".into(),
            method: "GET".into(),
            path: "/p".into(),
            outcome,
        }
    }

    #[test]
    fn counts_and_failing_descriptions() {
        let summary = ReplaySummary::from_outcomes(vec![
            outcome(0, "a", Outcome::Passed { status: 200 }),
            outcome(
                1,
                "b",
                Outcome::Failed {
                    reason: FailureReason::Transport {
                        message: "refused".into(),
                    },
                },
            ),
            outcome(2, "c", Outcome::Passed { status: 404 }),
        ]);
        assert_eq!(summary.passed(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.failing_descriptions(), vec!["b"]);
        assert!(!summary.all_passed());
        assert_eq!(summary.classifications(), vec![true, false, true]);
        assert_eq!(summary.to_string(), "3 interactions: 2 passed, 1 failed");
    }

    #[test]
    fn empty_run_passes() {
        assert!(ReplaySummary::default().all_passed());
    }

    #[test]
    fn serializes_flat_report_entries() {
        let summary = ReplaySummary::from_outcomes(vec![outcome(
            0,
            "slow",
            Outcome::Failed {
                reason: FailureReason::TimedOut {
                    after: Duration::from_millis(1500),
                },
            },
        )]);
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["passed"], 0);
        assert_eq!(value["failed"], 1);
        assert_eq!(
            value["outcomes"][0],
            json!({
                "index": 0,
                "description": "slow",
                "provider_state": "s",
                "method": "GET",
                "path": "/p",
                "result": "failed",
                "reason": {"kind": "timed_out", "after_ms": 1500}
            })
        );
    }
}
