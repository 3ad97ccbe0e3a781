//! # replay-runner — Verification Runner
//!
//! Replays every contract interaction as a live HTTP call against the mock
//! provider and classifies each exchange as passed or failed.
//!
//! - [`config`]: [`ReplayConfig`], the target base URL, port and deadline.
//! - [`runner`]: [`Runner`], the sequential replay loop.
//! - [`summary`]: [`Outcome`] per interaction and the aggregate
//!   [`ReplaySummary`].
//!
//! ## Crate Policy
//!
//! - Strictly sequential: at most one call is in flight.
//! - Every call is bounded by [`ReplayConfig::request_timeout`].
//! - Never aborts a run on a single failure.

pub mod config;
pub mod runner;
pub mod summary;

pub use config::{ConfigError, ReplayConfig};
pub use runner::{ReplayError, Runner};
pub use summary::{FailureReason, InteractionOutcome, Outcome, ReplaySummary};
