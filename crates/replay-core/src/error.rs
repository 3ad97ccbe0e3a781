//! # Fixture Errors
//!
//! Load-time failures of the contract fixture. All of these are fatal: the
//! harness refuses to register routes for a contract it cannot fully read.

use std::path::PathBuf;

use thiserror::Error;

/// Error raised while loading or normalizing a contract fixture.
#[derive(Error, Debug)]
pub enum FixtureError {
    /// The fixture file could not be read.
    #[error("cannot read contract fixture '{path}': {source}")]
    Io {
        /// Path of the fixture file.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The fixture is not valid JSON.
    #[error("contract fixture is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The document is JSON but not a contract (neither an object with
    /// `interactions` nor a bare array of interactions).
    #[error("contract fixture has an unexpected shape: {0}")]
    InvalidShape(String),

    /// A single interaction record could not be decoded.
    #[error("interaction #{index} is malformed: {source}")]
    InvalidInteraction {
        /// Zero-based position in the fixture.
        index: usize,
        /// Decoding error for that record.
        source: serde_json::Error,
    },

    /// The interaction has no description.
    #[error("interaction #{index} has an empty description")]
    MissingDescription {
        /// Zero-based position in the fixture.
        index: usize,
    },

    /// Neither `providerState` nor `providerStates[0].name` resolved.
    #[error("interaction #{index} ('{description}') has no provider state: expected `providerState` or `providerStates[0].name`")]
    MissingProviderState {
        /// Zero-based position in the fixture.
        index: usize,
        /// Description of the offending interaction.
        description: String,
    },
}
