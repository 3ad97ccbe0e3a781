//! # replay-core — Contract Data Model
//!
//! The leaf crate of the replay harness. Defines the [`Interaction`] record,
//! the normalization that turns a raw contract fixture into canonical
//! interactions, and the immutable [`InteractionRegistry`] that both the mock
//! route compiler and the verification runner read from.
//!
//! ## Crate Policy
//!
//! - No HTTP or schema logic lives here; this crate only describes the contract.
//! - Every interaction leaves the loader with exactly one resolved provider state.
//!   A fixture that cannot supply one is rejected before anything is served.
//! - The registry is never mutated after load. The compiler and the runner see
//!   the same contract version.

pub mod error;
pub mod interaction;
pub mod registry;

pub use error::FixtureError;
pub use interaction::{
    Interaction, InteractionRequest, InteractionResponse, ReplayMethod, UnsupportedMethod,
};
pub use registry::InteractionRegistry;
