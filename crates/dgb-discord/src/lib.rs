//! Discord adapter (axum + reqwest).
//!
//! This crate owns the interaction webhook endpoint and implements the
//! `dgb-core` FollowupPort over the interaction webhook API.

pub mod ack;
pub mod commands;
pub mod followup;
pub mod interaction;
pub mod router;
pub mod signature;

pub use followup::DiscordFollowup;
pub use router::{build_router, AppState};
pub use signature::SignatureVerifier;
