//! Core domain + application logic for the interaction gateway.
//!
//! This crate is intentionally framework-agnostic. The chat platform and the
//! LLM API live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod dedup;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod pipeline;
pub mod ports;
pub mod tasks;

pub use errors::{Error, Result};
