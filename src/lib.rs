//! Deterministic parametric claim decisioning for flight-delay products.
//!
//! The [`engine`] module holds the decision core: configuration resolution,
//! deterministic flight-state derivation, the ordered rule pipeline with
//! trace recording, and the regression/impact evaluator. Everything else is
//! service plumbing around that core.

pub mod config;
pub mod engine;
pub mod error;
pub mod telemetry;
