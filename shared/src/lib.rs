//! Shared types and models for the Weatherboy flood-risk platform
//!
//! This crate holds the normalized domain records produced by the feed
//! adapters, the location registry, and the risk output types consumed by
//! the backend and its read API.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
