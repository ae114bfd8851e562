//! Common types for the order service.
//!
//! Holds the order entity, the create-order request and its validation rules,
//! the notification payload shared by every notifier, and the small pieces of
//! plumbing (config schemas, registries, API errors) used by all other crates.

/// API error and response types for the HTTP surface.
pub mod api;
/// Order entity, create-order request and notification payload.
pub mod order;
/// Registry trait for self-registering backend implementations.
pub mod registry;
/// Utility functions for log formatting.
pub mod utils;
/// Configuration validation types for backend TOML tables.
pub mod validation;

pub use api::*;
pub use order::*;
pub use registry::*;
pub use utils::truncate_id;
pub use validation::*;
