//! Order orchestration for the order service.
//!
//! The engine sequences the blob, persistence and notification ports for
//! each order. The builder resolves which backend serves each port from the
//! configuration, once, before the engine is constructed.

pub mod builder;
pub mod engine;

pub use builder::{BuilderError, OrderBuilder, OrderFactories};
pub use engine::{NotificationOutcome, OrderCreated, OrderEngine, OrderError, PersistenceOutcome};
