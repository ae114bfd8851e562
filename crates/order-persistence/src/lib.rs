//! Persistence module for the order service.
//!
//! Defines the port through which orders are stored and looked up, and
//! ships two backends: an in-memory map for local development and a
//! DynamoDB table for production.

use async_trait::async_trait;
use order_types::{ConfigSchema, ImplementationRegistry, Order};
use thiserror::Error;

pub mod implementations {
	pub mod dynamodb;
	pub mod memory;
}

/// Errors that can occur during persistence operations.
#[derive(Debug, Error)]
pub enum PersistenceError {
	/// A stored record could not be converted into an order.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// The backend rejected or failed the request.
	#[error("Backend error: {0}")]
	Backend(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for order persistence backends.
#[async_trait]
pub trait PersistenceInterface: Send + Sync {
	/// Upserts the order under its id and returns it unchanged.
	///
	/// Saving the same id twice overwrites the earlier record.
	async fn save(&self, order: &Order) -> Result<Order, PersistenceError>;

	/// Looks an order up by id. A missing order is `Ok(None)`.
	async fn find_by_id(&self, order_id: &str) -> Result<Option<Order>, PersistenceError>;

	/// Returns every stored order in no particular order.
	async fn find_all(&self) -> Result<Vec<Order>, PersistenceError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for persistence factory functions.
pub type PersistenceFactory =
	fn(&toml::Value) -> Result<Box<dyn PersistenceInterface>, PersistenceError>;

/// Registry trait for persistence implementations.
pub trait PersistenceRegistry: ImplementationRegistry<Factory = PersistenceFactory> {}

/// Get all registered persistence implementations.
pub fn get_all_implementations() -> Vec<(&'static str, PersistenceFactory)> {
	use implementations::{dynamodb, memory};

	vec![
		(dynamodb::Registry::NAME, dynamodb::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// High-level persistence service used by the order engine.
pub struct PersistenceService {
	/// Configuration name of the backend, for logs.
	name: String,
	backend: Box<dyn PersistenceInterface>,
}

impl PersistenceService {
	pub fn new(name: impl Into<String>, backend: Box<dyn PersistenceInterface>) -> Self {
		Self {
			name: name.into(),
			backend,
		}
	}

	/// Name of the backend implementation in use.
	pub fn name(&self) -> &str {
		&self.name
	}

	pub async fn save(&self, order: &Order) -> Result<Order, PersistenceError> {
		let saved = self.backend.save(order).await?;
		tracing::debug!(
			backend = %self.name,
			order_id = %order_types::truncate_id(saved.order_id()),
			"Order saved"
		);
		Ok(saved)
	}

	pub async fn find_by_id(&self, order_id: &str) -> Result<Option<Order>, PersistenceError> {
		self.backend.find_by_id(order_id).await
	}

	pub async fn find_all(&self) -> Result<Vec<Order>, PersistenceError> {
		let orders = self.backend.find_all().await?;
		tracing::debug!(backend = %self.name, count = orders.len(), "Listed orders");
		Ok(orders)
	}
}
