//! In-memory persistence backend.
//!
//! Orders live in a map guarded by a read-write lock, so concurrent
//! requests can read and write without coordination from the caller.
//! Nothing survives a restart.

use crate::{PersistenceError, PersistenceFactory, PersistenceInterface, PersistenceRegistry};
use async_trait::async_trait;
use order_types::{ConfigSchema, ImplementationRegistry, Order, Schema, ValidationError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory order store keyed by order id.
pub struct MemoryPersistence {
	orders: Arc<RwLock<HashMap<String, Order>>>,
}

impl MemoryPersistence {
	pub fn new() -> Self {
		Self {
			orders: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryPersistence {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl PersistenceInterface for MemoryPersistence {
	async fn save(&self, order: &Order) -> Result<Order, PersistenceError> {
		let mut orders = self.orders.write().await;
		orders.insert(order.order_id().to_string(), order.clone());
		Ok(order.clone())
	}

	async fn find_by_id(&self, order_id: &str) -> Result<Option<Order>, PersistenceError> {
		let orders = self.orders.read().await;
		Ok(orders.get(order_id).cloned())
	}

	async fn find_all(&self) -> Result<Vec<Order>, PersistenceError> {
		let orders = self.orders.read().await;
		Ok(orders.values().cloned().collect())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryPersistenceSchema)
	}
}

/// Configuration schema for MemoryPersistence.
pub struct MemoryPersistenceSchema;

impl ConfigSchema for MemoryPersistenceSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// Takes no options
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory persistence backend.
pub fn create_persistence(
	config: &toml::Value,
) -> Result<Box<dyn PersistenceInterface>, PersistenceError> {
	MemoryPersistenceSchema
		.validate(config)
		.map_err(|e| PersistenceError::Configuration(e.to_string()))?;
	Ok(Box::new(MemoryPersistence::new()))
}

/// Registry for the memory persistence implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = PersistenceFactory;

	fn factory() -> Self::Factory {
		create_persistence
	}
}

impl PersistenceRegistry for Registry {}
