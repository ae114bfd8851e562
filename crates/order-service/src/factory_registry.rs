//! Registry of every backend implementation compiled into the service.
//!
//! Configuration refers to implementations by name. The registry maps those
//! names to factory functions and rejects names it does not know before the
//! engine is built.

use order_blob::BlobFactory;
use order_config::Config;
use order_core::{OrderBuilder, OrderEngine, OrderFactories};
use order_notification::NotificationFactory;
use order_persistence::PersistenceFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Factories for each port, keyed by implementation name.
pub struct FactoryRegistry {
	pub persistence: HashMap<String, PersistenceFactory>,
	pub blob: HashMap<String, BlobFactory>,
	pub notification: HashMap<String, NotificationFactory>,
}

impl FactoryRegistry {
	pub fn new() -> Self {
		Self {
			persistence: HashMap::new(),
			blob: HashMap::new(),
			notification: HashMap::new(),
		}
	}

	pub fn register_persistence(&mut self, name: impl Into<String>, factory: PersistenceFactory) {
		self.persistence.insert(name.into(), factory);
	}

	pub fn register_blob(&mut self, name: impl Into<String>, factory: BlobFactory) {
		self.blob.insert(name.into(), factory);
	}

	pub fn register_notification(&mut self, name: impl Into<String>, factory: NotificationFactory) {
		self.notification.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Returns the global registry, filling it on first use.
pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();

		for (name, factory) in order_persistence::get_all_implementations() {
			tracing::debug!("Registering persistence implementation: {}", name);
			registry.register_persistence(name, factory);
		}

		for (name, factory) in order_blob::get_all_implementations() {
			tracing::debug!("Registering blob implementation: {}", name);
			registry.register_blob(name, factory);
		}

		for (name, factory) in order_notification::get_all_implementations() {
			tracing::debug!("Registering notification implementation: {}", name);
			registry.register_notification(name, factory);
		}

		registry
	})
}

/// Collects the factories named in a port section, failing on unknown names.
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

/// Builds the order engine from configuration using the global registry.
pub fn build_engine_from_config(config: Config) -> Result<OrderEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let persistence_factories = build_factories!(
		registry,
		config.persistence.implementations,
		persistence,
		"persistence"
	);
	let blob_factories = build_factories!(registry, config.blob.implementations, blob, "blob");
	let notification_factories = build_factories!(
		registry,
		config.notification.implementations,
		notification,
		"notification"
	);

	let factories = OrderFactories {
		persistence_factories,
		blob_factories,
		notification_factories,
	};

	Ok(OrderBuilder::new(config).build(factories)?)
}
