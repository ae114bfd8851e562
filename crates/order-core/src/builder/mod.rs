//! Builder for constructing an order engine from configuration.
//!
//! Each port is resolved independently. The configuration lists candidate
//! implementations for the port in preference order (see
//! [`Config::candidates`]); the first candidate with a registered factory is
//! constructed. A port with no usable candidate is left unwired and the
//! engine runs it in degraded mode.

use crate::engine::OrderEngine;
use order_blob::{BlobError, BlobService, BlobStorageInterface};
use order_config::{ApiConfig, Config, Port};
use order_notification::{NotificationError, NotificationInterface, NotificationService};
use order_persistence::{PersistenceError, PersistenceInterface, PersistenceService};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	/// A selected implementation rejected its configuration table.
	#[error("Configuration error: {0}")]
	Config(String),
}

/// Factory functions for every port, keyed by implementation name.
pub struct OrderFactories<PF, BF, NF> {
	pub persistence_factories: HashMap<String, PF>,
	pub blob_factories: HashMap<String, BF>,
	pub notification_factories: HashMap<String, NF>,
}

/// Builds an [`OrderEngine`] with the backends selected by configuration.
pub struct OrderBuilder {
	config: Config,
}

impl OrderBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Resolves every port and constructs the engine.
	///
	/// Fails only when a selected implementation cannot be constructed from
	/// its table. Missing wiring never fails the build.
	pub fn build<PF, BF, NF>(
		self,
		factories: OrderFactories<PF, BF, NF>,
	) -> Result<OrderEngine, BuilderError>
	where
		PF: Fn(&toml::Value) -> Result<Box<dyn PersistenceInterface>, PersistenceError>,
		BF: Fn(&toml::Value) -> Result<Box<dyn BlobStorageInterface>, BlobError>,
		NF: Fn(&toml::Value) -> Result<Box<dyn NotificationInterface>, NotificationError>,
	{
		tracing::info!(
			service = %self.config.service.id,
			local_mode = self.config.backend.local_mode,
			"Resolving backends"
		);

		let persistence = resolve(
			&self.config,
			Port::Persistence,
			&factories.persistence_factories,
		)?
		.map(|(name, backend)| Arc::new(PersistenceService::new(name, backend)));

		let blob = resolve(&self.config, Port::Blob, &factories.blob_factories)?
			.map(|(name, backend)| Arc::new(BlobService::new(name, backend)));

		let notification = resolve(
			&self.config,
			Port::Notification,
			&factories.notification_factories,
		)?
		.map(|(name, backend)| Arc::new(NotificationService::new(name, backend)));

		let timeout_seconds = self
			.config
			.api
			.as_ref()
			.map(|api| api.timeout_seconds)
			.unwrap_or_else(|| ApiConfig::default().timeout_seconds);

		Ok(OrderEngine::new(persistence, blob, notification)
			.with_notification_timeout(Duration::from_secs(timeout_seconds)))
	}
}

/// Picks and constructs the backend serving one port.
fn resolve<I, E, F>(
	config: &Config,
	port: Port,
	factories: &HashMap<String, F>,
) -> Result<Option<(String, Box<I>)>, BuilderError>
where
	I: ?Sized,
	E: Display,
	F: Fn(&toml::Value) -> Result<Box<I>, E>,
{
	for (name, table) in config.candidates(port) {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(
				component = %port,
				implementation = %name,
				"No factory registered, trying next candidate"
			);
			continue;
		};

		return match factory(table) {
			Ok(backend) => {
				tracing::info!(component = %port, implementation = %name, "Loaded");
				Ok(Some((name.to_string(), backend)))
			}
			Err(e) => {
				tracing::error!(
					component = %port,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					port, name, e
				)))
			}
		};
	}

	tracing::warn!(component = %port, "No backend wired, running degraded");
	Ok(None)
}

#[cfg(test)]
mod tests {
	use super::*;
	use order_config::testing::{local_config, ConfigBuilder};

	fn factories() -> OrderFactories<
		order_persistence::PersistenceFactory,
		order_blob::BlobFactory,
		order_notification::NotificationFactory,
	> {
		OrderFactories {
			persistence_factories: order_persistence::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			blob_factories: order_blob::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
			notification_factories: order_notification::get_all_implementations()
				.into_iter()
				.map(|(name, factory)| (name.to_string(), factory))
				.collect(),
		}
	}

	fn table(toml_str: &str) -> toml::Value {
		toml::from_str(toml_str).unwrap()
	}

	#[test]
	fn test_local_mode_uses_local_backends() {
		let engine = OrderBuilder::new(local_config()).build(factories()).unwrap();
		assert_eq!(engine.persistence_backend(), Some("memory"));
		assert_eq!(engine.blob_backend(), Some("mock"));
		assert_eq!(engine.notification_backend(), Some("log"));
	}

	#[test]
	fn test_production_mode_ignores_local_backends() {
		let config = ConfigBuilder::new("prod")
			.local_mode(false)
			.wire(Port::Persistence, "memory")
			.wire(Port::Persistence, "dynamodb")
			.wire(Port::Blob, "mock")
			.implementation(Port::Blob, "s3", table("bucket = \"orders\""))
			.wire(Port::Notification, "log")
			.build();

		let engine = OrderBuilder::new(config).build(factories()).unwrap();
		assert_eq!(engine.persistence_backend(), Some("dynamodb"));
		assert_eq!(engine.blob_backend(), Some("s3"));
		assert_eq!(engine.notification_backend(), None);
	}

	#[test]
	fn test_local_mode_falls_through_to_production() {
		let config = ConfigBuilder::new("mixed")
			.local_mode(true)
			.wire(Port::Persistence, "dynamodb")
			.implementation(
				Port::Notification,
				"sns",
				table("topic_arn = \"arn:aws:sns:us-east-1:000000000000:orders\""),
			)
			.build();

		let engine = OrderBuilder::new(config).build(factories()).unwrap();
		assert_eq!(engine.persistence_backend(), Some("dynamodb"));
		assert_eq!(engine.blob_backend(), None);
		assert_eq!(engine.notification_backend(), Some("sns"));
	}

	#[test]
	fn test_custom_names_and_unknown_factories() {
		let config = ConfigBuilder::new("custom")
			.local_mode(true)
			.local(Port::Blob, "file")
			.implementation(Port::Blob, "file", table("storage_path = \"/tmp/invoices\""))
			.local(Port::Persistence, "redis")
			.wire(Port::Persistence, "redis")
			.build();

		let engine = OrderBuilder::new(config).build(factories()).unwrap();
		assert_eq!(engine.blob_backend(), Some("file"));
		assert_eq!(engine.persistence_backend(), None);
	}

	#[test]
	fn test_invalid_table_fails_build() {
		let config = ConfigBuilder::new("broken")
			.local_mode(false)
			.wire(Port::Notification, "sns")
			.build();

		let err = OrderBuilder::new(config).build(factories()).err().unwrap();
		assert!(err.to_string().contains("sns"));
		assert!(err.to_string().contains("topic_arn"));
	}

	#[tokio::test]
	async fn test_built_engine_creates_orders() {
		let engine = OrderBuilder::new(local_config()).build(factories()).unwrap();
		let created = engine
			.create_order(order_types::CreateOrderRequest::new(
				"Alice",
				rust_decimal::Decimal::new(4250, 2),
			))
			.await
			.unwrap();
		assert!(created.is_complete());
		assert_eq!(engine.get_all_orders().await.unwrap().len(), 1);
	}
}
