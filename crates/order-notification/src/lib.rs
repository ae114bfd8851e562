//! Notification module for the order service.
//!
//! Announces newly created orders. Delivery is best effort: the order
//! engine records a failure but never fails an order because of it.

use async_trait::async_trait;
use order_types::{ConfigSchema, ImplementationRegistry, OrderNotification};
use thiserror::Error;

pub mod implementations {
	pub mod log;
	pub mod sns;
}

/// Errors that can occur while sending notifications.
#[derive(Debug, Error)]
pub enum NotificationError {
	#[error("Publish error: {0}")]
	Publish(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for notification backends.
#[async_trait]
pub trait NotificationInterface: Send + Sync {
	/// Sends the notification for one order.
	async fn notify(&self, notification: &OrderNotification) -> Result<(), NotificationError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for notification factory functions.
pub type NotificationFactory =
	fn(&toml::Value) -> Result<Box<dyn NotificationInterface>, NotificationError>;

/// Registry trait for notification implementations.
pub trait NotificationRegistry: ImplementationRegistry<Factory = NotificationFactory> {}

/// Get all registered notification implementations.
pub fn get_all_implementations() -> Vec<(&'static str, NotificationFactory)> {
	use implementations::{log, sns};

	vec![
		(log::Registry::NAME, log::Registry::factory()),
		(sns::Registry::NAME, sns::Registry::factory()),
	]
}

/// High-level notification service used by the order engine.
pub struct NotificationService {
	name: String,
	backend: Box<dyn NotificationInterface>,
}

impl NotificationService {
	pub fn new(name: impl Into<String>, backend: Box<dyn NotificationInterface>) -> Self {
		Self {
			name: name.into(),
			backend,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub async fn notify(&self, notification: &OrderNotification) -> Result<(), NotificationError> {
		self.backend.notify(notification).await
	}
}
