//! Notification backend that writes to the service log.
//!
//! Stands in for a message topic during local development.

use crate::{NotificationError, NotificationFactory, NotificationInterface, NotificationRegistry};
use async_trait::async_trait;
use order_types::{
	ConfigSchema, ImplementationRegistry, OrderNotification, Schema, ValidationError,
};

/// Notifier that logs each notification at info level.
#[derive(Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationInterface for LogNotifier {
	async fn notify(&self, notification: &OrderNotification) -> Result<(), NotificationError> {
		tracing::info!(
			order_id = %notification.order_id,
			customer = %notification.customer_name,
			amount = %notification.order_amount,
			subject = OrderNotification::SUBJECT,
			"{}",
			notification.message()
		);
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LogNotifierSchema)
	}
}

/// Configuration schema for LogNotifier.
pub struct LogNotifierSchema;

impl ConfigSchema for LogNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a log notifier.
pub fn create_notifier(
	config: &toml::Value,
) -> Result<Box<dyn NotificationInterface>, NotificationError> {
	LogNotifierSchema
		.validate(config)
		.map_err(|e| NotificationError::Configuration(e.to_string()))?;
	Ok(Box::new(LogNotifier))
}

/// Registry for the log notification implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "log";
	type Factory = NotificationFactory;

	fn factory() -> Self::Factory {
		create_notifier
	}
}

impl NotificationRegistry for Registry {}
