//! Amazon SNS notification backend.

use crate::{NotificationError, NotificationFactory, NotificationInterface, NotificationRegistry};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sns::error::DisplayErrorContext;
use aws_sdk_sns::Client;
use order_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, OrderNotification, Schema,
	ValidationError,
};
use tokio::sync::OnceCell;

/// Notifier publishing to an SNS topic.
pub struct SnsNotifier {
	topic_arn: String,
	region: Option<String>,
	endpoint_url: Option<String>,
	client: OnceCell<Client>,
}

impl SnsNotifier {
	pub fn new(topic_arn: String, region: Option<String>, endpoint_url: Option<String>) -> Self {
		Self {
			topic_arn,
			region,
			endpoint_url,
			client: OnceCell::new(),
		}
	}

	async fn client(&self) -> &Client {
		self.client
			.get_or_init(|| async {
				let mut loader = aws_config::defaults(BehaviorVersion::latest());
				if let Some(region) = &self.region {
					loader = loader.region(Region::new(region.clone()));
				}
				if let Some(endpoint_url) = &self.endpoint_url {
					loader = loader.endpoint_url(endpoint_url);
				}
				Client::new(&loader.load().await)
			})
			.await
	}
}

#[async_trait]
impl NotificationInterface for SnsNotifier {
	async fn notify(&self, notification: &OrderNotification) -> Result<(), NotificationError> {
		let output = self
			.client()
			.await
			.publish()
			.topic_arn(&self.topic_arn)
			.subject(OrderNotification::SUBJECT)
			.message(notification.message())
			.send()
			.await
			.map_err(|e| {
				NotificationError::Publish(format!(
					"Failed to publish to {}: {}",
					self.topic_arn,
					DisplayErrorContext(&e)
				))
			})?;

		tracing::info!(
			order_id = %order_types::truncate_id(&notification.order_id),
			message_id = output.message_id().unwrap_or("unknown"),
			"Order notification published"
		);
		Ok(())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SnsNotifierSchema)
	}
}

/// Configuration schema for SnsNotifier.
pub struct SnsNotifierSchema;

impl ConfigSchema for SnsNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("topic_arn", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(arn) if arn.starts_with("arn:") => Ok(()),
					_ => Err("must be an ARN (arn:...)".to_string()),
				}
			})],
			vec![
				Field::non_empty_string("region"),
				Field::url("endpoint_url"),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create an SNS notifier.
///
/// Configuration parameters:
/// - `topic_arn`: topic receiving order notifications (required)
/// - `region`: AWS region, otherwise taken from the environment
/// - `endpoint_url`: custom endpoint such as LocalStack
pub fn create_notifier(
	config: &toml::Value,
) -> Result<Box<dyn NotificationInterface>, NotificationError> {
	SnsNotifierSchema
		.validate(config)
		.map_err(|e| NotificationError::Configuration(e.to_string()))?;

	let get = |key: &str| config.get(key).and_then(|v| v.as_str()).map(String::from);
	let topic_arn = get("topic_arn")
		.ok_or_else(|| NotificationError::Configuration("topic_arn is required".to_string()))?;

	Ok(Box::new(SnsNotifier::new(
		topic_arn,
		get("region"),
		get("endpoint_url"),
	)))
}

/// Registry for the SNS notification implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "sns";
	type Factory = NotificationFactory;

	fn factory() -> Self::Factory {
		create_notifier
	}
}

impl NotificationRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_topic_arn_required() {
		let empty = toml::Value::Table(toml::map::Map::new());
		let err = create_notifier(&empty).err().unwrap();
		assert!(err.to_string().contains("topic_arn"));
	}

	#[test]
	fn test_topic_arn_format() {
		let config: toml::Value = toml::from_str("topic_arn = \"orders\"").unwrap();
		assert!(create_notifier(&config).is_err());

		let config: toml::Value = toml::from_str(
			"topic_arn = \"arn:aws:sns:us-east-1:000000000000:orders\"\nregion = \"us-east-1\"",
		)
		.unwrap();
		assert!(create_notifier(&config).is_ok());
	}
}
