//! DynamoDB persistence backend.
//!
//! Each order is one item keyed by the `orderId` string attribute. The
//! amount is stored as a DynamoDB number and the date as an RFC 3339 string.
//! The SDK client is built on first use, so constructing the backend never
//! touches the network or the credential chain.

use crate::{PersistenceError, PersistenceFactory, PersistenceInterface, PersistenceRegistry};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use order_types::{
	ConfigSchema, Field, ImplementationRegistry, Order, Schema, ValidationError,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::OnceCell;

const DEFAULT_TABLE_NAME: &str = "Orders";

const ATTR_ORDER_ID: &str = "orderId";
const ATTR_CUSTOMER_NAME: &str = "customerName";
const ATTR_ORDER_AMOUNT: &str = "orderAmount";
const ATTR_ORDER_DATE: &str = "orderDate";
const ATTR_INVOICE_FILE_URL: &str = "invoiceFileUrl";

type Item = HashMap<String, AttributeValue>;

/// Order store backed by a DynamoDB table.
pub struct DynamoDbPersistence {
	table_name: String,
	region: Option<String>,
	endpoint_url: Option<String>,
	client: OnceCell<Client>,
}

impl DynamoDbPersistence {
	pub fn new(table_name: String, region: Option<String>, endpoint_url: Option<String>) -> Self {
		Self {
			table_name,
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
				let sdk_config = loader.load().await;
				tracing::debug!(table = %self.table_name, "DynamoDB client initialized");
				Client::new(&sdk_config)
			})
			.await
	}
}

#[async_trait]
impl PersistenceInterface for DynamoDbPersistence {
	async fn save(&self, order: &Order) -> Result<Order, PersistenceError> {
		self.client()
			.await
			.put_item()
			.table_name(&self.table_name)
			.set_item(Some(order_to_item(order)))
			.send()
			.await
			.map_err(|e| {
				PersistenceError::Backend(format!(
					"Failed to put order into {}: {}",
					self.table_name,
					DisplayErrorContext(&e)
				))
			})?;
		Ok(order.clone())
	}

	async fn find_by_id(&self, order_id: &str) -> Result<Option<Order>, PersistenceError> {
		let output = self
			.client()
			.await
			.get_item()
			.table_name(&self.table_name)
			.key(ATTR_ORDER_ID, AttributeValue::S(order_id.to_string()))
			.send()
			.await
			.map_err(|e| {
				PersistenceError::Backend(format!(
					"Failed to get order from {}: {}",
					self.table_name,
					DisplayErrorContext(&e)
				))
			})?;

		output.item().map(item_to_order).transpose()
	}

	async fn find_all(&self) -> Result<Vec<Order>, PersistenceError> {
		let client = self.client().await;
		let mut orders = Vec::new();
		let mut start_key: Option<Item> = None;

		// Scan pages until DynamoDB stops returning a continuation key
		loop {
			let output = client
				.scan()
				.table_name(&self.table_name)
				.set_exclusive_start_key(start_key.take())
				.send()
				.await
				.map_err(|e| {
					PersistenceError::Backend(format!(
						"Failed to scan {}: {}",
						self.table_name,
						DisplayErrorContext(&e)
					))
				})?;

			for item in output.items() {
				orders.push(item_to_order(item)?);
			}

			match output.last_evaluated_key() {
				Some(key) if !key.is_empty() => start_key = Some(key.clone()),
				_ => break,
			}
		}

		Ok(orders)
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(DynamoDbPersistenceSchema)
	}
}

/// Converts an order into a DynamoDB item.
fn order_to_item(order: &Order) -> Item {
	let mut item = HashMap::with_capacity(5);
	item.insert(
		ATTR_ORDER_ID.to_string(),
		AttributeValue::S(order.order_id().to_string()),
	);
	item.insert(
		ATTR_CUSTOMER_NAME.to_string(),
		AttributeValue::S(order.customer_name().to_string()),
	);
	item.insert(
		ATTR_ORDER_AMOUNT.to_string(),
		AttributeValue::N(order.order_amount().to_string()),
	);
	item.insert(
		ATTR_ORDER_DATE.to_string(),
		AttributeValue::S(order.order_date().to_rfc3339()),
	);
	if let Some(url) = order.invoice_file_url() {
		item.insert(
			ATTR_INVOICE_FILE_URL.to_string(),
			AttributeValue::S(url.to_string()),
		);
	}
	item
}

/// Rebuilds an order from a DynamoDB item.
fn item_to_order(item: &Item) -> Result<Order, PersistenceError> {
	let order_id = string_attr(item, ATTR_ORDER_ID)?;
	let customer_name = string_attr(item, ATTR_CUSTOMER_NAME)?;

	let amount = item
		.get(ATTR_ORDER_AMOUNT)
		.and_then(|v| v.as_n().ok())
		.ok_or_else(|| missing(ATTR_ORDER_AMOUNT))?;
	let order_amount = amount.parse::<Decimal>().map_err(|e| {
		PersistenceError::Serialization(format!("Invalid {} '{}': {}", ATTR_ORDER_AMOUNT, amount, e))
	})?;

	let date = string_attr(item, ATTR_ORDER_DATE)?;
	let order_date = DateTime::parse_from_rfc3339(&date)
		.map_err(|e| {
			PersistenceError::Serialization(format!("Invalid {} '{}': {}", ATTR_ORDER_DATE, date, e))
		})?
		.with_timezone(&Utc);

	let invoice_file_url = item
		.get(ATTR_INVOICE_FILE_URL)
		.and_then(|v| v.as_s().ok())
		.cloned();

	Ok(Order::from_parts(
		order_id,
		customer_name,
		order_amount,
		order_date,
		invoice_file_url,
	))
}

fn string_attr(item: &Item, name: &str) -> Result<String, PersistenceError> {
	item.get(name)
		.and_then(|v| v.as_s().ok())
		.cloned()
		.ok_or_else(|| missing(name))
}

fn missing(name: &str) -> PersistenceError {
	PersistenceError::Serialization(format!("Item is missing attribute '{}'", name))
}

/// Configuration schema for DynamoDbPersistence.
pub struct DynamoDbPersistenceSchema;

impl ConfigSchema for DynamoDbPersistenceSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::non_empty_string("table_name"),
				Field::non_empty_string("region"),
				Field::url("endpoint_url"),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a DynamoDB persistence backend.
///
/// Configuration parameters:
/// - `table_name`: table holding the orders (default: "Orders")
/// - `region`: AWS region, otherwise taken from the environment
/// - `endpoint_url`: custom endpoint such as DynamoDB Local
pub fn create_persistence(
	config: &toml::Value,
) -> Result<Box<dyn PersistenceInterface>, PersistenceError> {
	DynamoDbPersistenceSchema
		.validate(config)
		.map_err(|e| PersistenceError::Configuration(e.to_string()))?;

	let get = |key: &str| config.get(key).and_then(|v| v.as_str()).map(String::from);
	let table_name = get("table_name").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string());

	Ok(Box::new(DynamoDbPersistence::new(
		table_name,
		get("region"),
		get("endpoint_url"),
	)))
}

/// Registry for the DynamoDB persistence implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "dynamodb";
	type Factory = PersistenceFactory;

	fn factory() -> Self::Factory {
		create_persistence
	}
}

impl PersistenceRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	fn table(entries: &[(&str, &str)]) -> toml::Value {
		let mut map = toml::map::Map::new();
		for (k, v) in entries {
			map.insert(k.to_string(), toml::Value::String(v.to_string()));
		}
		toml::Value::Table(map)
	}

	#[test]
	fn test_item_round_trip() {
		let order = Order::new("Alice", Decimal::new(4250, 2))
			.with_invoice_file_url("https://orders.s3.amazonaws.com/invoices/x_a.pdf");

		let item = order_to_item(&order);
		assert_eq!(
			item.get(ATTR_ORDER_AMOUNT),
			Some(&AttributeValue::N("42.50".to_string()))
		);

		let restored = item_to_order(&item).unwrap();
		assert_eq!(restored, order);
	}

	#[test]
	fn test_item_without_invoice() {
		let order = Order::new("Bob", Decimal::new(7, 0));
		let item = order_to_item(&order);
		assert!(!item.contains_key(ATTR_INVOICE_FILE_URL));
		assert_eq!(item_to_order(&item).unwrap().invoice_file_url(), None);
	}

	#[test]
	fn test_item_with_bad_amount() {
		let mut item = order_to_item(&Order::new("Carol", Decimal::ONE));
		item.insert(
			ATTR_ORDER_AMOUNT.to_string(),
			AttributeValue::S("1".to_string()),
		);
		assert!(matches!(
			item_to_order(&item),
			Err(PersistenceError::Serialization(_))
		));
	}

	#[test]
	fn test_item_missing_id() {
		let mut item = order_to_item(&Order::new("Dave", Decimal::ONE));
		item.remove(ATTR_ORDER_ID);
		let err = item_to_order(&item).unwrap_err();
		assert!(err.to_string().contains("orderId"));
	}

	#[test]
	fn test_factory_defaults() {
		assert!(create_persistence(&table(&[])).is_ok());
		assert!(create_persistence(&table(&[
			("table_name", "Orders"),
			("region", "eu-west-1"),
			("endpoint_url", "http://localhost:8000"),
		]))
		.is_ok());
	}

	#[test]
	fn test_factory_rejects_bad_config() {
		assert!(create_persistence(&table(&[("endpoint_url", "localhost:8000")])).is_err());
		assert!(create_persistence(&table(&[("table_name", "")])).is_err());
		assert!(create_persistence(&table(&[("table", "Orders")])).is_err());
	}
}
