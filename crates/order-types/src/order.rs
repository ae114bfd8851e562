//! Order entity and the inputs that produce it.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// An order record.
///
/// The identifier and creation timestamp are fixed when the value is built
/// and have no setters. The invoice URL can only be attached by consuming the
/// order, which the engine does before handing it to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	order_id: String,
	customer_name: String,
	#[serde(with = "rust_decimal::serde::float")]
	order_amount: Decimal,
	order_date: DateTime<Utc>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	invoice_file_url: Option<String>,
}

impl Order {
	/// Builds a fresh order with a random v4 id and the current instant.
	pub fn new(customer_name: impl Into<String>, order_amount: Decimal) -> Self {
		Self {
			order_id: Uuid::new_v4().to_string(),
			customer_name: customer_name.into(),
			order_amount,
			order_date: Utc::now(),
			invoice_file_url: None,
		}
	}

	/// Rebuilds an order that was previously stored by a backend.
	pub fn from_parts(
		order_id: String,
		customer_name: String,
		order_amount: Decimal,
		order_date: DateTime<Utc>,
		invoice_file_url: Option<String>,
	) -> Self {
		Self {
			order_id,
			customer_name,
			order_amount,
			order_date,
			invoice_file_url,
		}
	}

	/// Attaches the reference returned by blob storage.
	pub fn with_invoice_file_url(mut self, url: impl Into<String>) -> Self {
		self.invoice_file_url = Some(url.into());
		self
	}

	pub fn order_id(&self) -> &str {
		&self.order_id
	}

	pub fn customer_name(&self) -> &str {
		&self.customer_name
	}

	pub fn order_amount(&self) -> Decimal {
		self.order_amount
	}

	pub fn order_date(&self) -> DateTime<Utc> {
		self.order_date
	}

	pub fn invoice_file_url(&self) -> Option<&str> {
		self.invoice_file_url.as_deref()
	}
}

/// Errors raised when a create-order request is not acceptable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestValidationError {
	#[error("Customer name is required")]
	MissingCustomerName,
	#[error("Order amount is required")]
	MissingOrderAmount,
	#[error("Order amount is not a valid number: {0}")]
	InvalidOrderAmount(String),
	#[error("Order amount must be positive, got {0}")]
	NonPositiveOrderAmount(Decimal),
}

/// An uploaded invoice file.
#[derive(Debug, Clone)]
pub struct InvoiceFile {
	/// Original file name as sent by the client.
	pub filename: String,
	/// MIME type declared by the client, if any.
	pub content_type: Option<String>,
	pub bytes: Bytes,
}

impl InvoiceFile {
	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}
}

/// Input to the order engine.
#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
	pub customer_name: String,
	pub order_amount: Decimal,
	pub invoice: Option<InvoiceFile>,
}

impl CreateOrderRequest {
	pub fn new(customer_name: impl Into<String>, order_amount: Decimal) -> Self {
		Self {
			customer_name: customer_name.into(),
			order_amount,
			invoice: None,
		}
	}

	pub fn with_invoice(mut self, invoice: InvoiceFile) -> Self {
		self.invoice = Some(invoice);
		self
	}

	/// Checks the name is not blank and the amount is strictly positive.
	pub fn validate(&self) -> Result<(), RequestValidationError> {
		if self.customer_name.trim().is_empty() {
			return Err(RequestValidationError::MissingCustomerName);
		}
		if self.order_amount <= Decimal::ZERO {
			return Err(RequestValidationError::NonPositiveOrderAmount(
				self.order_amount,
			));
		}
		Ok(())
	}

	/// Returns the invoice only when it carries at least one byte.
	pub fn non_empty_invoice(&self) -> Option<&InvoiceFile> {
		self.invoice.as_ref().filter(|file| !file.is_empty())
	}
}

/// Payload announced once an order has been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderNotification {
	pub order_id: String,
	pub customer_name: String,
	#[serde(with = "rust_decimal::serde::float")]
	pub order_amount: Decimal,
}

impl OrderNotification {
	pub const SUBJECT: &'static str = "New Order Notification";

	/// Human readable body shared by every notifier.
	pub fn message(&self) -> String {
		format!(
			"New Order Created!\nOrder ID: {}\nCustomer: {}\nAmount: ${:.2}",
			self.order_id, self.customer_name, self.order_amount
		)
	}
}

impl From<&Order> for OrderNotification {
	fn from(order: &Order) -> Self {
		Self {
			order_id: order.order_id().to_string(),
			customer_name: order.customer_name().to_string(),
			order_amount: order.order_amount(),
		}
	}
}
