//! Order API handlers.
//!
//! Orders are submitted as `multipart/form-data` with the text parts
//! `customerName` and `orderAmount` and an optional `invoiceFile` part.

use axum::extract::multipart::Multipart;
use order_core::{OrderEngine, OrderError};
use order_types::{
	APIError, CreateOrderRequest, InvoiceFile, Order, RequestValidationError,
};
use rust_decimal::Decimal;
use std::str::FromStr;

const FIELD_CUSTOMER_NAME: &str = "customerName";
const FIELD_ORDER_AMOUNT: &str = "orderAmount";
const FIELD_INVOICE_FILE: &str = "invoiceFile";

/// Reads a create-order request out of a multipart body.
///
/// Unknown parts are ignored. The returned request has passed validation.
pub async fn parse_create_request(
	mut multipart: Multipart,
) -> Result<CreateOrderRequest, APIError> {
	let mut customer_name: Option<String> = None;
	let mut order_amount: Option<String> = None;
	let mut invoice: Option<InvoiceFile> = None;

	while let Some(field) = multipart
		.next_field()
		.await
		.map_err(|e| APIError::bad_request("INVALID_MULTIPART", format!("Invalid multipart request: {}", e)))?
	{
		let name = field.name().unwrap_or_default().to_string();
		match name.as_str() {
			FIELD_CUSTOMER_NAME => {
				customer_name = Some(field.text().await.map_err(multipart_error)?);
			}
			FIELD_ORDER_AMOUNT => {
				order_amount = Some(field.text().await.map_err(multipart_error)?);
			}
			FIELD_INVOICE_FILE => {
				let filename = field.file_name().unwrap_or_default().to_string();
				let content_type = field.content_type().map(String::from);
				let bytes = field.bytes().await.map_err(multipart_error)?;
				invoice = Some(InvoiceFile {
					filename,
					content_type,
					bytes,
				});
			}
			other => {
				tracing::debug!(field = %other, "Ignoring unknown multipart field");
			}
		}
	}

	let customer_name =
		customer_name.ok_or_else(|| validation_error(RequestValidationError::MissingCustomerName))?;
	let order_amount = parse_amount(order_amount.as_deref())?;

	let mut request = CreateOrderRequest::new(customer_name, order_amount);
	if let Some(invoice) = invoice {
		request = request.with_invoice(invoice);
	}
	request.validate().map_err(validation_error)?;
	Ok(request)
}

fn parse_amount(raw: Option<&str>) -> Result<Decimal, APIError> {
	let raw = raw
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.ok_or_else(|| validation_error(RequestValidationError::MissingOrderAmount))?;
	Decimal::from_str(raw)
		.or_else(|_| Decimal::from_scientific(raw))
		.map_err(|_| validation_error(RequestValidationError::InvalidOrderAmount(raw.to_string())))
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> APIError {
	APIError::bad_request("INVALID_MULTIPART", format!("Invalid multipart field: {}", e))
}

fn validation_error(e: RequestValidationError) -> APIError {
	APIError::bad_request("VALIDATION_ERROR", e.to_string())
}

/// Creates an order and maps engine failures to API errors.
///
/// A notification problem never surfaces here: once the order is saved the
/// caller gets it back, whatever the notifier did.
pub async fn create_order(engine: &OrderEngine, request: CreateOrderRequest) -> Result<Order, APIError> {
	let created = engine.create_order(request).await.map_err(|e| match e {
		OrderError::Validation(e) => validation_error(e),
		OrderError::Blob(cause) => APIError::internal(
			"FILE_PROCESSING_ERROR",
			format!("Error processing file: {}", cause),
		),
		OrderError::Persistence(cause) => APIError::internal(
			"ORDER_CREATION_ERROR",
			format!("Error creating order: {}", cause),
		),
	})?;

	Ok(created.order)
}

/// Fetches one order, answering 404 when it does not exist.
pub async fn get_order_by_id(engine: &OrderEngine, order_id: &str) -> Result<Order, APIError> {
	engine
		.get_order_by_id(order_id)
		.await
		.map_err(retrieval_error)?
		.ok_or_else(|| {
			APIError::not_found(
				"ORDER_NOT_FOUND",
				format!("Order not found with ID: {}", order_id),
			)
		})
}

pub async fn get_all_orders(engine: &OrderEngine) -> Result<Vec<Order>, APIError> {
	engine.get_all_orders().await.map_err(retrieval_error)
}

fn retrieval_error(e: OrderError) -> APIError {
	APIError::internal("ORDER_RETRIEVAL_ERROR", format!("Error retrieving orders: {}", e))
}
