//! Blob storage module for the order service.
//!
//! Stores the invoice attached to an order and hands back a reference that
//! the order keeps as its `invoiceFileUrl`. Every backend lays objects out
//! under the same key so references stay comparable across environments.

use async_trait::async_trait;
use order_types::{ConfigSchema, ImplementationRegistry, InvoiceFile};
use thiserror::Error;

pub mod implementations {
	pub mod file;
	pub mod mock;
	pub mod s3;
}

/// Prefix shared by every invoice object key.
pub const INVOICE_PREFIX: &str = "invoices";

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum BlobError {
	/// Reading or writing the invoice bytes failed locally.
	#[error("I/O error: {0}")]
	Io(String),
	/// The remote store rejected the upload.
	#[error("Upload error: {0}")]
	Upload(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for invoice storage backends.
#[async_trait]
pub trait BlobStorageInterface: Send + Sync {
	/// Stores the invoice of an order and returns its reference.
	async fn store(&self, file: &InvoiceFile, order_id: &str) -> Result<String, BlobError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for blob storage factory functions.
pub type BlobFactory = fn(&toml::Value) -> Result<Box<dyn BlobStorageInterface>, BlobError>;

/// Registry trait for blob storage implementations.
pub trait BlobRegistry: ImplementationRegistry<Factory = BlobFactory> {}

/// Get all registered blob storage implementations.
pub fn get_all_implementations() -> Vec<(&'static str, BlobFactory)> {
	use implementations::{file, mock, s3};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(mock::Registry::NAME, mock::Registry::factory()),
		(s3::Registry::NAME, s3::Registry::factory()),
	]
}

/// Makes a client supplied file name safe to embed in a key or path.
///
/// Path separators become `_`. A blank name falls back to `invoice`.
pub fn sanitize_filename(filename: &str) -> String {
	let trimmed = filename.trim();
	if trimmed.is_empty() {
		return "invoice".to_string();
	}
	trimmed.replace(['/', '\\'], "_")
}

/// Object name of an invoice without the prefix: `{order_id}_{filename}`.
pub fn object_name(order_id: &str, filename: &str) -> String {
	format!("{}_{}", order_id, sanitize_filename(filename))
}

/// Full object key: `invoices/{order_id}_{filename}`.
pub fn object_key(order_id: &str, filename: &str) -> String {
	format!("{}/{}", INVOICE_PREFIX, object_name(order_id, filename))
}

/// Percent-encodes each segment of a key so it can sit in a URL path.
pub(crate) fn url_path(key: &str) -> String {
	key.split('/')
		.map(|segment| urlencoding::encode(segment).into_owned())
		.collect::<Vec<_>>()
		.join("/")
}

/// Joins a base URL and a key with exactly one slash between them.
///
/// The key is percent-encoded; the base URL is taken as is.
pub(crate) fn join_url(base_url: &str, key: &str) -> String {
	format!("{}/{}", base_url.trim_end_matches('/'), url_path(key))
}

/// High-level blob storage service used by the order engine.
pub struct BlobService {
	name: String,
	backend: Box<dyn BlobStorageInterface>,
}

impl BlobService {
	pub fn new(name: impl Into<String>, backend: Box<dyn BlobStorageInterface>) -> Self {
		Self {
			name: name.into(),
			backend,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Stores an invoice and returns the reference to record on the order.
	pub async fn store(&self, file: &InvoiceFile, order_id: &str) -> Result<String, BlobError> {
		let url = self.backend.store(file, order_id).await?;
		tracing::debug!(
			backend = %self.name,
			order_id = %order_types::truncate_id(order_id),
			size = file.bytes.len(),
			url = %url,
			"Invoice stored"
		);
		Ok(url)
	}
}
