//! Mock blob backend.
//!
//! Performs no I/O. Returns the URL the object would have in a bucket, which
//! keeps local orders looking like production ones.

use crate::{join_url, object_key, BlobError, BlobFactory, BlobRegistry, BlobStorageInterface};
use async_trait::async_trait;
use order_types::{
	ConfigSchema, Field, ImplementationRegistry, InvoiceFile, Schema, ValidationError,
};

const DEFAULT_BASE_URL: &str = "https://mock-bucket.s3.amazonaws.com";

/// Blob backend that only computes references.
pub struct MockBlobStorage {
	base_url: String,
}

impl MockBlobStorage {
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into(),
		}
	}
}

impl Default for MockBlobStorage {
	fn default() -> Self {
		Self::new(DEFAULT_BASE_URL)
	}
}

#[async_trait]
impl BlobStorageInterface for MockBlobStorage {
	async fn store(&self, file: &InvoiceFile, order_id: &str) -> Result<String, BlobError> {
		let key = object_key(order_id, &file.filename);
		tracing::info!(
			order_id = %order_types::truncate_id(order_id),
			key = %key,
			size = file.bytes.len(),
			"Mock upload, bytes discarded"
		);
		Ok(join_url(&self.base_url, &key))
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MockBlobStorageSchema)
	}
}

/// Configuration schema for MockBlobStorage.
pub struct MockBlobStorageSchema;

impl ConfigSchema for MockBlobStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![Field::url("base_url")]).validate(config)
	}
}

/// Factory function to create a mock blob backend.
///
/// Configuration parameters:
/// - `base_url`: prefix of returned references (default: "https://mock-bucket.s3.amazonaws.com")
pub fn create_blob_storage(
	config: &toml::Value,
) -> Result<Box<dyn BlobStorageInterface>, BlobError> {
	MockBlobStorageSchema
		.validate(config)
		.map_err(|e| BlobError::Configuration(e.to_string()))?;

	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_BASE_URL);
	Ok(Box::new(MockBlobStorage::new(base_url)))
}

/// Registry for the mock blob implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "mock";
	type Factory = BlobFactory;

	fn factory() -> Self::Factory {
		create_blob_storage
	}
}

impl BlobRegistry for Registry {}
