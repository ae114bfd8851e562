//! Amazon S3 blob backend.

use crate::{join_url, object_key, BlobError, BlobFactory, BlobRegistry, BlobStorageInterface};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use order_types::{
	ConfigSchema, Field, ImplementationRegistry, InvoiceFile, Schema, ValidationError,
};
use tokio::sync::OnceCell;

/// Blob backend uploading invoices to an S3 bucket.
///
/// The client is created on first upload.
pub struct S3BlobStorage {
	bucket: String,
	region: Option<String>,
	endpoint_url: Option<String>,
	public_base_url: Option<String>,
	client: OnceCell<Client>,
}

impl S3BlobStorage {
	pub fn new(
		bucket: String,
		region: Option<String>,
		endpoint_url: Option<String>,
		public_base_url: Option<String>,
	) -> Self {
		Self {
			bucket,
			region,
			endpoint_url,
			public_base_url,
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
				// Local S3 emulators generally only serve path-style requests
				let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
					.force_path_style(self.endpoint_url.is_some())
					.build();
				Client::from_conf(s3_config)
			})
			.await
	}

	/// Reference returned for a stored key.
	fn url_for(&self, key: &str) -> String {
		match &self.public_base_url {
			Some(base_url) => join_url(base_url, key),
			None => join_url(&format!("https://{}.s3.amazonaws.com", self.bucket), key),
		}
	}
}

#[async_trait]
impl BlobStorageInterface for S3BlobStorage {
	async fn store(&self, file: &InvoiceFile, order_id: &str) -> Result<String, BlobError> {
		let key = object_key(order_id, &file.filename);

		self.client()
			.await
			.put_object()
			.bucket(&self.bucket)
			.key(&key)
			.body(ByteStream::from(file.bytes.clone()))
			.set_content_type(file.content_type.clone())
			.send()
			.await
			.map_err(|e| {
				BlobError::Upload(format!(
					"Failed to upload s3://{}/{}: {}",
					self.bucket,
					key,
					DisplayErrorContext(&e)
				))
			})?;

		Ok(self.url_for(&key))
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(S3BlobStorageSchema)
	}
}

/// Configuration schema for S3BlobStorage.
pub struct S3BlobStorageSchema;

impl ConfigSchema for S3BlobStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::non_empty_string("bucket")],
			vec![
				Field::non_empty_string("region"),
				Field::url("endpoint_url"),
				Field::url("public_base_url"),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create an S3 blob backend.
///
/// Configuration parameters:
/// - `bucket`: destination bucket (required)
/// - `region`: AWS region, otherwise taken from the environment
/// - `endpoint_url`: custom endpoint such as LocalStack
/// - `public_base_url`: prefix of returned references instead of the bucket URL
pub fn create_blob_storage(
	config: &toml::Value,
) -> Result<Box<dyn BlobStorageInterface>, BlobError> {
	S3BlobStorageSchema
		.validate(config)
		.map_err(|e| BlobError::Configuration(e.to_string()))?;

	let get = |key: &str| config.get(key).and_then(|v| v.as_str()).map(String::from);
	let bucket = get("bucket")
		.ok_or_else(|| BlobError::Configuration("bucket is required".to_string()))?;

	Ok(Box::new(S3BlobStorage::new(
		bucket,
		get("region"),
		get("endpoint_url"),
		get("public_base_url"),
	)))
}

/// Registry for the S3 blob implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "s3";
	type Factory = BlobFactory;

	fn factory() -> Self::Factory {
		create_blob_storage
	}
}

impl BlobRegistry for Registry {}
