//! Filesystem blob backend.
//!
//! Writes each invoice into a single directory as `{order_id}_{filename}`.
//! Writes go to a temporary sibling first and are renamed into place, so a
//! reader never sees a half-written invoice.

use crate::{
	join_url, object_key, object_name, BlobError, BlobFactory, BlobRegistry, BlobStorageInterface,
};
use async_trait::async_trait;
use order_types::{
	ConfigSchema, Field, FieldType, ImplementationRegistry, InvoiceFile, Schema, ValidationError,
};
use std::path::PathBuf;
use tokio::fs;

const DEFAULT_STORAGE_PATH: &str = "./data/invoices";

/// Blob backend storing invoices on the local filesystem.
pub struct FileBlobStorage {
	storage_path: PathBuf,
	public_base_url: Option<String>,
}

impl FileBlobStorage {
	pub fn new(storage_path: PathBuf, public_base_url: Option<String>) -> Self {
		Self {
			storage_path,
			public_base_url,
		}
	}

	fn file_path(&self, order_id: &str, filename: &str) -> PathBuf {
		self.storage_path.join(object_name(order_id, filename))
	}
}

#[async_trait]
impl BlobStorageInterface for FileBlobStorage {
	async fn store(&self, file: &InvoiceFile, order_id: &str) -> Result<String, BlobError> {
		let path = self.file_path(order_id, &file.filename);

		fs::create_dir_all(&self.storage_path)
			.await
			.map_err(|e| BlobError::Io(format!("{}: {}", self.storage_path.display(), e)))?;

		let mut temp_path = path.clone().into_os_string();
		temp_path.push(".tmp");
		let temp_path = PathBuf::from(temp_path);

		fs::write(&temp_path, &file.bytes)
			.await
			.map_err(|e| BlobError::Io(format!("{}: {}", temp_path.display(), e)))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| BlobError::Io(format!("{}: {}", path.display(), e)))?;

		if let Some(base_url) = &self.public_base_url {
			return Ok(join_url(base_url, &object_key(order_id, &file.filename)));
		}

		let absolute = fs::canonicalize(&path)
			.await
			.map_err(|e| BlobError::Io(format!("{}: {}", path.display(), e)))?;
		Ok(format!("file://{}", absolute.display()))
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileBlobStorageSchema)
	}
}

/// Configuration schema for FileBlobStorage.
pub struct FileBlobStorageSchema;

impl ConfigSchema for FileBlobStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("storage_path", FieldType::String),
				Field::url("public_base_url"),
			],
		);
		schema.validate(config)
	}
}

/// Factory function to create a filesystem blob backend.
///
/// Configuration parameters:
/// - `storage_path`: directory receiving the invoices (default: "./data/invoices")
/// - `public_base_url`: prefix of returned references, otherwise a `file://` URL
pub fn create_blob_storage(
	config: &toml::Value,
) -> Result<Box<dyn BlobStorageInterface>, BlobError> {
	FileBlobStorageSchema
		.validate(config)
		.map_err(|e| BlobError::Configuration(e.to_string()))?;

	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_STORAGE_PATH);
	let public_base_url = config
		.get("public_base_url")
		.and_then(|v| v.as_str())
		.map(String::from);

	Ok(Box::new(FileBlobStorage::new(
		PathBuf::from(storage_path),
		public_base_url,
	)))
}

/// Registry for the filesystem blob implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = BlobFactory;

	fn factory() -> Self::Factory {
		create_blob_storage
	}
}

impl BlobRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use bytes::Bytes;
	use tempfile::TempDir;

	fn invoice(name: &str, data: &'static [u8]) -> InvoiceFile {
		InvoiceFile {
			filename: name.to_string(),
			content_type: None,
			bytes: Bytes::from_static(data),
		}
	}

	#[tokio::test]
	async fn test_store_writes_bytes() {
		let temp_dir = TempDir::new().unwrap();
		let dir = temp_dir.path().join("nested");
		let storage = FileBlobStorage::new(dir.clone(), None);

		let url = storage
			.store(&invoice("invoice.pdf", b"%PDF-1.4 data"), "order-1")
			.await
			.unwrap();

		let written = dir.join("order-1_invoice.pdf");
		assert_eq!(std::fs::read(&written).unwrap(), b"%PDF-1.4 data");
		assert!(url.starts_with("file://"));
		assert!(url.ends_with("order-1_invoice.pdf"));
		assert!(!dir.join("order-1_invoice.pdf.tmp").exists());
	}

	#[tokio::test]
	async fn test_store_with_public_base_url() {
		let temp_dir = TempDir::new().unwrap();
		let storage = FileBlobStorage::new(
			temp_dir.path().to_path_buf(),
			Some("http://localhost:3001".to_string()),
		);

		let url = storage
			.store(&invoice("sub/dir.pdf", b"x"), "o")
			.await
			.unwrap();
		assert_eq!(url, "http://localhost:3001/invoices/o_sub_dir.pdf");
		assert!(temp_dir.path().join("o_sub_dir.pdf").exists());
	}

	#[tokio::test]
	async fn test_store_overwrites_same_name() {
		let temp_dir = TempDir::new().unwrap();
		let storage = FileBlobStorage::new(temp_dir.path().to_path_buf(), None);

		storage.store(&invoice("a.pdf", b"first"), "o").await.unwrap();
		storage.store(&invoice("a.pdf", b"second"), "o").await.unwrap();

		let written = std::fs::read(temp_dir.path().join("o_a.pdf")).unwrap();
		assert_eq!(written, b"second");
	}

	#[tokio::test]
	async fn test_unwritable_path_is_io_error() {
		let temp_dir = TempDir::new().unwrap();
		let blocker = temp_dir.path().join("blocker");
		std::fs::write(&blocker, b"not a directory").unwrap();

		let storage = FileBlobStorage::new(blocker.join("invoices"), None);
		let result = storage.store(&invoice("a.pdf", b"x"), "o").await;
		assert!(matches!(result, Err(BlobError::Io(_))));
	}

	#[test]
	fn test_factory_config() {
		let config: toml::Value = toml::from_str("storage_path = \"/tmp/x\"").unwrap();
		assert!(create_blob_storage(&config).is_ok());

		let config: toml::Value = toml::from_str("storage_path = 3").unwrap();
		assert!(create_blob_storage(&config).is_err());
	}
}
