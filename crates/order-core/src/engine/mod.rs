//! Order engine sequencing the side effects of order creation.
//!
//! Creating an order runs these steps in order:
//! 1. validate the request and build the order with a fresh id and timestamp
//! 2. store the invoice, when one with content was supplied
//! 3. save the order
//! 4. send the notification, best effort
//!
//! A port without a wired backend is skipped rather than treated as an
//! error. A failing blob or persistence backend aborts the call; a failing
//! or slow notifier does not. The notification step can be bounded with
//! [`OrderEngine::with_notification_timeout`], and an elapsed bound is
//! reported like any other notification failure.

mod outcome;

pub use outcome::{NotificationOutcome, OrderCreated, PersistenceOutcome};

use order_blob::BlobService;
use order_notification::{NotificationError, NotificationService};
use order_persistence::PersistenceService;
use order_types::{
	truncate_id, CreateOrderRequest, Order, OrderNotification, RequestValidationError,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

/// Errors returned by the order engine.
#[derive(Debug, Error)]
pub enum OrderError {
	#[error("Validation error: {0}")]
	Validation(#[from] RequestValidationError),
	/// The invoice could not be stored. Nothing was persisted.
	#[error("{0}")]
	Blob(String),
	#[error("{0}")]
	Persistence(String),
}

/// Coordinates the ports involved in creating and reading orders.
///
/// The engine is immutable once built and is shared between requests
/// behind an `Arc`.
pub struct OrderEngine {
	persistence: Option<Arc<PersistenceService>>,
	blob: Option<Arc<BlobService>>,
	notification: Option<Arc<NotificationService>>,
	notification_timeout: Option<Duration>,
}

impl OrderEngine {
	pub fn new(
		persistence: Option<Arc<PersistenceService>>,
		blob: Option<Arc<BlobService>>,
		notification: Option<Arc<NotificationService>>,
	) -> Self {
		Self {
			persistence,
			blob,
			notification,
			notification_timeout: None,
		}
	}

	/// Bounds the time spent sending the new-order notification.
	pub fn with_notification_timeout(mut self, timeout: Duration) -> Self {
		self.notification_timeout = Some(timeout);
		self
	}

	/// Name of the persistence backend in use, if any.
	pub fn persistence_backend(&self) -> Option<&str> {
		self.persistence.as_deref().map(PersistenceService::name)
	}

	pub fn blob_backend(&self) -> Option<&str> {
		self.blob.as_deref().map(BlobService::name)
	}

	pub fn notification_backend(&self) -> Option<&str> {
		self.notification.as_deref().map(NotificationService::name)
	}

	/// Creates an order from a request.
	#[instrument(skip_all, fields(order_id))]
	pub async fn create_order(&self, request: CreateOrderRequest) -> Result<OrderCreated, OrderError> {
		request.validate()?;

		let mut order = Order::new(request.customer_name.clone(), request.order_amount);
		tracing::Span::current().record("order_id", truncate_id(order.order_id()).as_str());

		if let Some(invoice) = request.non_empty_invoice() {
			match &self.blob {
				Some(blob) => {
					let url = blob
						.store(invoice, order.order_id())
						.await
						.map_err(|e| OrderError::Blob(e.to_string()))?;
					order = order.with_invoice_file_url(url);
				}
				None => {
					tracing::warn!(
						filename = %invoice.filename,
						"No blob storage backend wired, invoice not stored"
					);
				}
			}
		}

		let (order, persistence) = match &self.persistence {
			Some(service) => {
				let saved = service
					.save(&order)
					.await
					.map_err(|e| OrderError::Persistence(e.to_string()))?;
				(saved, PersistenceOutcome::Persisted)
			}
			None => {
				tracing::warn!("No persistence backend wired, returning order unpersisted");
				(order, PersistenceOutcome::Unpersisted)
			}
		};

		let notification = self.notify(&order).await;

		tracing::info!(
			customer = %order.customer_name(),
			amount = %order.order_amount(),
			invoice = order.invoice_file_url().is_some(),
			persistence = %persistence,
			notification = %notification,
			"Order created"
		);

		Ok(OrderCreated {
			order,
			persistence,
			notification,
		})
	}

	async fn notify(&self, order: &Order) -> NotificationOutcome {
		let Some(service) = &self.notification else {
			tracing::debug!("No notification backend wired, skipping notification");
			return NotificationOutcome::Skipped;
		};

		let notification = OrderNotification::from(order);
		let result = match self.notification_timeout {
			Some(timeout) => tokio::time::timeout(timeout, service.notify(&notification))
				.await
				.unwrap_or_else(|_| {
					Err(NotificationError::Publish(format!(
						"timed out after {}ms",
						timeout.as_millis()
					)))
				}),
			None => service.notify(&notification).await,
		};

		match result {
			Ok(()) => NotificationOutcome::Sent,
			Err(e) => {
				tracing::error!(
					backend = %service.name(),
					error = %e,
					"Failed to send order notification"
				);
				NotificationOutcome::Failed(e.to_string())
			}
		}
	}

	/// Looks up one order. Without a persistence backend nothing is found.
	#[instrument(skip_all, fields(order_id = %truncate_id(order_id)))]
	pub async fn get_order_by_id(&self, order_id: &str) -> Result<Option<Order>, OrderError> {
		match &self.persistence {
			Some(service) => service
				.find_by_id(order_id)
				.await
				.map_err(|e| OrderError::Persistence(e.to_string())),
			None => Ok(None),
		}
	}

	/// Lists every order. Without a persistence backend the list is empty.
	pub async fn get_all_orders(&self) -> Result<Vec<Order>, OrderError> {
		match &self.persistence {
			Some(service) => service
				.find_all()
				.await
				.map_err(|e| OrderError::Persistence(e.to_string())),
			None => Ok(Vec::new()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use bytes::Bytes;
	use order_blob::implementations::mock::MockBlobStorage;
	use order_blob::{BlobError, BlobStorageInterface};
	use order_notification::NotificationInterface;
	use order_persistence::implementations::memory::MemoryPersistence;
	use order_persistence::{PersistenceError, PersistenceInterface};
	use order_types::{ConfigSchema, InvoiceFile, ValidationError};
	use rust_decimal::Decimal;
	use std::collections::HashSet;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Mutex;

	struct AcceptAll;

	impl ConfigSchema for AcceptAll {
		fn validate(&self, _config: &toml::Value) -> Result<(), ValidationError> {
			Ok(())
		}
	}

	struct FailingBlob;

	#[async_trait]
	impl BlobStorageInterface for FailingBlob {
		async fn store(&self, _file: &InvoiceFile, _order_id: &str) -> Result<String, BlobError> {
			Err(BlobError::Io("disk full".to_string()))
		}

		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(AcceptAll)
		}
	}

	struct FailingPersistence;

	#[async_trait]
	impl PersistenceInterface for FailingPersistence {
		async fn save(&self, _order: &Order) -> Result<Order, PersistenceError> {
			Err(PersistenceError::Backend("table missing".to_string()))
		}

		async fn find_by_id(&self, _order_id: &str) -> Result<Option<Order>, PersistenceError> {
			Err(PersistenceError::Backend("table missing".to_string()))
		}

		async fn find_all(&self) -> Result<Vec<Order>, PersistenceError> {
			Err(PersistenceError::Backend("table missing".to_string()))
		}

		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(AcceptAll)
		}
	}

	/// Records every notification, optionally failing after recording.
	#[derive(Clone, Default)]
	struct RecordingNotifier {
		sent: Arc<Mutex<Vec<OrderNotification>>>,
		fail: bool,
	}

	#[async_trait]
	impl NotificationInterface for RecordingNotifier {
		async fn notify(&self, notification: &OrderNotification) -> Result<(), NotificationError> {
			self.sent.lock().unwrap().push(notification.clone());
			if self.fail {
				Err(NotificationError::Publish("topic not found".to_string()))
			} else {
				Ok(())
			}
		}

		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(AcceptAll)
		}
	}

	/// Never answers within any reasonable bound.
	struct StalledNotifier;

	#[async_trait]
	impl NotificationInterface for StalledNotifier {
		async fn notify(&self, _notification: &OrderNotification) -> Result<(), NotificationError> {
			tokio::time::sleep(Duration::from_secs(3600)).await;
			Ok(())
		}

		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(AcceptAll)
		}
	}

	/// Counts uploads and returns a fixed URL.
	#[derive(Clone, Default)]
	struct CountingBlob {
		calls: Arc<AtomicUsize>,
	}

	#[async_trait]
	impl BlobStorageInterface for CountingBlob {
		async fn store(&self, _file: &InvoiceFile, order_id: &str) -> Result<String, BlobError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Ok(format!("https://blobs.test/invoices/{}", order_id))
		}

		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			Box::new(AcceptAll)
		}
	}

	fn memory() -> Option<Arc<PersistenceService>> {
		Some(Arc::new(PersistenceService::new(
			"memory",
			Box::new(MemoryPersistence::new()),
		)))
	}

	fn mock_blob() -> Option<Arc<BlobService>> {
		Some(Arc::new(BlobService::new(
			"mock",
			Box::new(MockBlobStorage::default()),
		)))
	}

	fn notifier(recorder: &RecordingNotifier) -> Option<Arc<NotificationService>> {
		Some(Arc::new(NotificationService::new(
			"recording",
			Box::new(recorder.clone()),
		)))
	}

	fn request(name: &str, cents: i64) -> CreateOrderRequest {
		CreateOrderRequest::new(name, Decimal::new(cents, 2))
	}

	fn invoice(bytes: &'static [u8]) -> InvoiceFile {
		InvoiceFile {
			filename: "invoice.pdf".to_string(),
			content_type: Some("application/pdf".to_string()),
			bytes: Bytes::from_static(bytes),
		}
	}

	#[tokio::test]
	async fn test_create_persist_and_notify() {
		let recorder = RecordingNotifier::default();
		let engine = OrderEngine::new(memory(), mock_blob(), notifier(&recorder));

		let created = engine.create_order(request("Alice", 4250)).await.unwrap();
		assert_eq!(created.persistence, PersistenceOutcome::Persisted);
		assert_eq!(created.notification, NotificationOutcome::Sent);
		assert!(created.is_complete());
		assert_eq!(created.order.customer_name(), "Alice");
		assert_eq!(created.order.invoice_file_url(), None);

		let found = engine
			.get_order_by_id(created.order.order_id())
			.await
			.unwrap();
		assert_eq!(found, Some(created.order.clone()));

		let sent = recorder.sent.lock().unwrap();
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0], OrderNotification::from(&created.order));
	}

	#[tokio::test]
	async fn test_ids_are_unique() {
		let engine = OrderEngine::new(memory(), None, None);
		let mut ids = HashSet::new();
		for i in 1..=20 {
			let created = engine.create_order(request("Bulk", i)).await.unwrap();
			assert!(!created.order.order_id().is_empty());
			assert!(ids.insert(created.order.order_id().to_string()));
		}
		assert_eq!(engine.get_all_orders().await.unwrap().len(), 20);
	}

	#[tokio::test]
	async fn test_invalid_request_has_no_side_effects() {
		let recorder = RecordingNotifier::default();
		let blob = CountingBlob::default();
		let engine = OrderEngine::new(
			memory(),
			Some(Arc::new(BlobService::new("counting", Box::new(blob.clone())))),
			notifier(&recorder),
		);

		let negative = request("Alice", -500).with_invoice(invoice(b"%PDF"));
		assert!(matches!(
			engine.create_order(negative).await,
			Err(OrderError::Validation(_))
		));
		let blank = request("   ", 100);
		assert!(matches!(
			engine.create_order(blank).await,
			Err(OrderError::Validation(_))
		));

		assert!(engine.get_all_orders().await.unwrap().is_empty());
		assert_eq!(blob.calls.load(Ordering::SeqCst), 0);
		assert!(recorder.sent.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_invoice_url_recorded() {
		let engine = OrderEngine::new(memory(), mock_blob(), None);

		let created = engine
			.create_order(request("Alice", 100).with_invoice(invoice(b"%PDF-1.4")))
			.await
			.unwrap();
		let expected = format!(
			"https://mock-bucket.s3.amazonaws.com/invoices/{}_invoice.pdf",
			created.order.order_id()
		);
		assert_eq!(created.order.invoice_file_url(), Some(expected.as_str()));

		let found = engine
			.get_order_by_id(created.order.order_id())
			.await
			.unwrap()
			.unwrap();
		assert_eq!(found.invoice_file_url(), Some(expected.as_str()));
	}

	#[tokio::test]
	async fn test_empty_invoice_is_not_uploaded() {
		let blob = CountingBlob::default();
		let engine = OrderEngine::new(
			memory(),
			Some(Arc::new(BlobService::new("counting", Box::new(blob.clone())))),
			None,
		);

		let created = engine
			.create_order(request("Alice", 100).with_invoice(invoice(b"")))
			.await
			.unwrap();
		assert_eq!(created.order.invoice_file_url(), None);
		assert_eq!(blob.calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn test_blob_failure_persists_nothing() {
		let recorder = RecordingNotifier::default();
		let engine = OrderEngine::new(
			memory(),
			Some(Arc::new(BlobService::new("failing", Box::new(FailingBlob)))),
			notifier(&recorder),
		);

		let result = engine
			.create_order(request("Alice", 100).with_invoice(invoice(b"%PDF")))
			.await;
		match result {
			Err(OrderError::Blob(message)) => assert!(message.contains("disk full")),
			other => panic!("expected blob error, got {:?}", other),
		}
		assert!(engine.get_all_orders().await.unwrap().is_empty());
		assert!(recorder.sent.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_persistence_failure_is_fatal() {
		let recorder = RecordingNotifier::default();
		let engine = OrderEngine::new(
			Some(Arc::new(PersistenceService::new(
				"failing",
				Box::new(FailingPersistence),
			))),
			None,
			notifier(&recorder),
		);

		assert!(matches!(
			engine.create_order(request("Alice", 100)).await,
			Err(OrderError::Persistence(_))
		));
		assert!(recorder.sent.lock().unwrap().is_empty());
		assert!(matches!(
			engine.get_all_orders().await,
			Err(OrderError::Persistence(_))
		));
	}

	#[tokio::test]
	async fn test_notification_failure_is_reported_not_raised() {
		let recorder = RecordingNotifier {
			fail: true,
			..Default::default()
		};
		let engine = OrderEngine::new(memory(), None, notifier(&recorder));

		let created = engine.create_order(request("Alice", 4250)).await.unwrap();
		assert_eq!(created.persistence, PersistenceOutcome::Persisted);
		match &created.notification {
			NotificationOutcome::Failed(reason) => assert!(reason.contains("topic not found")),
			other => panic!("expected failed notification, got {:?}", other),
		}
		assert!(!created.is_complete());

		let found = engine
			.get_order_by_id(created.order.order_id())
			.await
			.unwrap();
		assert_eq!(found, Some(created.order));
	}

	#[tokio::test]
	async fn test_stalled_notifier_times_out_without_failing_create() {
		let engine = OrderEngine::new(
			memory(),
			None,
			Some(Arc::new(NotificationService::new(
				"stalled",
				Box::new(StalledNotifier),
			))),
		)
		.with_notification_timeout(Duration::from_millis(20));

		let created = engine.create_order(request("Alice", 4250)).await.unwrap();
		assert_eq!(created.persistence, PersistenceOutcome::Persisted);
		match &created.notification {
			NotificationOutcome::Failed(reason) => assert!(reason.contains("timed out")),
			other => panic!("expected timed out notification, got {:?}", other),
		}
		assert_eq!(engine.get_all_orders().await.unwrap(), vec![created.order]);
	}

	#[tokio::test]
	async fn test_degraded_without_backends() {
		let engine = OrderEngine::new(None, None, None);
		assert_eq!(engine.persistence_backend(), None);

		let created = engine
			.create_order(request("Alice", 4250).with_invoice(invoice(b"%PDF")))
			.await
			.unwrap();
		assert_eq!(created.persistence, PersistenceOutcome::Unpersisted);
		assert_eq!(created.notification, NotificationOutcome::Skipped);
		assert_eq!(created.order.invoice_file_url(), None);

		assert_eq!(
			engine
				.get_order_by_id(created.order.order_id())
				.await
				.unwrap(),
			None
		);
		assert!(engine.get_all_orders().await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_backend_names() {
		let recorder = RecordingNotifier::default();
		let engine = OrderEngine::new(memory(), mock_blob(), notifier(&recorder));
		assert_eq!(engine.persistence_backend(), Some("memory"));
		assert_eq!(engine.blob_backend(), Some("mock"));
		assert_eq!(engine.notification_backend(), Some("recording"));
	}
}
