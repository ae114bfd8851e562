//! Health endpoint reporting liveness and the resolved backends.

use axum::Json;
use order_core::OrderEngine;
use serde::Serialize;

/// Response for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
	/// Always `UP` while the server answers.
	pub status: &'static str,
	pub backends: BackendNames,
}

/// Implementation serving each port, `null` when the port runs degraded.
#[derive(Debug, Serialize)]
pub struct BackendNames {
	pub persistence: Option<String>,
	pub blob: Option<String>,
	pub notification: Option<String>,
}

/// Handles GET /health requests.
pub fn get_health(engine: &OrderEngine) -> Json<HealthResponse> {
	Json(HealthResponse {
		status: "UP",
		backends: BackendNames {
			persistence: engine.persistence_backend().map(String::from),
			blob: engine.blob_backend().map(String::from),
			notification: engine.notification_backend().map(String::from),
		},
	})
}
