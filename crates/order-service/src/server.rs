//! HTTP server for the order API.

use axum::{
	extract::{DefaultBodyLimit, Multipart, Path, State},
	http::StatusCode,
	response::Json,
	routing::get,
	Router,
};
use order_config::ApiConfig;
use order_core::OrderEngine;
use order_types::{APIError, Order};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<OrderEngine>,
}

/// Builds the order routes with their middleware.
pub fn build_router(engine: Arc<OrderEngine>, api_config: &ApiConfig) -> Router {
	let app_state = AppState { engine };

	Router::new()
		.route("/orders", get(handle_get_orders).post(handle_create_order))
		.route("/orders/{id}", get(handle_get_order_by_id))
		.route("/health", get(handle_health))
		.layer(DefaultBodyLimit::max(api_config.max_request_size))
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive()),
		)
		.with_state(app_state)
}

/// Starts the HTTP server and runs until Ctrl-C.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<OrderEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = build_router(engine, &api_config);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Order API server starting on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(async {
			if let Err(e) = tokio::signal::ctrl_c().await {
				tracing::error!(error = %e, "Failed to listen for shutdown signal");
			}
		})
		.await?;

	Ok(())
}

/// Handles POST /orders requests.
async fn handle_create_order(
	State(state): State<AppState>,
	multipart: Multipart,
) -> Result<(StatusCode, Json<Order>), APIError> {
	let request = match crate::apis::order::parse_create_request(multipart).await {
		Ok(request) => request,
		Err(e) => {
			tracing::warn!("Order request rejected: {}", e);
			return Err(e);
		}
	};

	match crate::apis::order::create_order(&state.engine, request).await {
		Ok(order) => Ok((StatusCode::CREATED, Json(order))),
		Err(e) => {
			tracing::error!("Order creation failed: {}", e);
			Err(e)
		}
	}
}

/// Handles GET /orders/{id} requests.
async fn handle_get_order_by_id(
	Path(id): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<Order>, APIError> {
	match crate::apis::order::get_order_by_id(&state.engine, &id).await {
		Ok(order) => Ok(Json(order)),
		Err(e) => {
			tracing::warn!("Order retrieval failed: {}", e);
			Err(e)
		}
	}
}

/// Handles GET /health requests.
async fn handle_health(State(state): State<AppState>) -> Json<crate::apis::health::HealthResponse> {
	crate::apis::health::get_health(&state.engine)
}

/// Handles GET /orders requests.
async fn handle_get_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>, APIError> {
	crate::apis::order::get_all_orders(&state.engine)
		.await
		.map(Json)
}
