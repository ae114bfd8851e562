//! Main entry point for the order service.
//!
//! Loads the configuration, resolves the persistence, blob storage and
//! notification backends, and serves the order API over HTTP.

use clap::Parser;
use order_config::Config;
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod factory_registry;
mod server;

/// Command-line arguments for the order service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/local.toml", env = "ORDER_SERVICE_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started order service");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!(
		local_mode = config.backend.local_mode,
		"Loaded configuration [{}]",
		config.service.id
	);

	let api_config = config.api.clone().unwrap_or_default();
	let engine = Arc::new(factory_registry::build_engine_from_config(config)?);

	tracing::info!(
		persistence = engine.persistence_backend().unwrap_or("none"),
		blob = engine.blob_backend().unwrap_or("none"),
		notification = engine.notification_backend().unwrap_or("none"),
		"Order engine ready"
	);

	if api_config.enabled {
		server::start_server(api_config, engine).await?;
	} else {
		tracing::warn!("API disabled in configuration, nothing to serve");
	}

	tracing::info!("Stopped order service");
	Ok(())
}
