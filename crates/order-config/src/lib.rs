//! Configuration module for the order service.
//!
//! Configuration is read from TOML files. A single `[backend] local_mode`
//! flag decides, for each of the three ports (persistence, blob storage and
//! notification), whether the local implementation or the production one is
//! preferred. Each port section names both and lists the configured
//! implementations:
//!
//! ```toml
//! [backend]
//! local_mode = true
//!
//! [persistence]
//! local = "memory"
//! production = "dynamodb"
//! [persistence.implementations.memory]
//! [persistence.implementations.dynamodb]
//! table_name = "Orders"
//! ```
//!
//! Files can be split with `include = ["file1.toml", "file2.toml"]`; each
//! top-level section must be unique across all files. `${VAR}` and
//! `${VAR:-default}` are replaced with environment variables.

mod loader;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// The three side effects an order goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
	Persistence,
	Blob,
	Notification,
}

impl Port {
	pub fn as_str(&self) -> &'static str {
		match self {
			Port::Persistence => "persistence",
			Port::Blob => "blob",
			Port::Notification => "notification",
		}
	}

	/// Implementation used in local mode when the config does not name one.
	pub fn default_local(&self) -> &'static str {
		match self {
			Port::Persistence => "memory",
			Port::Blob => "mock",
			Port::Notification => "log",
		}
	}

	/// Implementation used outside local mode when the config does not name one.
	pub fn default_production(&self) -> &'static str {
		match self {
			Port::Persistence => "dynamodb",
			Port::Blob => "s3",
			Port::Notification => "sns",
		}
	}

	pub fn all() -> impl Iterator<Item = Self> {
		[Port::Persistence, Port::Blob, Port::Notification].into_iter()
	}
}

impl fmt::Display for Port {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Main configuration structure for the order service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this service instance.
	pub service: ServiceConfig,
	/// Backend selector.
	#[serde(default)]
	pub backend: BackendConfig,
	#[serde(default)]
	pub persistence: PortConfig,
	#[serde(default)]
	pub blob: PortConfig,
	#[serde(default)]
	pub notification: PortConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	/// Unique identifier for this service instance, used in logs.
	pub id: String,
}

/// The process-wide local/mock switch.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BackendConfig {
	/// Prefer in-process fake backends over networked ones.
	#[serde(default)]
	pub local_mode: bool,
}

/// Backend choices for one port.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PortConfig {
	/// Implementation preferred when local mode is on.
	pub local: Option<String>,
	/// Implementation used otherwise, and as fallback in local mode.
	pub production: Option<String>,
	/// Map of implementation names to their backend-specific tables.
	#[serde(default)]
	pub implementations: HashMap<String, toml::Value>,
}

impl PortConfig {
	pub fn local_name(&self, port: Port) -> &str {
		self.local.as_deref().unwrap_or(port.default_local())
	}

	pub fn production_name(&self, port: Port) -> &str {
		self.production.as_deref().unwrap_or(port.default_production())
	}
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default = "default_api_enabled")]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
	/// Maximum request body size in bytes, invoice upload included.
	#[serde(default = "default_max_request_size")]
	pub max_request_size: usize,
}

fn default_api_enabled() -> bool {
	true
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	8080
}

fn default_api_timeout() -> u64 {
	30
}

/// Returns the default maximum request size in bytes.
///
/// Invoices up to 10MB are accepted.
fn default_max_request_size() -> usize {
	10 * 1024 * 1024
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			enabled: default_api_enabled(),
			host: default_api_host(),
			port: default_api_port(),
			timeout_seconds: default_api_timeout(),
			max_request_size: default_max_request_size(),
		}
	}
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut missing = None;
	let result = re.replace_all(input, |caps: &regex::Captures| {
		let var_name = &caps[1];
		match (std::env::var(var_name), caps.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				missing.get_or_insert_with(|| var_name.to_string());
				String::new()
			},
		}
	});

	if let Some(var_name) = missing {
		return Err(ConfigError::Validation(format!(
			"Environment variable '{}' not found",
			var_name
		)));
	}

	Ok(result.into_owned())
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Returns the section of the given port.
	pub fn port(&self, port: Port) -> &PortConfig {
		match port {
			Port::Persistence => &self.persistence,
			Port::Blob => &self.blob,
			Port::Notification => &self.notification,
		}
	}

	/// Configured implementations for a port in the order they should be tried.
	///
	/// In local mode the local implementation comes first, followed by the
	/// production one. Outside local mode only the production implementation
	/// is a candidate. Names without a table under `implementations` are left
	/// out, so an empty result means the port runs degraded.
	pub fn candidates(&self, port: Port) -> Vec<(&str, &toml::Value)> {
		let section = self.port(port);
		let mut names = Vec::with_capacity(2);
		if self.backend.local_mode {
			names.push(section.local_name(port));
		}
		names.push(section.production_name(port));

		let mut candidates: Vec<(&str, &toml::Value)> = Vec::with_capacity(names.len());
		for name in names {
			if candidates.iter().any(|(existing, _)| *existing == name) {
				continue;
			}
			if let Some(table) = section.implementations.get(name) {
				candidates.push((name, table));
			}
		}
		candidates
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.trim().is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		for port in Port::all() {
			let section = self.port(port);
			for (role, name) in [("local", &section.local), ("production", &section.production)] {
				if let Some(name) = name {
					if name.trim().is_empty() {
						return Err(ConfigError::Validation(format!(
							"{}.{} cannot be empty",
							port, role
						)));
					}
				}
			}
			for (name, table) in &section.implementations {
				if !table.is_table() {
					return Err(ConfigError::Validation(format!(
						"{}.implementations.{} must be a table",
						port, name
					)));
				}
			}
		}

		if let Some(ref api) = self.api {
			if api.enabled && api.port == 0 {
				return Err(ConfigError::Validation("API port cannot be 0".into()));
			}
			if api.max_request_size == 0 {
				return Err(ConfigError::Validation(
					"API max_request_size must be greater than 0".into(),
				));
			}
			if api.timeout_seconds == 0 {
				return Err(ConfigError::Validation(
					"API timeout_seconds must be greater than 0".into(),
				));
			}
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment variables and validating.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const FULL: &str = r#"
[service]
id = "order-service"

[backend]
local_mode = true

[persistence]
local = "memory"
production = "dynamodb"
[persistence.implementations.memory]
[persistence.implementations.dynamodb]
table_name = "Orders"

[blob]
[blob.implementations.mock]
[blob.implementations.s3]
bucket = "invoices"

[notification]
[notification.implementations.sns]
topic_arn = "arn:aws:sns:eu-west-1:123456789012:orders"

[api]
enabled = true
port = 8081
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("ORDER_TEST_HOST", "localhost");
		std::env::set_var("ORDER_TEST_PORT", "5432");

		let input = "host = \"${ORDER_TEST_HOST}:${ORDER_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "host = \"localhost:5432\"");

		std::env::remove_var("ORDER_TEST_HOST");
		std::env::remove_var("ORDER_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${ORDER_MISSING_VAR:-default_value}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"default_value\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let result = resolve_env_vars("value = \"${ORDER_MISSING_VAR}\"");
		assert!(result.unwrap_err().to_string().contains("ORDER_MISSING_VAR"));
	}

	#[test]
	fn test_parse_full_config() {
		let config: Config = FULL.parse().unwrap();
		assert_eq!(config.service.id, "order-service");
		assert!(config.backend.local_mode);
		assert_eq!(config.persistence.implementations.len(), 2);
		assert_eq!(config.blob.local_name(Port::Blob), "mock");
		assert_eq!(config.notification.production_name(Port::Notification), "sns");
		let api = config.api.unwrap();
		assert_eq!(api.port, 8081);
		assert_eq!(api.max_request_size, 10 * 1024 * 1024);
	}

	#[test]
	fn test_local_mode_prefers_local_then_production() {
		let config: Config = FULL.parse().unwrap();

		let names: Vec<_> = config
			.candidates(Port::Persistence)
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["memory", "dynamodb"]);

		// No local notifier configured, so production is the only candidate.
		let names: Vec<_> = config
			.candidates(Port::Notification)
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["sns"]);
	}

	#[test]
	fn test_production_mode_ignores_local() {
		let source = FULL.replace("local_mode = true", "local_mode = false");
		let config: Config = source.parse().unwrap();

		let names: Vec<_> = config
			.candidates(Port::Blob)
			.into_iter()
			.map(|(name, _)| name)
			.collect();
		assert_eq!(names, vec!["s3"]);
	}

	#[test]
	fn test_missing_sections_mean_no_candidates() {
		let config: Config = "[service]\nid = \"bare\"".parse().unwrap();
		assert!(!config.backend.local_mode);
		for port in Port::all() {
			assert!(config.candidates(port).is_empty());
		}
		assert!(config.api.is_none());
	}

	#[test]
	fn test_same_name_for_both_roles_is_tried_once() {
		let source = r#"
[service]
id = "x"
[backend]
local_mode = true
[blob]
local = "file"
production = "file"
[blob.implementations.file]
"#;
		let config: Config = source.parse().unwrap();
		assert_eq!(config.candidates(Port::Blob).len(), 1);
	}

	#[test]
	fn test_empty_service_id_rejected() {
		let err = "[service]\nid = \"\"".parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Service ID"));
	}

	#[test]
	fn test_blank_implementation_name_rejected() {
		let source = "[service]\nid = \"x\"\n[persistence]\nlocal = \" \"";
		let err = source.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("persistence.local"));
	}

	#[test]
	fn test_implementation_must_be_table() {
		let source = "[service]\nid = \"x\"\n[blob.implementations]\nmock = 1";
		let err = source.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("blob.implementations.mock"));
	}

	#[test]
	fn test_zero_api_port_rejected() {
		let source = "[service]\nid = \"x\"\n[api]\nenabled = true\nport = 0";
		assert!(source.parse::<Config>().is_err());
	}
}
