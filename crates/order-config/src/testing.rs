//! Helpers for building configurations in tests of downstream crates.

use crate::{ApiConfig, BackendConfig, Config, Port, PortConfig, ServiceConfig};

/// Fluent builder over [`Config`] that skips file loading.
pub struct ConfigBuilder {
	config: Config,
}

impl ConfigBuilder {
	/// Starts from a configuration with no backends wired at all.
	pub fn new(id: &str) -> Self {
		Self {
			config: Config {
				service: ServiceConfig { id: id.to_string() },
				backend: BackendConfig::default(),
				persistence: PortConfig::default(),
				blob: PortConfig::default(),
				notification: PortConfig::default(),
				api: None,
			},
		}
	}

	pub fn local_mode(mut self, local_mode: bool) -> Self {
		self.config.backend.local_mode = local_mode;
		self
	}

	/// Adds an implementation table for a port.
	pub fn implementation(mut self, port: Port, name: &str, table: toml::Value) -> Self {
		self.section(port)
			.implementations
			.insert(name.to_string(), table);
		self
	}

	/// Adds an implementation with an empty table.
	pub fn wire(self, port: Port, name: &str) -> Self {
		self.implementation(port, name, toml::Value::Table(toml::map::Map::new()))
	}

	pub fn local(mut self, port: Port, name: &str) -> Self {
		self.section(port).local = Some(name.to_string());
		self
	}

	pub fn production(mut self, port: Port, name: &str) -> Self {
		self.section(port).production = Some(name.to_string());
		self
	}

	pub fn api(mut self, api: ApiConfig) -> Self {
		self.config.api = Some(api);
		self
	}

	pub fn build(self) -> Config {
		self.config
	}

	fn section(&mut self, port: Port) -> &mut PortConfig {
		match port {
			Port::Persistence => &mut self.config.persistence,
			Port::Blob => &mut self.config.blob,
			Port::Notification => &mut self.config.notification,
		}
	}
}

/// Local mode with the in-process backend of every port wired.
pub fn local_config() -> Config {
	ConfigBuilder::new("test-service")
		.local_mode(true)
		.wire(Port::Persistence, "memory")
		.wire(Port::Blob, "mock")
		.wire(Port::Notification, "log")
		.build()
}
