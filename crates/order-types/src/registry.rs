//! Registry trait for self-registering backend implementations.

/// Implemented by the `Registry` marker of every backend module.
///
/// `NAME` is the key used under `<port>.implementations` in the TOML
/// configuration, e.g. `memory` for `[persistence.implementations.memory]`
/// or `sns` for `[notification.implementations.sns]`.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	const NAME: &'static str;

	/// Factory function type of the port this backend belongs to.
	type Factory;

	/// Returns the factory that builds this backend from its TOML table.
	fn factory() -> Self::Factory;
}
