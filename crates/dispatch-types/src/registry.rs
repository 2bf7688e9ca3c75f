//! Registry trait for self-registering implementations.
//!
//! Pluggable modules (storage backends, assignment strategies) register
//! themselves with their configuration name and a factory function.

/// Base trait for implementation registries.
///
/// Each pluggable module provides a Registry struct implementing this
/// trait, declaring the name it is referenced by in configuration files
/// and the factory that constructs it.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this
	/// implementation, for example "memory" for
	/// storage.implementations.memory.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
