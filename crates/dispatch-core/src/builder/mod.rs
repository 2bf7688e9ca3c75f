//! Builder pattern for constructing coordinator engines.
//!
//! Composes a CoordinatorEngine from pluggable storage backends and
//! assignment strategies using factory functions keyed by implementation
//! name, so the wiring is driven entirely by configuration.

use crate::engine::{event_bus::EventBus, CoordinatorEngine};
use dispatch_assignment::{AssignmentError, AssignmentInterface, AssignmentService};
use dispatch_config::Config;
use dispatch_storage::{StorageError, StorageInterface, StoreService};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during coordinator engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Container for the factory functions needed to build a
/// CoordinatorEngine.
///
/// Each factory takes a TOML configuration value and returns the
/// corresponding implementation.
pub struct CoordinatorFactories<SF, AF> {
	pub storage_factories: HashMap<String, SF>,
	pub assignment_factories: HashMap<String, AF>,
}

/// Builder for constructing a CoordinatorEngine with pluggable
/// implementations.
pub struct CoordinatorBuilder {
	config: Config,
}

impl CoordinatorBuilder {
	/// Creates a new CoordinatorBuilder with the given configuration.
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the CoordinatorEngine using factories for each component
	/// type.
	pub async fn build<SF, AF>(
		self,
		factories: CoordinatorFactories<SF, AF>,
	) -> Result<CoordinatorEngine, BuilderError>
	where
		SF: Fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>,
		AF: Fn(&toml::Value) -> Result<Box<dyn AssignmentInterface>, AssignmentError>,
	{
		// Create storage implementations
		let mut storage_impls = HashMap::new();
		for (name, config) in &self.config.storage.implementations {
			if let Some(factory) = factories.storage_factories.get(name) {
				match factory(config) {
					Ok(implementation) => {
						storage_impls.insert(name.clone(), implementation);
						let is_primary = &self.config.storage.primary == name;
						tracing::info!(component = "storage", implementation = %name, enabled = %is_primary, "Loaded");
					},
					Err(e) => {
						tracing::error!(
							component = "storage",
							implementation = %name,
							error = %e,
							"Failed to create storage implementation"
						);
						return Err(BuilderError::Config(format!(
							"Failed to create storage implementation '{}': {}",
							name, e
						)));
					},
				}
			}
		}

		let primary_storage = &self.config.storage.primary;
		let storage_backend = storage_impls.remove(primary_storage).ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary storage '{}' failed to load or has invalid configuration",
				primary_storage
			))
		})?;
		let store = Arc::new(StoreService::new(storage_backend));

		// Create the assignment strategy
		let strategy_name = &self.config.assignment.primary;
		let strategy_config = self
			.config
			.assignment
			.implementations
			.get(strategy_name)
			.ok_or_else(|| {
				BuilderError::Config(format!(
					"Assignment strategy '{}' has no configuration",
					strategy_name
				))
			})?;
		let factory = factories
			.assignment_factories
			.get(strategy_name)
			.ok_or_else(|| {
				BuilderError::MissingComponent(format!(
					"No factory registered for assignment strategy '{}'",
					strategy_name
				))
			})?;
		let strategy = factory(strategy_config).map_err(|e| {
			BuilderError::Config(format!(
				"Failed to create assignment strategy '{}': {}",
				strategy_name, e
			))
		})?;
		tracing::info!(component = "assignment", implementation = %strategy_name, enabled = true, "Loaded");
		let assignment = Arc::new(AssignmentService::new(strategy));

		let event_bus = EventBus::new(1000);

		Ok(CoordinatorEngine::new(
			self.config,
			store,
			assignment,
			event_bus,
		))
	}
}
