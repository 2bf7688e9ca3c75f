//! Lifecycle management for the coordinator engine.
//!
//! Handles initialization and shutdown procedures, ensuring proper
//! startup and cleanup around the main loop.

use super::CoordinatorEngine;

impl CoordinatorEngine {
	/// Performs any initialization required before running.
	pub async fn initialize(&self) -> Result<(), super::EngineError> {
		tracing::info!(
			coordinator_id = %self.config.coordinator.id,
			"Initializing coordinator engine"
		);
		Ok(())
	}

	/// Performs cleanup operations.
	pub async fn shutdown(&self) -> Result<(), super::EngineError> {
		tracing::info!("Shutting down coordinator engine");
		Ok(())
	}
}
