//! Main entry point for the dispatch coordinator service.
//!
//! This binary wires the coordinator engine together from pluggable
//! storage backends and assignment strategies, then runs the engine loop
//! and, when enabled, the HTTP API that customers, vendors and delivery
//! partners call.

use clap::Parser;
use dispatch_config::Config;
use dispatch_core::{CoordinatorBuilder, CoordinatorEngine, CoordinatorFactories};
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod server;

/// Command-line arguments for the dispatch service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the dispatch service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the coordinator engine with all implementations
/// 5. Runs the coordinator until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started dispatch coordinator");

	// Load configuration
	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.coordinator.id);

	// Build the coordinator engine with implementations
	let coordinator = build_coordinator(config.clone()).await?;
	let coordinator = Arc::new(coordinator);

	coordinator.initialize().await?;

	// Check if the API server should be started
	let api_enabled = config.api.as_ref().is_some_and(|api| api.enabled);

	if api_enabled {
		let api_config = config.api.clone().ok_or("API configuration missing")?;
		let api_coordinator = Arc::clone(&coordinator);

		// Run the engine loop and the API server concurrently
		tokio::select! {
			result = coordinator.run() => {
				tracing::info!("Coordinator finished");
				result?;
			}
			result = server::start_server(api_config, api_coordinator) => {
				tracing::info!("API server finished");
				result?;
			}
		}
	} else {
		tracing::info!("Starting coordinator only");
		coordinator.run().await?;
	}

	coordinator.shutdown().await?;
	tracing::info!("Stopped dispatch coordinator");
	Ok(())
}

/// Builds the coordinator engine from the registered implementations.
async fn build_coordinator(
	config: Config,
) -> Result<CoordinatorEngine, Box<dyn std::error::Error>> {
	let storage_factories = dispatch_storage::get_all_implementations()
		.into_iter()
		.map(|(name, factory)| (name.to_string(), factory))
		.collect();
	let assignment_factories = dispatch_assignment::get_all_implementations()
		.into_iter()
		.map(|(name, factory)| (name.to_string(), factory))
		.collect();

	let coordinator = CoordinatorBuilder::new(config)
		.build(CoordinatorFactories {
			storage_factories,
			assignment_factories,
		})
		.await?;
	Ok(coordinator)
}
