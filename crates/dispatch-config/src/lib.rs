//! Configuration module for the dispatch coordinator.
//!
//! Loads the coordinator's configuration from a TOML file and validates
//! it before anything is wired up. Values may reference environment
//! variables with `${VAR_NAME}` (or `${VAR_NAME:-default}` for a
//! fallback), which are resolved before parsing.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Reading the configuration file failed.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// The TOML could not be parsed.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// The parsed configuration failed a semantic check.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the input dump toml attaches.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the dispatch coordinator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this coordinator instance.
	pub coordinator: CoordinatorConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Configuration for partner assignment.
	pub assignment: AssignmentConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the coordinator instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoordinatorConfig {
	/// Unique identifier for this coordinator instance.
	pub id: String,
	/// Interval in seconds between sweeps for approved orders that still
	/// need a partner. Defaults to 5 seconds.
	#[serde(default = "default_poll_interval_seconds")]
	pub poll_interval_seconds: u64,
	/// Maximum number of transitions processed concurrently.
	#[serde(default = "default_max_concurrent_transitions")]
	pub max_concurrent_transitions: usize,
}

fn default_poll_interval_seconds() -> u64 {
	5
}

fn default_max_concurrent_transitions() -> usize {
	16
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for partner assignment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssignmentConfig {
	/// Which strategy to use.
	pub primary: String,
	/// Map of strategy names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server is enabled.
	#[serde(default = "default_api_enabled")]
	pub enabled: bool,
	/// Host address to bind to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to listen on.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

fn default_api_enabled() -> bool {
	true
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

/// Substitutes `${VAR_NAME}` references with the named environment
/// variable, or the fallback given as `${VAR_NAME:-default}`.
///
/// Input is capped at 1MB so a pathological file cannot stall the regex.
fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let pattern = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut resolved = input.to_string();
	let mut substitutions = Vec::new();

	for capture in pattern.captures_iter(input) {
		let span = match capture.get(0) {
			Some(m) => m,
			None => continue,
		};
		let name = match capture.get(1) {
			Some(m) => m.as_str(),
			None => continue,
		};
		let fallback = capture.get(2).map(|m| m.as_str());

		let value = match std::env::var(name) {
			Ok(v) => v,
			Err(_) => match fallback {
				Some(fallback) => fallback.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						name
					)));
				},
			},
		};

		substitutions.push((span.start(), span.end(), value));
	}

	// Splice from the end so earlier spans keep their offsets.
	for (start, end, value) in substitutions.iter().rev() {
		resolved.replace_range(start..end, value);
	}

	Ok(resolved)
}

impl Config {
	/// Loads configuration from a file, resolving environment variables
	/// before parsing.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let contents = tokio::fs::read_to_string(path).await?;
		contents.parse()
	}

	/// Checks the invariants serde cannot express: non-empty identifiers,
	/// positive limits, and a configuration block for each `primary`.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.coordinator.id.is_empty() {
			return Err(ConfigError::Validation(
				"Coordinator ID cannot be empty".into(),
			));
		}
		if self.coordinator.poll_interval_seconds == 0 {
			return Err(ConfigError::Validation(
				"Poll interval must be at least 1 second".into(),
			));
		}
		if self.coordinator.max_concurrent_transitions == 0 {
			return Err(ConfigError::Validation(
				"Max concurrent transitions must be at least 1".into(),
			));
		}

		if !self.storage.implementations.contains_key(&self.storage.primary) {
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' has no configuration",
				self.storage.primary
			)));
		}
		if !self
			.assignment
			.implementations
			.contains_key(&self.assignment.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary assignment strategy '{}' has no configuration",
				self.assignment.primary
			)));
		}

		Ok(())
	}
}

/// Parses TOML text into a validated [`Config`], resolving environment
/// variable references first.
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
	use std::io::Write;

	const BASE_CONFIG: &str = r#"
		[coordinator]
		id = "dispatch-1"

		[storage]
		primary = "memory"
		[storage.implementations.memory]

		[assignment]
		primary = "nearest"
		[assignment.implementations.nearest]
		max_radius_km = 12.5
	"#;

	#[test]
	fn parses_with_defaults() {
		let config: Config = BASE_CONFIG.parse().unwrap();
		assert_eq!(config.coordinator.id, "dispatch-1");
		assert_eq!(config.coordinator.poll_interval_seconds, 5);
		assert_eq!(config.coordinator.max_concurrent_transitions, 16);
		assert!(config.api.is_none());
	}

	#[test]
	fn env_var_resolution() {
		std::env::set_var("DISPATCH_TEST_ID", "from-env");
		let input = "id = \"${DISPATCH_TEST_ID}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "id = \"from-env\"");
		std::env::remove_var("DISPATCH_TEST_ID");
	}

	#[test]
	fn env_var_with_default() {
		let input = "port = ${DISPATCH_MISSING_PORT:-8080}";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "port = 8080");
	}

	#[test]
	fn missing_env_var_is_an_error() {
		let input = "id = \"${DISPATCH_DEFINITELY_MISSING}\"";
		assert!(matches!(
			resolve_env_vars(input),
			Err(ConfigError::Validation(_))
		));
	}

	#[test]
	fn primary_without_configuration_fails_validation() {
		let bad = BASE_CONFIG.replace("primary = \"memory\"", "primary = \"file\"");
		let err = bad.parse::<Config>().unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn empty_coordinator_id_fails_validation() {
		let bad = BASE_CONFIG.replace("id = \"dispatch-1\"", "id = \"\"");
		assert!(matches!(
			bad.parse::<Config>(),
			Err(ConfigError::Validation(_))
		));
	}

	#[tokio::test]
	async fn loads_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(BASE_CONFIG.as_bytes()).unwrap();
		let config = Config::from_file(file.path().to_str().unwrap())
			.await
			.unwrap();
		assert_eq!(config.assignment.primary, "nearest");
	}
}
