//! Record store for the dispatch coordinator.
//!
//! This module provides abstractions for persisting the shared order and
//! delivery request records. The store, not the client, enforces lifecycle
//! preconditions: every status write is a compare-and-swap against the
//! expected prior state, so independent actors racing on the same row lose
//! with an explicit [`StorageError::Conflict`] instead of skipping states.

use async_trait::async_trait;
use dispatch_types::{ConfigSchema, ImplementationRegistry};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Typed record operations layered on the raw byte store.
pub mod records;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error returned when a guarded write loses its precondition check:
	/// the record changed since it was read. Recoverable by refetching
	/// and deliberately retrying; never retried blindly.
	#[error("Conflict: record changed since it was read")]
	Conflict,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Expected prior state for a guarded write.
#[derive(Debug, Clone)]
pub enum Precondition {
	/// The key must not exist yet (insert-only, used for append-only
	/// audit rows and the one-live-request-per-order index).
	Absent,
	/// The stored bytes must equal this snapshot (compare-and-swap).
	Equals(Vec<u8>),
}

/// Trait defining the low-level interface for storage backends.
///
/// Backends are simple key-value stores; the one non-negotiable
/// capability is [`StorageInterface::set_bytes_if`], which must check the
/// precondition and write atomically with respect to other writers.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes unconditionally.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Stores raw bytes only if the precondition still holds, atomically.
	/// Returns [`StorageError::Conflict`] when it does not.
	async fn set_bytes_if(
		&self,
		key: &str,
		precondition: Precondition,
		value: Vec<u8>,
	) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Lists all keys beginning with the given prefix.
	async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples for all available storage
/// implementations, used by the builder to register them automatically.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// High-level store that provides typed operations.
///
/// The StoreService wraps a low-level backend and provides convenient
/// methods for storing and retrieving typed records with automatic JSON
/// serialization. Lifecycle-specific operations live in [`records`].
pub struct StoreService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StoreService {
	/// Creates a new StoreService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	/// Stores a serializable value, creating or overwriting.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = Self::key(namespace, id);
		let bytes = encode(data)?;
		self.backend.set_bytes(&key, bytes).await
	}

	/// Stores a serializable value only if the id is not taken yet.
	///
	/// Used for append-only collections where overwriting would destroy
	/// an audit trail.
	pub async fn insert<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let key = Self::key(namespace, id);
		let bytes = encode(data)?;
		self.backend
			.set_bytes_if(&key, Precondition::Absent, bytes)
			.await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let key = Self::key(namespace, id);
		let bytes = self.backend.get_bytes(&key).await?;
		decode(&bytes)
	}

	/// Retrieves a value, mapping a missing key to `None`.
	pub async fn retrieve_opt<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<Option<T>, StorageError> {
		match self.retrieve(namespace, id).await {
			Ok(value) => Ok(Some(value)),
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => Err(e),
		}
	}

	/// Retrieves and deserializes every value in a namespace.
	pub async fn list<T: DeserializeOwned>(&self, namespace: &str) -> Result<Vec<T>, StorageError> {
		let prefix = format!("{}:", namespace);
		let keys = self.backend.keys_with_prefix(&prefix).await?;
		let mut items = Vec::with_capacity(keys.len());
		for key in keys {
			match self.backend.get_bytes(&key).await {
				Ok(bytes) => items.push(decode(&bytes)?),
				// Deleted between listing and reading; skip.
				Err(StorageError::NotFound) => continue,
				Err(e) => return Err(e),
			}
		}
		Ok(items)
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		let key = Self::key(namespace, id);
		self.backend.delete(&key).await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		let key = Self::key(namespace, id);
		self.backend.exists(&key).await
	}

	/// Replaces a record only if its stored form still matches `prior`.
	///
	/// This is the guarded read-modify-write every lifecycle transition
	/// goes through: losers of a race get [`StorageError::Conflict`].
	pub async fn swap<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		prior: &T,
		next: &T,
	) -> Result<(), StorageError> {
		let key = Self::key(namespace, id);
		let expected = encode(prior)?;
		let bytes = encode(next)?;
		self.backend
			.set_bytes_if(&key, Precondition::Equals(expected), bytes)
			.await
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}
}

fn encode<T: Serialize>(data: &T) -> Result<Vec<u8>, StorageError> {
	serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
	serde_json::from_slice(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}
