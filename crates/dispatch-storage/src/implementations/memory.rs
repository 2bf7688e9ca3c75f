//! In-memory storage backend for the dispatch coordinator.
//!
//! Backs the [`StorageInterface`] trait with a plain HashMap. Nothing
//! survives a restart, which is exactly what tests and local development
//! want.

use crate::{Precondition, StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use dispatch_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage implementation.
///
/// Data lives in a HashMap behind a read-write lock. Guarded writes hold
/// the write lock across the precondition check and the insert, which is
/// what makes the compare-and-swap atomic here.
pub struct MemoryStorage {
	/// The in-memory store protected by a read-write lock.
	store: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self {
			store: Arc::new(RwLock::new(HashMap::new())),
		}
	}
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let store = self.store.read().await;
		store.get(key).cloned().ok_or(StorageError::NotFound)
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.insert(key.to_string(), value);
		Ok(())
	}

	async fn set_bytes_if(
		&self,
		key: &str,
		precondition: Precondition,
		value: Vec<u8>,
	) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		let current = store.get(key);
		match precondition {
			Precondition::Absent => {
				if current.is_some() {
					return Err(StorageError::Conflict);
				}
			},
			Precondition::Equals(expected) => match current {
				Some(bytes) if *bytes == expected => {},
				Some(_) => return Err(StorageError::Conflict),
				None => return Err(StorageError::NotFound),
			},
		}
		store.insert(key.to_string(), value);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let mut store = self.store.write().await;
		store.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let store = self.store.read().await;
		Ok(store.contains_key(key))
	}

	async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let store = self.store.read().await;
		Ok(store
			.keys()
			.filter(|k| k.starts_with(prefix))
			.cloned()
			.collect())
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStorageSchema)
	}
}

/// Configuration schema for MemoryStorage.
pub struct MemoryStorageSchema;

impl ConfigSchema for MemoryStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// Memory storage has no required configuration
		let schema = Schema::new(vec![], vec![]);
		schema.validate(config)
	}
}

/// Registry entry for the memory backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

/// Builds a memory backend. Takes no configuration.
pub fn create_storage(_config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	Ok(Box::new(MemoryStorage::new()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_basic_operations() {
		let storage = MemoryStorage::new();

		let key = "test_key";
		let value = b"test_value".to_vec();
		storage.set_bytes(key, value.clone()).await.unwrap();

		let retrieved = storage.get_bytes(key).await.unwrap();
		assert_eq!(retrieved, value);

		assert!(storage.exists(key).await.unwrap());

		storage.delete(key).await.unwrap();
		assert!(!storage.exists(key).await.unwrap());

		let result = storage.get_bytes(key).await;
		assert!(matches!(result, Err(StorageError::NotFound)));
	}

	#[tokio::test]
	async fn test_guarded_insert() {
		let storage = MemoryStorage::new();

		storage
			.set_bytes_if("k", Precondition::Absent, b"first".to_vec())
			.await
			.unwrap();

		let err = storage
			.set_bytes_if("k", Precondition::Absent, b"second".to_vec())
			.await
			.unwrap_err();
		assert!(matches!(err, StorageError::Conflict));
	}

	#[tokio::test]
	async fn test_compare_and_swap() {
		let storage = MemoryStorage::new();
		storage.set_bytes("k", b"v1".to_vec()).await.unwrap();

		// Swap with the right snapshot succeeds.
		storage
			.set_bytes_if("k", Precondition::Equals(b"v1".to_vec()), b"v2".to_vec())
			.await
			.unwrap();

		// The stale snapshot now loses.
		let err = storage
			.set_bytes_if("k", Precondition::Equals(b"v1".to_vec()), b"v3".to_vec())
			.await
			.unwrap_err();
		assert!(matches!(err, StorageError::Conflict));

		assert_eq!(storage.get_bytes("k").await.unwrap(), b"v2".to_vec());
	}

	#[tokio::test]
	async fn test_prefix_listing() {
		let storage = MemoryStorage::new();
		storage.set_bytes("orders:1", b"a".to_vec()).await.unwrap();
		storage.set_bytes("orders:2", b"b".to_vec()).await.unwrap();
		storage.set_bytes("vendors:1", b"c".to_vec()).await.unwrap();

		let mut keys = storage.keys_with_prefix("orders:").await.unwrap();
		keys.sort();
		assert_eq!(keys, vec!["orders:1".to_string(), "orders:2".to_string()]);
	}
}
