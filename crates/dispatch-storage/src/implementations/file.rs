//! File-based storage backend for the dispatch coordinator.
//!
//! Persists each record as one JSON file under
//! `<storage_path>/<namespace>/<id>.json`. A lock file taken at startup
//! keeps two coordinator processes from sharing a store; within the
//! process, guarded writes serialize on a mutex so the precondition check
//! and the write are atomic with respect to other writers.

use crate::{Precondition, StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use dispatch_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use fs2::FileExt;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

/// File-based storage implementation.
pub struct FileStorage {
	/// Root directory holding one subdirectory per namespace.
	base_path: PathBuf,
	/// Serializes guarded writes within this process.
	write_lock: Mutex<()>,
	/// Held for the lifetime of the store to fence out other processes.
	_lock_file: std::fs::File,
}

impl FileStorage {
	/// Opens (creating if needed) a store rooted at `base_path`.
	pub fn new(base_path: PathBuf) -> Result<Self, StorageError> {
		std::fs::create_dir_all(&base_path)
			.map_err(|e| StorageError::Backend(format!("Cannot create storage dir: {}", e)))?;

		let lock_path = base_path.join(".lock");
		let lock_file = std::fs::OpenOptions::new()
			.create(true)
			.truncate(false)
			.write(true)
			.open(&lock_path)
			.map_err(|e| StorageError::Backend(format!("Cannot open lock file: {}", e)))?;
		lock_file.try_lock_exclusive().map_err(|_| {
			StorageError::Backend(format!(
				"Storage at {} is already in use by another process",
				base_path.display()
			))
		})?;

		Ok(Self {
			base_path,
			write_lock: Mutex::new(()),
			_lock_file: lock_file,
		})
	}

	/// Maps a logical key ("namespace:id") to its file path.
	fn file_path(&self, key: &str) -> Result<PathBuf, StorageError> {
		let (namespace, id) = key
			.split_once(':')
			.ok_or_else(|| StorageError::Backend(format!("Malformed key: {}", key)))?;
		if id.contains(['/', '\\', ':']) || id.contains("..") {
			return Err(StorageError::Backend(format!("Unsafe key: {}", key)));
		}
		Ok(self.base_path.join(namespace).join(format!("{}.json", id)))
	}

	async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.file_path(key)?;
		match fs::read(&path).await {
			Ok(bytes) => Ok(bytes),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn write(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
		let path = self.file_path(key)?;
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}
		// Write-then-rename so readers never observe a partial record.
		let tmp = path.with_extension("json.tmp");
		fs::write(&tmp, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&tmp, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.read(key).await
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let _guard = self.write_lock.lock().await;
		self.write(key, &value).await
	}

	async fn set_bytes_if(
		&self,
		key: &str,
		precondition: Precondition,
		value: Vec<u8>,
	) -> Result<(), StorageError> {
		let _guard = self.write_lock.lock().await;
		let current = match self.read(key).await {
			Ok(bytes) => Some(bytes),
			Err(StorageError::NotFound) => None,
			Err(e) => return Err(e),
		};
		match precondition {
			Precondition::Absent => {
				if current.is_some() {
					return Err(StorageError::Conflict);
				}
			},
			Precondition::Equals(expected) => match current {
				Some(bytes) if bytes == expected => {},
				Some(_) => return Err(StorageError::Conflict),
				None => return Err(StorageError::NotFound),
			},
		}
		self.write(key, &value).await
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let _guard = self.write_lock.lock().await;
		let path = self.file_path(key)?;
		match fs::remove_file(&path).await {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.file_path(key)?;
		Ok(fs::try_exists(&path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?)
	}

	async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
		let namespace = prefix.strip_suffix(':').unwrap_or(prefix);
		let dir = self.base_path.join(namespace);
		let mut keys = Vec::new();
		let mut entries = match fs::read_dir(&dir).await {
			Ok(entries) => entries,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};
		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let name = entry.file_name();
			let name = name.to_string_lossy();
			if let Some(id) = name.strip_suffix(".json") {
				keys.push(format!("{}:{}", namespace, id));
			}
		}
		Ok(keys)
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("storage_path", FieldType::String).with_validator(|value| {
					match value.as_str() {
						Some(path) if !path.trim().is_empty() => Ok(()),
						_ => Err("storage_path must be a non-empty path".to_string()),
					}
				}),
			],
			vec![],
		);
		schema.validate(config)
	}
}

/// Registry entry for the file backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: directory holding the record files
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	FileStorageSchema
		.validate(config)
		.map_err(|e| StorageError::Configuration(e.to_string()))?;
	let path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.ok_or_else(|| StorageError::Configuration("storage_path is required".into()))?;
	Ok(Box::new(FileStorage::new(PathBuf::from(path))?))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn storage() -> (tempfile::TempDir, FileStorage) {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileStorage::new(dir.path().join("store")).unwrap();
		(dir, storage)
	}

	#[tokio::test]
	async fn round_trips_records() {
		let (_dir, storage) = storage();
		storage
			.set_bytes("orders:o1", b"{\"id\":\"o1\"}".to_vec())
			.await
			.unwrap();
		assert_eq!(
			storage.get_bytes("orders:o1").await.unwrap(),
			b"{\"id\":\"o1\"}".to_vec()
		);

		storage.delete("orders:o1").await.unwrap();
		assert!(matches!(
			storage.get_bytes("orders:o1").await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn compare_and_swap_detects_races() {
		let (_dir, storage) = storage();
		storage.set_bytes("orders:o1", b"v1".to_vec()).await.unwrap();

		storage
			.set_bytes_if(
				"orders:o1",
				Precondition::Equals(b"v1".to_vec()),
				b"v2".to_vec(),
			)
			.await
			.unwrap();

		let err = storage
			.set_bytes_if(
				"orders:o1",
				Precondition::Equals(b"v1".to_vec()),
				b"v3".to_vec(),
			)
			.await
			.unwrap_err();
		assert!(matches!(err, StorageError::Conflict));
	}

	#[tokio::test]
	async fn lists_namespace_keys() {
		let (_dir, storage) = storage();
		storage.set_bytes("orders:o1", b"a".to_vec()).await.unwrap();
		storage.set_bytes("orders:o2", b"b".to_vec()).await.unwrap();
		storage.set_bytes("vendors:v1", b"c".to_vec()).await.unwrap();

		let mut keys = storage.keys_with_prefix("orders:").await.unwrap();
		keys.sort();
		assert_eq!(keys, vec!["orders:o1".to_string(), "orders:o2".to_string()]);
	}

	#[test]
	fn second_process_is_fenced_out() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("store");
		let _first = FileStorage::new(path.clone()).unwrap();
		assert!(FileStorage::new(path).is_err());
	}

	#[test]
	fn unsafe_keys_are_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let storage = FileStorage::new(dir.path().join("store")).unwrap();
		assert!(storage.file_path("orders:../escape").is_err());
	}
}
