use std::{
	fs,
	io::{ErrorKind, Write as _},
	path::{Path, PathBuf},
};

use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result};

/// Durable home for one serialized snapshot of a store.
///
/// `load` returns `Ok(None)` when nothing has been persisted yet. Corrupt or mismatched content
/// is an `Err`; callers decide how to degrade.
pub trait SnapshotStore<T>
where
	Self: Send + Sync,
{
	fn load(&self) -> Result<Option<T>>;

	fn save(&self, value: &T) -> Result<()>;

	/// Human-readable location used in logs.
	fn location(&self) -> String;
}

pub struct JsonFileStore {
	path: PathBuf,
}
impl JsonFileStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	fn temp_path(&self) -> PathBuf {
		let mut name = self.path.file_name().map(|name| name.to_os_string()).unwrap_or_default();

		name.push(".tmp");

		self.path.with_file_name(name)
	}

	fn io_error(&self, source: std::io::Error) -> Error {
		Error::Io { path: self.path.clone(), source }
	}
}
impl<T> SnapshotStore<T> for JsonFileStore
where
	T: Serialize + DeserializeOwned,
{
	fn load(&self) -> Result<Option<T>> {
		let raw = match fs::read(&self.path) {
			Ok(raw) => raw,
			Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
			Err(err) => return Err(self.io_error(err)),
		};

		Ok(Some(serde_json::from_slice(&raw)?))
	}

	fn save(&self, value: &T) -> Result<()> {
		let encoded = serde_json::to_vec(value)?;

		if let Some(parent) = self.path.parent()
			&& !parent.as_os_str().is_empty()
		{
			fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
		}

		let temp_path = self.temp_path();
		let mut file = fs::File::create(&temp_path).map_err(|err| self.io_error(err))?;

		file.write_all(&encoded).map_err(|err| self.io_error(err))?;
		file.sync_all().map_err(|err| self.io_error(err))?;

		drop(file);

		fs::rename(&temp_path, &self.path).map_err(|err| self.io_error(err))
	}

	fn location(&self) -> String {
		self.path.display().to_string()
	}
}

/// Process-local store holding the encoded JSON bytes.
#[derive(Default)]
pub struct MemoryStore {
	slot: Mutex<Option<Vec<u8>>>,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Seeds the store with raw bytes, as if a previous process had written them.
	pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
		Self { slot: Mutex::new(Some(bytes.into())) }
	}

	pub fn bytes(&self) -> Option<Vec<u8>> {
		self.slot.lock().clone()
	}
}
impl<T> SnapshotStore<T> for MemoryStore
where
	T: Serialize + DeserializeOwned,
{
	fn load(&self) -> Result<Option<T>> {
		let slot = self.slot.lock();

		match slot.as_deref() {
			Some(raw) => Ok(Some(serde_json::from_slice(raw)?)),
			None => Ok(None),
		}
	}

	fn save(&self, value: &T) -> Result<()> {
		let encoded = serde_json::to_vec(value)?;

		*self.slot.lock() = Some(encoded);

		Ok(())
	}

	fn location(&self) -> String {
		"memory".to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::models::NarrativeSnapshot;

	#[test]
	fn json_store_round_trips_and_replaces_atomically() {
		let dir = tempfile::tempdir().expect("Failed to create temp dir.");
		let store = JsonFileStore::new(dir.path().join("nested").join("narrative.json"));
		let first = NarrativeSnapshot { vector: vec![1.0, 0.0], updated_at: None };
		let second = NarrativeSnapshot { vector: vec![0.0, 1.0], updated_at: None };

		assert_eq!(SnapshotStore::<NarrativeSnapshot>::load(&store).expect("Load failed."), None);

		store.save(&first).expect("First save failed.");
		store.save(&second).expect("Second save failed.");

		let loaded: Option<NarrativeSnapshot> = store.load().expect("Load failed.");

		assert_eq!(loaded, Some(second));
		assert!(!store.temp_path().exists());
	}

	#[test]
	fn memory_store_surfaces_corrupt_bytes() {
		let store = MemoryStore::with_bytes(b"{not json".to_vec());
		let loaded: Result<Option<NarrativeSnapshot>> = store.load();

		assert!(matches!(loaded, Err(Error::Json(_))));
	}
}
