use std::sync::Arc;

use parking_lot::Mutex;

use crate::SnapshotStore;

/// Best-effort, ordered persistence for one store.
///
/// Callers bump a generation on every in-memory mutation and hand the matching snapshot to
/// [`SnapshotWriter::persist`] after releasing their state lock. Writers are serialized here and
/// a snapshot older than the last one written is dropped, so a slow writer never overwrites newer
/// state. Failures are logged and never returned.
pub struct SnapshotWriter<T> {
	label: &'static str,
	store: Arc<dyn SnapshotStore<T>>,
	written: Mutex<u64>,
}
impl<T> SnapshotWriter<T> {
	pub fn new(label: &'static str, store: Arc<dyn SnapshotStore<T>>) -> Self {
		Self { label, store, written: Mutex::new(0) }
	}

	/// Attempts to load the persisted snapshot. Any failure degrades to `None`.
	pub fn load(&self) -> Option<T> {
		match self.store.load() {
			Ok(snapshot) => snapshot,
			Err(err) => {
				tracing::warn!(
					error = %err,
					store = self.label,
					location = %self.store.location(),
					"Persisted state is unreadable. Starting empty."
				);

				None
			},
		}
	}

	/// Returns whether `generation` is now durable.
	pub fn persist(&self, generation: u64, snapshot: &T) -> bool {
		let mut written = self.written.lock();

		if generation <= *written {
			return true;
		}

		match self.store.save(snapshot) {
			Ok(()) => {
				*written = generation;

				true
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					store = self.label,
					location = %self.store.location(),
					generation,
					"Failed to persist state. Keeping in-memory copy."
				);

				false
			},
		}
	}

	pub fn written_generation(&self) -> u64 {
		*self.written.lock()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{MemoryStore, models::NarrativeSnapshot};

	#[test]
	fn stale_generations_are_skipped() {
		let store = Arc::new(MemoryStore::new());
		let writer: SnapshotWriter<NarrativeSnapshot> = SnapshotWriter::new("narrative", store.clone());
		let newer = NarrativeSnapshot { vector: vec![0.0, 1.0], updated_at: None };
		let older = NarrativeSnapshot { vector: vec![1.0, 0.0], updated_at: None };

		assert!(writer.persist(2, &newer));
		assert!(writer.persist(1, &older));
		assert_eq!(writer.written_generation(), 2);

		let loaded: Option<NarrativeSnapshot> = store.load().expect("Load failed.");

		assert_eq!(loaded, Some(newer));
	}
}
