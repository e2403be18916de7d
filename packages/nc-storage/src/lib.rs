pub mod models;
pub mod snapshot;
pub mod writer;

mod error;

pub use error::{Error, Result};
pub use snapshot::{JsonFileStore, MemoryStore, SnapshotStore};
pub use writer::SnapshotWriter;

use std::sync::Arc;

use nc_config::{BACKEND_MEMORY, Storage};

use crate::models::{NarrativeSnapshot, PheromoneSnapshot};

pub struct Stores {
	pub pheromone: Arc<dyn SnapshotStore<PheromoneSnapshot>>,
	pub narrative: Arc<dyn SnapshotStore<NarrativeSnapshot>>,
}

/// Builds the snapshot stores for the configured backend. Opening never touches disk.
pub fn open(cfg: &Storage) -> Stores {
	if cfg.backend == BACKEND_MEMORY {
		return Stores {
			pheromone: Arc::new(MemoryStore::new()),
			narrative: Arc::new(MemoryStore::new()),
		};
	}

	Stores {
		pheromone: Arc::new(JsonFileStore::new(cfg.pheromone_path())),
		narrative: Arc::new(JsonFileStore::new(cfg.narrative_path())),
	}
}
