mod error;

pub use error::{Error, Result};

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::TempDir;

use nc_config::{
	BACKEND_JSON, BACKEND_MEMORY, Config, GATING_OFF, Gating, Narrative, Pheromone, Retention,
	Scoring, Service, Storage,
};

/// State directory removed on drop.
pub struct ScratchState {
	dir: TempDir,
}
impl ScratchState {
	pub fn new() -> Result<Self> {
		let dir = tempfile::Builder::new().prefix("nc_test_").tempdir()?;

		Ok(Self { dir })
	}

	pub fn path(&self) -> &Path {
		self.dir.path()
	}

	/// Deterministic configuration persisting into this directory with the json backend.
	pub fn config(&self) -> Config {
		config_with(BACKEND_JSON, self.path().to_path_buf())
	}
}

/// Deterministic configuration on the memory backend: 4-dimensional narrative, gating off,
/// no exploration and a fixed seed.
pub fn memory_config() -> Config {
	config_with(BACKEND_MEMORY, PathBuf::from("unused"))
}

fn config_with(backend: &str, state_dir: PathBuf) -> Config {
	Config {
		service: Service { log_level: "debug".to_string() },
		storage: Storage {
			backend: backend.to_string(),
			state_dir,
			pheromone_file: "pheromones.json".to_string(),
			narrative_file: "narrative.json".to_string(),
		},
		scoring: Scoring {
			weight_dense: 1.0,
			weight_narrative: 0.6,
			weight_pheromone: 0.3,
			epsilon_greedy: 0.0,
			mmr_lambda: 0.5,
			exposure_top_n: 10,
			seed: Some(7),
		},
		narrative: Narrative { dim: 4, ema_alpha: 0.5, success_gate: 0.5 },
		pheromone: Pheromone { half_life_s: 1800.0, exposure_penalty: 0.1, persist_exposures: false },
		gating: Gating {
			mode: GATING_OFF.to_string(),
			threshold: 0.5,
			min_candidates: 100,
			max_candidates: 400,
			entropy_temp: 1.0,
		},
		retention: Retention {
			sweep_interval_s: 900,
			pheromone_retention_s: 604_800,
			narrative_retention_s: None,
		},
	}
}

/// Unit vector of length `dim` along `axis`.
pub fn axis(dim: usize, axis: usize) -> Vec<f32> {
	let mut out = vec![0.0; dim];

	if let Some(slot) = out.get_mut(axis) {
		*slot = 1.0;
	}

	out
}

/// Store whose saves always fail. Loads see nothing persisted.
#[derive(Default)]
pub struct FailingStore {
	attempts: Mutex<usize>,
}
impl FailingStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn attempts(&self) -> usize {
		*self.attempts.lock()
	}
}
impl<T> nc_storage::SnapshotStore<T> for FailingStore {
	fn load(&self) -> nc_storage::Result<Option<T>> {
		Ok(None)
	}

	fn save(&self, _: &T) -> nc_storage::Result<()> {
		*self.attempts.lock() += 1;

		Err(nc_storage::Error::Message("Disk is read-only.".to_string()))
	}

	fn location(&self) -> String {
		"failing".to_string()
	}
}
