pub mod feedback;
pub mod narrative;
pub mod pheromone;
pub mod rerank;
pub mod sweep;

mod error;

pub use error::{Error, Result};
pub use feedback::{FeedbackReport, FeedbackRequest};
pub use narrative::{NarrativeTracker, NarrativeUpdate};
pub use pheromone::PheromoneStore;
pub use rerank::{
	Document, RerankEngine, RerankRequest, RerankResponse, ScoreComponents, ScoredDocument,
	policy::GatingOverride,
};
pub use sweep::{RetentionSweep, SweepReport};

use std::sync::Arc;

use nc_config::Config;

/// Engine and sweep sharing one pair of stores opened from the configured backend.
pub struct NeuralCache {
	pub engine: RerankEngine,
	pub sweep: RetentionSweep,
}
impl NeuralCache {
	pub fn open(cfg: &Config) -> Result<Self> {
		nc_config::validate(cfg)?;

		let stores = nc_storage::open(&cfg.storage);
		let pheromones = Arc::new(PheromoneStore::open(&cfg.pheromone, stores.pheromone)?);
		let narrative = Arc::new(NarrativeTracker::open(&cfg.narrative, stores.narrative)?);
		let sweep = RetentionSweep::new(&cfg.retention, pheromones.clone(), narrative.clone());
		let engine = RerankEngine::new(cfg, pheromones, narrative)?;

		tracing::info!(
			backend = %cfg.storage.backend,
			state_dir = %cfg.storage.state_dir.display(),
			"NeuralCache state opened."
		);

		Ok(Self { engine, sweep })
	}
}
