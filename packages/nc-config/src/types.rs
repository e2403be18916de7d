use std::path::PathBuf;

use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub scoring: Scoring,
	pub narrative: Narrative,
	pub pheromone: Pheromone,
	pub gating: Gating,
	pub retention: Retention,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	/// One of "json" or "memory".
	pub backend: String,
	pub state_dir: PathBuf,
	#[serde(default = "default_pheromone_file")]
	pub pheromone_file: String,
	#[serde(default = "default_narrative_file")]
	pub narrative_file: String,
}
impl Storage {
	pub fn pheromone_path(&self) -> PathBuf {
		self.state_dir.join(&self.pheromone_file)
	}

	pub fn narrative_path(&self) -> PathBuf {
		self.state_dir.join(&self.narrative_file)
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct Scoring {
	pub weight_dense: f32,
	pub weight_narrative: f32,
	pub weight_pheromone: f32,
	pub epsilon_greedy: f64,
	/// Applied when a request carries no MMR lambda of its own.
	#[serde(default = "default_mmr_lambda")]
	pub mmr_lambda: f32,
	/// How many of the leading results get an exposure recorded per request.
	#[serde(default = "default_exposure_top_n")]
	pub exposure_top_n: usize,
	/// Fixes the exploration RNG. Unset means OS entropy.
	pub seed: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Narrative {
	pub dim: usize,
	pub ema_alpha: f32,
	pub success_gate: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Pheromone {
	pub half_life_s: f64,
	pub exposure_penalty: f64,
	#[serde(default)]
	pub persist_exposures: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Gating {
	/// One of "off" or "auto".
	pub mode: String,
	pub threshold: f64,
	pub min_candidates: usize,
	pub max_candidates: usize,
	pub entropy_temp: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Retention {
	pub sweep_interval_s: u64,
	pub pheromone_retention_s: u64,
	pub narrative_retention_s: Option<u64>,
}

fn default_pheromone_file() -> String {
	"pheromones.json".to_string()
}

fn default_narrative_file() -> String {
	"narrative.json".to_string()
}

fn default_mmr_lambda() -> f32 {
	0.5
}

fn default_exposure_top_n() -> usize {
	10
}
