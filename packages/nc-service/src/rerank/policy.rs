use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use nc_domain::gating::{GatingMode, GatingPolicy};

/// Lambda used when a request asks for a value outside `[0, 1]`.
pub const FALLBACK_MMR_LAMBDA: f32 = 0.5;

/// Per-request replacement for any subset of the `[gating]` section.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct GatingOverride {
	#[serde(default)]
	pub mode: Option<String>,
	#[serde(default)]
	pub threshold: Option<f64>,
	#[serde(default)]
	pub min_candidates: Option<usize>,
	#[serde(default)]
	pub max_candidates: Option<usize>,
	#[serde(default)]
	pub entropy_temp: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoringWeights {
	pub dense: f32,
	pub narrative: f32,
	pub pheromone: f32,
}
impl ScoringWeights {
	pub fn from_config(cfg: &nc_config::Scoring) -> Self {
		Self {
			dense: cfg.weight_dense,
			narrative: cfg.weight_narrative,
			pheromone: cfg.weight_pheromone,
		}
	}

	pub fn blend(&self, dense: f32, narrative: f32, pheromone: f32) -> f32 {
		self.dense * dense + self.narrative * narrative + self.pheromone * pheromone
	}
}

pub fn resolve_gating_policy(
	cfg: &nc_config::Gating,
	override_: Option<&GatingOverride>,
) -> Result<GatingPolicy> {
	let merged = nc_config::Gating {
		mode: override_
			.and_then(|value| value.mode.as_deref())
			.map(|mode| mode.trim().to_ascii_lowercase())
			.unwrap_or_else(|| cfg.mode.clone()),
		threshold: override_.and_then(|value| value.threshold).unwrap_or(cfg.threshold),
		min_candidates: override_
			.and_then(|value| value.min_candidates)
			.unwrap_or(cfg.min_candidates),
		max_candidates: override_
			.and_then(|value| value.max_candidates)
			.unwrap_or(cfg.max_candidates),
		entropy_temp: override_.and_then(|value| value.entropy_temp).unwrap_or(cfg.entropy_temp),
	};

	nc_config::validate_gating(&merged)
		.map_err(|err| Error::InvalidRequest { message: err.to_string() })?;

	let Some(mode) = GatingMode::parse(&merged.mode) else {
		return Err(Error::InvalidRequest {
			message: "gating.mode must be one of off or auto.".to_string(),
		});
	};

	Ok(GatingPolicy {
		mode,
		threshold: merged.threshold,
		min_candidates: merged.min_candidates,
		max_candidates: merged.max_candidates,
		entropy_temp: merged.entropy_temp,
	})
}

/// Request value when it lies in `[0, 1]`, the configured default when absent, and
/// [`FALLBACK_MMR_LAMBDA`] otherwise.
pub fn resolve_mmr_lambda(requested: Option<f32>, default: f32) -> f32 {
	match requested {
		None => default,
		Some(value) if (0.0..=1.0).contains(&value) => value,
		Some(_) => FALLBACK_MMR_LAMBDA,
	}
}
