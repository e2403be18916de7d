mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Gating, Narrative, Pheromone, Retention, Scoring, Service, Storage};

use std::{fs, path::Path};

pub const BACKEND_JSON: &str = "json";
pub const BACKEND_MEMORY: &str = "memory";
pub const GATING_OFF: &str = "off";
pub const GATING_AUTO: &str = "auto";

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } => Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	validate_storage(cfg)?;
	validate_scoring(cfg)?;
	validate_narrative(cfg)?;
	validate_pheromone(cfg)?;
	validate_gating(&cfg.gating)?;

	if cfg.retention.sweep_interval_s == 0 {
		return Err(Error::validation("retention.sweep_interval_s", "must be greater than zero."));
	}
	if cfg.retention.pheromone_retention_s == 0 {
		return Err(Error::validation(
			"retention.pheromone_retention_s",
			"must be greater than zero.",
		));
	}
	if let Some(0) = cfg.retention.narrative_retention_s {
		return Err(Error::validation(
			"retention.narrative_retention_s",
			"must be greater than zero when set.",
		));
	}

	Ok(())
}

/// Checks a gating section on its own so request overrides can be validated with the same
/// rules as the file.
pub fn validate_gating(gating: &Gating) -> Result<()> {
	if !matches!(gating.mode.as_str(), GATING_OFF | GATING_AUTO) {
		return Err(Error::validation("gating.mode", "must be one of off or auto."));
	}

	check_unit_interval("gating.threshold", gating.threshold)?;

	if gating.min_candidates == 0 {
		return Err(Error::validation("gating.min_candidates", "must be greater than zero."));
	}
	if gating.max_candidates < gating.min_candidates {
		return Err(Error::validation(
			"gating.max_candidates",
			"must be greater than or equal to gating.min_candidates.",
		));
	}
	if !gating.entropy_temp.is_finite() || gating.entropy_temp <= 0.0 {
		return Err(Error::validation(
			"gating.entropy_temp",
			"must be a finite number greater than zero.",
		));
	}

	Ok(())
}

fn validate_storage(cfg: &Config) -> Result<()> {
	match cfg.storage.backend.as_str() {
		BACKEND_MEMORY => Ok(()),
		BACKEND_JSON => {
			if cfg.storage.state_dir.as_os_str().is_empty() {
				return Err(Error::validation(
					"storage.state_dir",
					"must be non-empty for the json backend.",
				));
			}

			for (key, file) in [
				("storage.pheromone_file", &cfg.storage.pheromone_file),
				("storage.narrative_file", &cfg.storage.narrative_file),
			] {
				if file.trim().is_empty() {
					return Err(Error::validation(key, "must be non-empty."));
				}
			}

			if cfg.storage.pheromone_file == cfg.storage.narrative_file {
				return Err(Error::validation(
					"storage.narrative_file",
					"must differ from storage.pheromone_file.",
				));
			}

			Ok(())
		},
		_ => Err(Error::validation("storage.backend", "must be one of json or memory.")),
	}
}

fn validate_scoring(cfg: &Config) -> Result<()> {
	for (key, weight) in [
		("scoring.weight_dense", cfg.scoring.weight_dense),
		("scoring.weight_narrative", cfg.scoring.weight_narrative),
		("scoring.weight_pheromone", cfg.scoring.weight_pheromone),
	] {
		if !weight.is_finite() {
			return Err(Error::validation(key, "must be a finite number."));
		}
		if weight < 0.0 {
			return Err(Error::validation(key, "must be zero or greater."));
		}
	}

	check_unit_interval("scoring.epsilon_greedy", cfg.scoring.epsilon_greedy)?;
	check_unit_interval("scoring.mmr_lambda", f64::from(cfg.scoring.mmr_lambda))?;

	Ok(())
}

fn validate_narrative(cfg: &Config) -> Result<()> {
	if cfg.narrative.dim == 0 {
		return Err(Error::validation("narrative.dim", "must be greater than zero."));
	}

	let alpha = cfg.narrative.ema_alpha;

	if !alpha.is_finite() || alpha <= 0.0 || alpha >= 1.0 {
		return Err(Error::validation(
			"narrative.ema_alpha",
			"must be in the open range 0.0-1.0.",
		));
	}

	check_unit_interval("narrative.success_gate", f64::from(cfg.narrative.success_gate))
}

fn validate_pheromone(cfg: &Config) -> Result<()> {
	if !cfg.pheromone.half_life_s.is_finite() || cfg.pheromone.half_life_s <= 0.0 {
		return Err(Error::validation(
			"pheromone.half_life_s",
			"must be a finite number greater than zero.",
		));
	}
	if !cfg.pheromone.exposure_penalty.is_finite() || cfg.pheromone.exposure_penalty < 0.0 {
		return Err(Error::validation(
			"pheromone.exposure_penalty",
			"must be a finite number, zero or greater.",
		));
	}

	Ok(())
}

fn check_unit_interval(key: &'static str, value: f64) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::validation(key, "must be a finite number."));
	}
	if !(0.0..=1.0).contains(&value) {
		return Err(Error::validation(key, "must be in the range 0.0-1.0."));
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.storage.backend = cfg.storage.backend.trim().to_ascii_lowercase();
	cfg.gating.mode = cfg.gating.mode.trim().to_ascii_lowercase();

	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}
}
