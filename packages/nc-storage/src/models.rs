use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PheromoneRecord {
	pub value: f64,
	#[serde(with = "time::serde::rfc3339")]
	pub last_update: OffsetDateTime,
	#[serde(default)]
	pub exposures: f64,
}
impl PheromoneRecord {
	pub fn empty(now: OffsetDateTime) -> Self {
		Self { value: 0.0, last_update: now, exposures: 0.0 }
	}

	pub fn is_well_formed(&self) -> bool {
		self.value.is_finite()
			&& self.value >= 0.0
			&& self.exposures.is_finite()
			&& self.exposures >= 0.0
	}
}

/// Persisted form of the pheromone map: `{ id: { value, last_update, exposures } }`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PheromoneSnapshot {
	pub records: BTreeMap<String, PheromoneRecord>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct NarrativeSnapshot {
	pub vector: Vec<f32>,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub updated_at: Option<OffsetDateTime>,
}
