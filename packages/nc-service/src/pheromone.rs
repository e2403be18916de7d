use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use time::{Duration, OffsetDateTime};

use crate::{Error, Result};
use nc_domain::decay;
use nc_storage::{
	SnapshotStore, SnapshotWriter,
	models::{PheromoneRecord, PheromoneSnapshot},
};

struct PheromoneState {
	records: HashMap<String, PheromoneRecord>,
	generation: u64,
}
impl PheromoneState {
	fn snapshot(&self) -> PheromoneSnapshot {
		PheromoneSnapshot {
			records: self.records.iter().map(|(id, record)| (id.clone(), record.clone())).collect(),
		}
	}
}

/// Shared pheromone map with lazy half-life decay and an exposure penalty.
///
/// Reads take a shared lock and never write back. `reinforce`, `record_exposure` and
/// `purge_older_than` take the exclusive lock for their whole read-modify-write sequence, then
/// persist a snapshot after the lock is released.
pub struct PheromoneStore {
	half_life_s: f64,
	exposure_penalty: f64,
	persist_exposures: bool,
	state: RwLock<PheromoneState>,
	writer: SnapshotWriter<PheromoneSnapshot>,
}
impl PheromoneStore {
	pub fn open(
		cfg: &nc_config::Pheromone,
		store: Arc<dyn SnapshotStore<PheromoneSnapshot>>,
	) -> Result<Self> {
		if !cfg.half_life_s.is_finite() || cfg.half_life_s <= 0.0 {
			return Err(Error::Configuration {
				message: "pheromone.half_life_s must be a finite number greater than zero."
					.to_string(),
			});
		}
		if !cfg.exposure_penalty.is_finite() || cfg.exposure_penalty < 0.0 {
			return Err(Error::Configuration {
				message: "pheromone.exposure_penalty must be a finite number, zero or greater."
					.to_string(),
			});
		}

		let writer = SnapshotWriter::new("pheromone", store);
		let records = writer.load().map(sanitize_records).unwrap_or_default();

		tracing::debug!(records = records.len(), "Pheromone store opened.");

		Ok(Self {
			half_life_s: cfg.half_life_s,
			exposure_penalty: cfg.exposure_penalty,
			persist_exposures: cfg.persist_exposures,
			state: RwLock::new(PheromoneState { records, generation: 0 }),
			writer,
		})
	}

	/// Decayed, exposure-penalized bonus for `id` as of `now`. Unknown ids score `0.0`.
	pub fn bonus(&self, id: &str, now: OffsetDateTime) -> f64 {
		let state = self.state.read();

		state.records.get(id).map(|record| self.decayed_bonus(record, now)).unwrap_or(0.0)
	}

	/// Bonuses for a batch, all decayed to the same `now` under one read lock.
	pub fn bulk_bonus<S>(&self, ids: &[S], now: OffsetDateTime) -> Vec<f64>
	where
		S: AsRef<str>,
	{
		let state = self.state.read();

		ids.iter()
			.map(|id| {
				state
					.records
					.get(id.as_ref())
					.map(|record| self.decayed_bonus(record, now))
					.unwrap_or(0.0)
			})
			.collect()
	}

	pub fn reinforce<S>(&self, ids: &[S], reward: f64, now: OffsetDateTime)
	where
		S: AsRef<str>,
	{
		if ids.is_empty() {
			return;
		}

		let (generation, snapshot) = {
			let mut state = self.state.write();

			for id in ids {
				let record = state
					.records
					.entry(id.as_ref().to_string())
					.or_insert_with(|| PheromoneRecord::empty(now));
				let factor =
					decay::half_life_factor(elapsed_seconds(record.last_update, now), self.half_life_s);

				record.value = (record.value * factor + reward).max(0.0);
				record.last_update = now;
			}

			state.generation += 1;

			(state.generation, state.snapshot())
		};

		self.writer.persist(generation, &snapshot);
	}

	/// Counts one exposure per id. Decay state is untouched.
	///
	/// Persists immediately only when `pheromone.persist_exposures` is set; otherwise the change
	/// is written by the next reinforcement, purge or [`PheromoneStore::flush`].
	pub fn record_exposure<S>(&self, ids: &[S], now: OffsetDateTime)
	where
		S: AsRef<str>,
	{
		if ids.is_empty() {
			return;
		}

		let mut state = self.state.write();

		for id in ids {
			let record = state
				.records
				.entry(id.as_ref().to_string())
				.or_insert_with(|| PheromoneRecord::empty(now));

			record.exposures += 1.0;
		}

		state.generation += 1;

		if !self.persist_exposures {
			return;
		}

		let (generation, snapshot) = (state.generation, state.snapshot());

		drop(state);

		self.writer.persist(generation, &snapshot);
	}

	/// Removes records whose last update is older than `now - retention`. Returns the count.
	pub fn purge_older_than(&self, retention: Duration, now: OffsetDateTime) -> usize {
		let Some(cutoff) = now.checked_sub(retention) else { return 0 };
		let (removed, generation, snapshot) = {
			let mut state = self.state.write();
			let before = state.records.len();

			state.records.retain(|_, record| record.last_update >= cutoff);

			let removed = before - state.records.len();

			if removed == 0 {
				return 0;
			}

			state.generation += 1;

			(removed, state.generation, state.snapshot())
		};

		self.writer.persist(generation, &snapshot);

		removed
	}

	/// Writes any mutation not yet persisted. Returns whether the store is now durable.
	pub fn flush(&self) -> bool {
		let (generation, snapshot) = {
			let state = self.state.read();

			if state.generation <= self.writer.written_generation() {
				return true;
			}

			(state.generation, state.snapshot())
		};

		self.writer.persist(generation, &snapshot)
	}

	pub fn record(&self, id: &str) -> Option<PheromoneRecord> {
		self.state.read().records.get(id).cloned()
	}

	pub fn len(&self) -> usize {
		self.state.read().records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn decayed_bonus(&self, record: &PheromoneRecord, now: OffsetDateTime) -> f64 {
		let factor =
			decay::half_life_factor(elapsed_seconds(record.last_update, now), self.half_life_s);

		record.value * factor * decay::exposure_multiplier(record.exposures, self.exposure_penalty)
	}
}

fn elapsed_seconds(from: OffsetDateTime, to: OffsetDateTime) -> f64 {
	(to - from).as_seconds_f64()
}

fn sanitize_records(snapshot: PheromoneSnapshot) -> HashMap<String, PheromoneRecord> {
	let total = snapshot.records.len();
	let records: HashMap<String, PheromoneRecord> =
		snapshot.records.into_iter().filter(|(_, record)| record.is_well_formed()).collect();

	if records.len() < total {
		tracing::warn!(
			dropped = total - records.len(),
			"Dropped malformed pheromone records on load."
		);
	}

	records
}
