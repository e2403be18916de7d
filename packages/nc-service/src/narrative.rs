use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::{Error, Result};
use nc_domain::similarity;
use nc_storage::{SnapshotStore, SnapshotWriter, models::NarrativeSnapshot};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeUpdate {
	/// Success fell below the gate; the vector is untouched.
	Gated,
	/// Nothing to learn from (empty or non-finite embedding).
	Skipped,
	Applied {
		/// The tracked dimension changed and history was discarded first.
		reset: bool,
	},
}

struct NarrativeState {
	vector: Vec<f32>,
	updated_at: Option<OffsetDateTime>,
	generation: u64,
}
impl NarrativeState {
	fn snapshot(&self) -> NarrativeSnapshot {
		NarrativeSnapshot { vector: self.vector.clone(), updated_at: self.updated_at }
	}
}

/// Process-wide exponential moving average of successful embeddings, kept at unit length.
///
/// `coherence` takes the shared lock; `update` and `purge_if_stale` take the exclusive lock and
/// persist after releasing it.
pub struct NarrativeTracker {
	alpha: f32,
	success_gate: f32,
	state: RwLock<NarrativeState>,
	writer: SnapshotWriter<NarrativeSnapshot>,
}
impl NarrativeTracker {
	pub fn open(
		cfg: &nc_config::Narrative,
		store: Arc<dyn SnapshotStore<NarrativeSnapshot>>,
	) -> Result<Self> {
		if cfg.dim == 0 {
			return Err(Error::Configuration {
				message: "narrative.dim must be greater than zero.".to_string(),
			});
		}
		if !cfg.ema_alpha.is_finite() || cfg.ema_alpha <= 0.0 || cfg.ema_alpha >= 1.0 {
			return Err(Error::Configuration {
				message: "narrative.ema_alpha must be in the open range 0.0-1.0.".to_string(),
			});
		}
		if !(0.0..=1.0).contains(&cfg.success_gate) {
			return Err(Error::Configuration {
				message: "narrative.success_gate must be in the range 0.0-1.0.".to_string(),
			});
		}

		let writer = SnapshotWriter::new("narrative", store);
		let (vector, updated_at) = match writer.load() {
			Some(snapshot)
				if snapshot.vector.len() == cfg.dim
					&& snapshot.vector.iter().all(|value| value.is_finite()) =>
				(snapshot.vector, snapshot.updated_at),
			Some(snapshot) => {
				tracing::warn!(
					stored_dim = snapshot.vector.len(),
					configured_dim = cfg.dim,
					"Persisted narrative vector does not match configuration. Starting from zero."
				);

				(vec![0.0; cfg.dim], None)
			},
			None => (vec![0.0; cfg.dim], None),
		};

		Ok(Self {
			alpha: cfg.ema_alpha,
			success_gate: cfg.success_gate,
			state: RwLock::new(NarrativeState { vector, updated_at, generation: 0 }),
			writer,
		})
	}

	/// Cosine similarity of the tracked direction against each document embedding.
	///
	/// All zeros while the tracked vector is zero. Embeddings of a different dimension are
	/// compared against the tracked vector truncated or zero-padded to their length.
	pub fn coherence(&self, doc_embeddings: &[Vec<f32>]) -> Vec<f32> {
		let state = self.state.read();

		if similarity::is_zero(&state.vector) {
			return vec![0.0; doc_embeddings.len()];
		}

		similarity::cosine_similarities(&state.vector, doc_embeddings)
	}

	pub fn update(&self, embedding: &[f32], success: f32, now: OffsetDateTime) -> NarrativeUpdate {
		if success.is_nan() || success < self.success_gate {
			return NarrativeUpdate::Gated;
		}
		if embedding.is_empty() || embedding.iter().any(|value| !value.is_finite()) {
			return NarrativeUpdate::Skipped;
		}

		let (reset, generation, snapshot) = {
			let mut state = self.state.write();
			let reset = state.vector.len() != embedding.len();

			if reset {
				tracing::warn!(
					tracked_dim = state.vector.len(),
					incoming_dim = embedding.len(),
					"Narrative dimension changed. Discarding history."
				);

				state.vector = vec![0.0; embedding.len()];
			}

			let blended: Vec<f32> = state
				.vector
				.iter()
				.zip(embedding)
				.map(|(current, incoming)| (1.0 - self.alpha) * current + self.alpha * incoming)
				.collect();

			state.vector = similarity::normalize(&blended);
			state.updated_at = Some(now);
			state.generation += 1;

			(reset, state.generation, state.snapshot())
		};

		self.writer.persist(generation, &snapshot);

		NarrativeUpdate::Applied { reset }
	}

	/// Resets the vector to zero when its last update is older than `now - retention`.
	///
	/// A vector that was never updated is left alone. Returns whether a reset happened.
	pub fn purge_if_stale(&self, retention: Duration, now: OffsetDateTime) -> bool {
		let Some(cutoff) = now.checked_sub(retention) else { return false };
		let (generation, snapshot) = {
			let mut state = self.state.write();
			let Some(updated_at) = state.updated_at else { return false };

			if updated_at >= cutoff {
				return false;
			}

			state.vector.fill(0.0);
			state.updated_at = None;
			state.generation += 1;

			(state.generation, state.snapshot())
		};

		self.writer.persist(generation, &snapshot);

		true
	}

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

	pub fn vector(&self) -> Vec<f32> {
		self.state.read().vector.clone()
	}

	pub fn dimension(&self) -> usize {
		self.state.read().vector.len()
	}

	pub fn updated_at(&self) -> Option<OffsetDateTime> {
		self.state.read().updated_at
	}
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;
	use nc_storage::MemoryStore;

	fn tracker(dim: usize) -> NarrativeTracker {
		let cfg = nc_config::Narrative { dim, ema_alpha: 0.5, success_gate: 0.5 };

		NarrativeTracker::open(&cfg, Arc::new(MemoryStore::new())).expect("Valid config.")
	}

	#[test]
	fn first_update_points_at_embedding() {
		let tracker = tracker(2);
		let outcome = tracker.update(&[3.0, 4.0], 1.0, datetime!(2026-03-01 00:00:00 UTC));

		assert_eq!(outcome, NarrativeUpdate::Applied { reset: false });
		assert_eq!(tracker.vector(), vec![0.6, 0.8]);
	}

	#[test]
	fn dimension_change_resets_history() {
		let tracker = tracker(2);
		let now = datetime!(2026-03-01 00:00:00 UTC);

		tracker.update(&[1.0, 0.0], 1.0, now);

		let outcome = tracker.update(&[0.0, 0.0, 2.0], 1.0, now);

		assert_eq!(outcome, NarrativeUpdate::Applied { reset: true });
		assert_eq!(tracker.vector(), vec![0.0, 0.0, 1.0]);
	}

	#[test]
	fn empty_embedding_is_skipped() {
		let tracker = tracker(2);

		assert_eq!(
			tracker.update(&[], 1.0, datetime!(2026-03-01 00:00:00 UTC)),
			NarrativeUpdate::Skipped
		);
		assert_eq!(tracker.dimension(), 2);
	}

	#[test]
	fn stale_vector_is_purged_and_fresh_one_kept() {
		let tracker = tracker(2);
		let now = datetime!(2026-03-01 00:00:00 UTC);

		assert!(!tracker.purge_if_stale(Duration::hours(1), now));

		tracker.update(&[1.0, 1.0], 1.0, now);

		assert!(!tracker.purge_if_stale(Duration::hours(1), now + Duration::minutes(30)));
		assert!(tracker.purge_if_stale(Duration::hours(1), now + Duration::hours(2)));
		assert_eq!(tracker.vector(), vec![0.0, 0.0]);
		assert_eq!(tracker.updated_at(), None);
	}
}
