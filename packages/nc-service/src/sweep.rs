use std::sync::Arc;

use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::{NarrativeTracker, PheromoneStore};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct SweepReport {
	pub pheromones_purged: usize,
	pub narrative_reset: bool,
	/// Both stores are durable after the sweep.
	pub flushed: bool,
}

/// Periodic retention pass over both stores. Also writes deferred exposure counts.
pub struct RetentionSweep {
	pheromones: Arc<PheromoneStore>,
	narrative: Arc<NarrativeTracker>,
	pheromone_retention: Duration,
	narrative_retention: Option<Duration>,
}
impl RetentionSweep {
	pub fn new(
		cfg: &nc_config::Retention,
		pheromones: Arc<PheromoneStore>,
		narrative: Arc<NarrativeTracker>,
	) -> Self {
		Self {
			pheromones,
			narrative,
			pheromone_retention: seconds(cfg.pheromone_retention_s),
			narrative_retention: cfg.narrative_retention_s.map(seconds),
		}
	}

	pub fn run_once(&self, now: OffsetDateTime) -> SweepReport {
		let pheromones_purged = self.pheromones.purge_older_than(self.pheromone_retention, now);
		let narrative_reset = self
			.narrative_retention
			.map(|retention| self.narrative.purge_if_stale(retention, now))
			.unwrap_or(false);
		let pheromones_flushed = self.pheromones.flush();
		let narrative_flushed = self.narrative.flush();
		let report = SweepReport {
			pheromones_purged,
			narrative_reset,
			flushed: pheromones_flushed && narrative_flushed,
		};

		if report.pheromones_purged > 0 || report.narrative_reset {
			tracing::info!(
				pheromones_purged = report.pheromones_purged,
				narrative_reset = report.narrative_reset,
				"Retention sweep removed stale state."
			);
		}
		if !report.flushed {
			tracing::warn!(
				pheromones_flushed,
				narrative_flushed,
				"Retention sweep could not persist all state."
			);
		}

		report
	}

	/// Writes pending state without purging anything.
	pub fn flush(&self) -> bool {
		let pheromones_flushed = self.pheromones.flush();
		let narrative_flushed = self.narrative.flush();

		pheromones_flushed && narrative_flushed
	}
}

fn seconds(value: u64) -> Duration {
	Duration::seconds(i64::try_from(value).unwrap_or(i64::MAX))
}
