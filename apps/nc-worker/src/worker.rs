use std::{future::Future, time::Duration};

use time::OffsetDateTime;
use tokio::time::{self as tokio_time, MissedTickBehavior};

use nc_service::RetentionSweep;

/// Runs `sweep` every `interval` until `shutdown` resolves, then flushes pending state once more.
///
/// The first sweep runs immediately. Returns the number of sweeps performed.
pub async fn run_sweeps<F>(sweep: &RetentionSweep, interval: Duration, shutdown: F) -> u64
where
	F: Future<Output = ()>,
{
	let mut ticker = tokio_time::interval(interval);
	let mut runs = 0_u64;

	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	tokio::pin!(shutdown);

	loop {
		tokio::select! {
			_ = &mut shutdown => break,
			_ = ticker.tick() => {
				let report = sweep.run_once(OffsetDateTime::now_utc());

				runs += 1;

				tracing::debug!(
					run = runs,
					pheromones_purged = report.pheromones_purged,
					narrative_reset = report.narrative_reset,
					flushed = report.flushed,
					"Retention sweep finished."
				);
			},
		}
	}

	if sweep.flush() {
		tracing::info!(runs, "Retention worker stopped. State flushed.");
	} else {
		tracing::error!(runs, "Retention worker stopped without persisting all state.");
	}

	runs
}

#[cfg(test)]
mod tests {
	use nc_service::{Document, NeuralCache, RerankRequest};

	use super::*;

	#[tokio::test]
	async fn shutdown_flushes_deferred_exposures() {
		let scratch = nc_testkit::ScratchState::new().expect("Failed to create scratch dir.");
		let mut cfg = scratch.config();

		cfg.retention.sweep_interval_s = 3600;

		let cache = NeuralCache::open(&cfg).expect("Open succeeds.");

		// The first tick fires immediately, before any exposure exists.
		let runs = run_sweeps(&cache.sweep, Duration::from_secs(3600), async {
			tokio_time::sleep(Duration::from_millis(20)).await;
		})
		.await;

		assert_eq!(runs, 1);

		cache
			.engine
			.score(RerankRequest {
				query_embedding: vec![1.0, 0.0, 0.0, 0.0],
				documents: vec![
					Document::new("a", "").with_embedding(nc_testkit::axis(4, 0)),
					Document::new("b", "").with_embedding(nc_testkit::axis(4, 1)),
				],
				..Default::default()
			})
			.expect("Scoring succeeds.");

		assert!(!cfg.storage.pheromone_path().exists());

		run_sweeps(&cache.sweep, Duration::from_secs(3600), async {}).await;

		let raw = std::fs::read_to_string(cfg.storage.pheromone_path()).expect("File written.");

		assert!(raw.contains("\"a\""));
		assert!(raw.contains("\"b\""));
	}
}
