use proptest::prelude::*;

use nc_domain::{
	decay,
	gating::{self, GatingMode, GatingPolicy},
	similarity,
};

fn auto_policy(threshold: f64) -> GatingPolicy {
	GatingPolicy {
		mode: GatingMode::Auto,
		threshold,
		min_candidates: 100,
		max_candidates: 400,
		entropy_temp: 1.0,
	}
}

#[test]
fn peaked_pool_gates_near_min_candidates() {
	let mut sims = vec![0.0_f32; 400];

	sims[17] = 1.0;

	let policy = GatingPolicy { entropy_temp: 0.05, ..auto_policy(0.5) };
	let decision = gating::make_decision(&sims, &policy);
	let uncertainty = decision.uncertainty.expect("Auto mode reports uncertainty.");

	assert!(uncertainty < 0.1, "uncertainty was {uncertainty}");
	assert_eq!(decision.candidate_count, 100);
}

#[test]
fn flat_pool_gates_near_max_candidates() {
	let sims: Vec<f32> = (0..400).map(|idx| 0.5 + (idx % 7) as f32 * 1e-3).collect();
	let decision = gating::make_decision(&sims, &auto_policy(0.5));
	let uncertainty = decision.uncertainty.expect("Auto mode reports uncertainty.");

	assert!(uncertainty > 0.99, "uncertainty was {uncertainty}");
	assert!(decision.candidate_count >= 395, "count was {}", decision.candidate_count);
}

#[test]
fn decision_serializes_mode_as_snake_case() {
	let decision = gating::make_decision(&[0.2, 0.4], &GatingPolicy {
		mode: GatingMode::Off,
		..auto_policy(0.5)
	});
	let json = serde_json::to_value(decision).expect("Decision must serialize.");

	assert_eq!(json["mode"], "off");
	assert!(json["uncertainty"].is_null());
	assert_eq!(json["candidate_count"], 2);
}

#[test]
fn query_dimension_is_reconciled_before_comparison() {
	let docs = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]];
	let short = similarity::cosine_similarities(&[1.0], &docs);
	let long = similarity::cosine_similarities(&[0.0, 2.0, 0.0, 9.0, 9.0], &docs);

	assert_eq!(short, vec![1.0, 0.0]);
	assert_eq!(long, vec![0.0, 1.0]);
}

#[test]
fn zero_vectors_score_zero() {
	let docs = vec![vec![0.0, 0.0], vec![1.0, 1.0]];

	assert_eq!(similarity::cosine_similarities(&[0.0, 0.0], &docs), vec![0.0, 0.0]);
	assert_eq!(similarity::cosine_similarities(&[1.0, 1.0], &docs)[0], 0.0);
}

proptest! {
	#[test]
	fn budget_is_monotone_in_uncertainty(
		a in 0.0_f64..=1.0,
		b in 0.0_f64..=1.0,
		threshold in 0.0_f64..=1.0,
		pool in 0_usize..600,
	) {
		let (low, high) = if a <= b { (a, b) } else { (b, a) };
		let policy = auto_policy(threshold);

		prop_assert!(
			gating::candidate_budget(low, pool, &policy)
				<= gating::candidate_budget(high, pool, &policy)
		);
	}

	#[test]
	fn off_mode_always_keeps_pool(sims in proptest::collection::vec(-1.0_f32..=1.0, 0..200)) {
		let policy = GatingPolicy { mode: GatingMode::Off, ..auto_policy(0.5) };

		prop_assert_eq!(gating::make_decision(&sims, &policy).candidate_count, sims.len());
	}

	#[test]
	fn uncertainty_stays_in_unit_range(
		sims in proptest::collection::vec(-1.0_f32..=1.0, 0..200),
		temp in 0.01_f64..10.0,
	) {
		let value = gating::normalized_entropy(&sims, temp);

		prop_assert!((0.0..=1.0).contains(&value));
	}

	#[test]
	fn top_indices_are_sorted_and_unique(
		sims in proptest::collection::vec(-1.0_f32..=1.0, 0..100),
		k in 0_usize..120,
	) {
		let picked = gating::top_indices_by_similarity(&sims, k);

		prop_assert_eq!(picked.len(), k.min(sims.len()));

		for pair in picked.windows(2) {
			let (a, b) = (pair[0], pair[1]);

			prop_assert!(sims[a] > sims[b] || (sims[a] == sims[b] && a < b));
		}
	}

	#[test]
	fn decay_is_strictly_decreasing(
		half_life in 0.1_f64..10_000.0,
		t1 in 0.0_f64..1_000.0,
		dt in 0.01_f64..1_000.0,
	) {
		let earlier = decay::half_life_factor(t1, half_life);
		let later = decay::half_life_factor(t1 + dt, half_life);

		prop_assume!(earlier > f64::MIN_POSITIVE);
		prop_assert!(later < earlier);
	}

	#[test]
	fn exposure_multiplier_matches_closed_form(
		exposures in 0_u32..50,
		penalty in 0.0_f64..2.0,
	) {
		let n = f64::from(exposures);

		prop_assert_eq!(
			decay::exposure_multiplier(n, penalty),
			(1.0 - penalty * n).max(0.0).min(1.0)
		);
	}
}
