use serde::{Deserialize, Serialize};

use crate::similarity;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatingMode {
	Off,
	Auto,
}
impl GatingMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Off => "off",
			Self::Auto => "auto",
		}
	}

	pub fn parse(value: &str) -> Option<Self> {
		match value.trim().to_ascii_lowercase().as_str() {
			"off" => Some(Self::Off),
			"auto" => Some(Self::Auto),
			_ => None,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct GatingPolicy {
	pub mode: GatingMode,
	/// Below this uncertainty the budget is floored to `min_candidates`.
	pub threshold: f64,
	pub min_candidates: usize,
	pub max_candidates: usize,
	pub entropy_temp: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GatingDecision {
	pub mode: GatingMode,
	/// `None` when gating is off.
	pub uncertainty: Option<f64>,
	pub candidate_count: usize,
}

/// Sizes the rerank pool from the normalized entropy of a temperature softmax over
/// `similarities`. A single dominant candidate gives a small budget; a flat distribution gives a
/// budget near `max_candidates`.
pub fn make_decision(similarities: &[f32], policy: &GatingPolicy) -> GatingDecision {
	let pool_size = similarities.len();

	match policy.mode {
		GatingMode::Off =>
			GatingDecision { mode: GatingMode::Off, uncertainty: None, candidate_count: pool_size },
		GatingMode::Auto => {
			let uncertainty = normalized_entropy(similarities, policy.entropy_temp);

			GatingDecision {
				mode: GatingMode::Auto,
				uncertainty: Some(uncertainty),
				candidate_count: candidate_budget(uncertainty, pool_size, policy),
			}
		},
	}
}

/// Shannon entropy of `softmax(similarities / entropy_temp)` divided by `ln(pool size)`.
///
/// Pools of zero or one candidate carry no ambiguity and return `0.0`. Non-finite similarities
/// receive zero probability mass.
pub fn normalized_entropy(similarities: &[f32], entropy_temp: f64) -> f64 {
	let n = similarities.len();

	if n <= 1 {
		return 0.0;
	}

	let logits: Vec<f64> = similarities
		.iter()
		.map(|value| {
			let value = f64::from(*value);

			if value.is_finite() { value / entropy_temp } else { f64::NEG_INFINITY }
		})
		.collect();
	let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);

	if !max.is_finite() {
		return 1.0;
	}

	let weights: Vec<f64> = logits.iter().map(|logit| (logit - max).exp()).collect();
	let total: f64 = weights.iter().sum();
	let entropy: f64 = weights
		.iter()
		.map(|weight| weight / total)
		.filter(|p| *p > 0.0)
		.map(|p| -p * p.ln())
		.sum();

	(entropy / (n as f64).ln()).clamp(0.0, 1.0)
}

/// Maps an uncertainty in `[0, 1]` to a candidate count in
/// `[min(min_candidates, pool), min(max_candidates, pool)]`.
///
/// Non-decreasing in `uncertainty` for a fixed pool size and policy.
pub fn candidate_budget(uncertainty: f64, pool_size: usize, policy: &GatingPolicy) -> usize {
	let upper = policy.max_candidates.min(pool_size);
	let lower = policy.min_candidates.min(upper);

	if uncertainty.is_nan() || uncertainty < policy.threshold {
		return lower;
	}

	let span = policy.max_candidates.saturating_sub(policy.min_candidates) as f64;
	let interpolated = (policy.min_candidates as f64 + uncertainty.clamp(0.0, 1.0) * span).round();

	(interpolated as usize).clamp(lower, upper)
}

/// Indices of the `k` largest similarities, ties broken by ascending index.
pub fn top_indices_by_similarity(similarities: &[f32], k: usize) -> Vec<usize> {
	let mut indices: Vec<usize> = (0..similarities.len()).collect();

	indices.sort_by(|&a, &b| {
		similarity::cmp_f32_desc(similarities[a], similarities[b]).then_with(|| a.cmp(&b))
	});
	indices.truncate(k);

	indices
}

#[cfg(test)]
mod tests {
	use super::*;

	fn policy(mode: GatingMode) -> GatingPolicy {
		GatingPolicy {
			mode,
			threshold: 0.0,
			min_candidates: 2,
			max_candidates: 6,
			entropy_temp: 1.0,
		}
	}

	#[test]
	fn uniform_pool_is_fully_uncertain() {
		let sims = vec![0.3_f32; 16];

		assert!((normalized_entropy(&sims, 1.0) - 1.0).abs() < 1e-9);
	}

	#[test]
	fn tiny_pools_have_no_uncertainty() {
		assert_eq!(normalized_entropy(&[], 1.0), 0.0);
		assert_eq!(normalized_entropy(&[0.9], 1.0), 0.0);
	}

	#[test]
	fn budget_is_clamped_to_pool_size() {
		let p = policy(GatingMode::Auto);

		assert_eq!(candidate_budget(1.0, 4, &p), 4);
		assert_eq!(candidate_budget(0.0, 1, &p), 1);
		assert_eq!(candidate_budget(0.5, 100, &p), 4);
	}

	#[test]
	fn threshold_floors_confident_queries() {
		let mut p = policy(GatingMode::Auto);

		p.threshold = 0.6;

		assert_eq!(candidate_budget(0.59, 100, &p), 2);
		assert_eq!(candidate_budget(0.75, 100, &p), 5);
	}

	#[test]
	fn off_mode_keeps_entire_pool() {
		let decision = make_decision(&[0.1, 0.9, 0.4], &policy(GatingMode::Off));

		assert_eq!(decision.candidate_count, 3);
		assert_eq!(decision.uncertainty, None);
	}

	#[test]
	fn top_indices_break_ties_by_position() {
		assert_eq!(top_indices_by_similarity(&[0.5, 0.9, 0.5, 0.9, 0.1], 4), vec![1, 3, 0, 2]);
		assert_eq!(top_indices_by_similarity(&[0.5], 3), vec![0]);
	}

	#[test]
	fn mode_parses_case_insensitively() {
		assert_eq!(GatingMode::parse(" Auto "), Some(GatingMode::Auto));
		assert_eq!(GatingMode::parse("OFF"), Some(GatingMode::Off));
		assert_eq!(GatingMode::parse("dynamic"), None);
	}
}
