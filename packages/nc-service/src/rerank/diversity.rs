use rand::Rng;
use serde::Serialize;

use nc_domain::similarity;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionReason {
	TopRelevance,
	Mmr,
	Exploration,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Selection {
	/// Position in the candidate pool handed to [`select_diverse_order`].
	pub pool_pos: usize,
	pub reason: SelectionReason,
	/// MMR gain at pick time. `None` for exploration picks.
	pub mmr_score: Option<f32>,
}

#[derive(Clone, Copy)]
struct DiversityPick {
	remaining_pos: usize,
	mmr_score: f32,
	pool_pos: usize,
}
impl DiversityPick {
	fn better_than(self, other: &Self) -> bool {
		self.mmr_score > other.mmr_score
			|| (self.mmr_score == other.mmr_score && self.pool_pos < other.pool_pos)
	}
}

/// Orders the whole pool by Maximal Marginal Relevance with ε-greedy exploration.
///
/// `relevance` and `unit_embeddings` are indexed by pool position, which must follow descending
/// dense similarity so equal gains keep the dense order. Embeddings must be unit length; the
/// redundancy term is the largest dot product against anything already picked.
pub fn select_diverse_order<R>(
	relevance: &[f32],
	unit_embeddings: &[Vec<f32>],
	mmr_lambda: f32,
	epsilon: f64,
	rng: &mut R,
) -> Vec<Selection>
where
	R: Rng + ?Sized,
{
	let n = relevance.len().min(unit_embeddings.len());
	let mut remaining: Vec<usize> = (0..n).collect();
	let mut max_similarity = vec![f32::NEG_INFINITY; n];
	let mut order = Vec::with_capacity(n);
	let explore = epsilon > 0.0 && epsilon <= 1.0;

	while !remaining.is_empty() {
		let (remaining_pos, reason, mmr_score) = if explore && rng.gen_bool(epsilon) {
			(rng.gen_range(0..remaining.len()), SelectionReason::Exploration, None)
		} else {
			let redundancy = (!order.is_empty()).then_some(max_similarity.as_slice());
			let Some(pick) = pick_next_candidate(&remaining, relevance, redundancy, mmr_lambda)
			else {
				break;
			};
			let reason =
				if order.is_empty() { SelectionReason::TopRelevance } else { SelectionReason::Mmr };

			(pick.remaining_pos, reason, Some(pick.mmr_score))
		};
		let picked = remaining.remove(remaining_pos);

		for &candidate in &remaining {
			let sim = similarity::dot(&unit_embeddings[candidate], &unit_embeddings[picked]);

			if sim > max_similarity[candidate] {
				max_similarity[candidate] = sim;
			}
		}

		order.push(Selection { pool_pos: picked, reason, mmr_score });
	}

	order
}

fn pick_next_candidate(
	remaining: &[usize],
	relevance: &[f32],
	max_similarity: Option<&[f32]>,
	mmr_lambda: f32,
) -> Option<DiversityPick> {
	let mut best: Option<DiversityPick> = None;

	for (remaining_pos, &pool_pos) in remaining.iter().enumerate() {
		let mmr_score = match max_similarity {
			None => relevance[pool_pos],
			Some(max_similarity) =>
				mmr_lambda * relevance[pool_pos] - (1.0 - mmr_lambda) * max_similarity[pool_pos],
		};
		let pick = DiversityPick { remaining_pos, mmr_score, pool_pos };

		if best.map(|current| pick.better_than(&current)).unwrap_or(true) {
			best = Some(pick);
		}
	}

	best
}
