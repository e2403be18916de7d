pub mod diversity;
pub mod policy;

use std::sync::Arc;

use parking_lot::Mutex;
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::{
	Error, NarrativeTracker, PheromoneStore, Result,
	rerank::policy::{GatingOverride, ScoringWeights},
};
use nc_config::Config;
use nc_domain::{
	gating::{self, GatingDecision},
	similarity,
};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Document {
	pub id: String,
	#[serde(default)]
	pub text: String,
	#[serde(default)]
	pub metadata: Map<String, Value>,
	#[serde(default)]
	pub embedding: Option<Vec<f32>>,
}
impl Document {
	pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
		Self { id: id.into(), text: text.into(), metadata: Map::new(), embedding: None }
	}

	pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
		self.embedding = Some(embedding);

		self
	}
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct ScoreComponents {
	pub dense: f32,
	pub narrative: f32,
	pub pheromone: f32,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ScoredDocument {
	#[serde(flatten)]
	pub document: Document,
	pub score: f32,
	pub components: ScoreComponents,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct RerankRequest {
	pub query_embedding: Vec<f32>,
	pub documents: Vec<Document>,
	#[serde(default)]
	pub mmr_lambda: Option<f32>,
	#[serde(default)]
	pub gating: Option<GatingOverride>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RerankResponse {
	/// Every input document exactly once. The gated pool comes first in MMR order, followed by
	/// the remaining documents by descending dense similarity.
	pub items: Vec<ScoredDocument>,
	pub gating: GatingDecision,
}

pub struct RerankEngine {
	weights: ScoringWeights,
	epsilon: f64,
	mmr_lambda: f32,
	exposure_top_n: usize,
	gating: nc_config::Gating,
	pheromones: Arc<PheromoneStore>,
	narrative: Arc<NarrativeTracker>,
	rng: Mutex<StdRng>,
}
impl RerankEngine {
	pub fn new(
		cfg: &Config,
		pheromones: Arc<PheromoneStore>,
		narrative: Arc<NarrativeTracker>,
	) -> Result<Self> {
		nc_config::validate(cfg)?;

		let rng = match cfg.scoring.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_entropy(),
		};

		Ok(Self {
			weights: ScoringWeights::from_config(&cfg.scoring),
			epsilon: cfg.scoring.epsilon_greedy,
			mmr_lambda: cfg.scoring.mmr_lambda,
			exposure_top_n: cfg.scoring.exposure_top_n,
			gating: cfg.gating.clone(),
			pheromones,
			narrative,
			rng: Mutex::new(rng),
		})
	}

	pub fn pheromones(&self) -> &Arc<PheromoneStore> {
		&self.pheromones
	}

	pub fn narrative(&self) -> &Arc<NarrativeTracker> {
		&self.narrative
	}

	pub fn score(&self, req: RerankRequest) -> Result<RerankResponse> {
		self.score_at(req, OffsetDateTime::now_utc())
	}

	/// Ranks `req.documents` against the query as of `now`.
	///
	/// Reads both stores under their shared locks, then records one exposure for each of the
	/// first `scoring.exposure_top_n` results.
	pub fn score_at(&self, req: RerankRequest, now: OffsetDateTime) -> Result<RerankResponse> {
		let gating_policy = policy::resolve_gating_policy(&self.gating, req.gating.as_ref())?;
		let mmr_lambda = policy::resolve_mmr_lambda(req.mmr_lambda, self.mmr_lambda);

		if req.documents.is_empty() {
			return Ok(RerankResponse {
				items: Vec::new(),
				gating: GatingDecision {
					mode: gating_policy.mode,
					uncertainty: None,
					candidate_count: 0,
				},
			});
		}

		validate_query(&req.query_embedding)?;

		let embeddings = collect_embeddings(&req.documents)?;
		let dim = embeddings[0].len();
		let query = similarity::reconcile_dimension(&req.query_embedding, dim);
		let dense = similarity::cosine_similarities(&query, &embeddings);
		let decision = gating::make_decision(&dense, &gating_policy);
		let ranked = gating::top_indices_by_similarity(&dense, dense.len());
		let (pool, tail) = ranked.split_at(decision.candidate_count.min(ranked.len()));
		let ids: Vec<&str> = req.documents.iter().map(|doc| doc.id.as_str()).collect();
		let narrative = self.narrative.coherence(&embeddings);
		let pheromone: Vec<f32> = self
			.pheromones
			.bulk_bonus(&ids, now)
			.into_iter()
			.map(|bonus| bonus as f32)
			.collect();
		let components: Vec<ScoreComponents> = (0..dense.len())
			.map(|idx| ScoreComponents {
				dense: dense[idx],
				narrative: narrative[idx],
				pheromone: pheromone[idx],
			})
			.collect();
		let base: Vec<f32> = components
			.iter()
			.map(|parts| self.weights.blend(parts.dense, parts.narrative, parts.pheromone))
			.collect();
		let pool_relevance: Vec<f32> = pool.iter().map(|&idx| base[idx]).collect();
		let pool_units: Vec<Vec<f32>> =
			pool.iter().map(|&idx| similarity::normalize(&embeddings[idx])).collect();
		// The shared generator only hands out a seed; selection runs without the lock.
		let mut rng = StdRng::seed_from_u64(self.rng.lock().next_u64());
		let selections = diversity::select_diverse_order(
			&pool_relevance,
			&pool_units,
			mmr_lambda,
			self.epsilon,
			&mut rng,
		);
		let explored = selections
			.iter()
			.filter(|selection| selection.reason == diversity::SelectionReason::Exploration)
			.count();
		let order: Vec<usize> = selections
			.iter()
			.map(|selection| pool[selection.pool_pos])
			.chain(tail.iter().copied())
			.collect();
		let mut slots: Vec<Option<Document>> = req.documents.into_iter().map(Some).collect();
		let items: Vec<ScoredDocument> = order
			.iter()
			.filter_map(|&idx| {
				slots[idx].take().map(|document| ScoredDocument {
					document,
					score: base[idx],
					components: components[idx],
				})
			})
			.collect();
		let exposed: Vec<&str> =
			items.iter().take(self.exposure_top_n).map(|item| item.document.id.as_str()).collect();

		self.pheromones.record_exposure(&exposed, now);

		tracing::debug!(
			documents = items.len(),
			candidate_count = decision.candidate_count,
			uncertainty = ?decision.uncertainty,
			gating_mode = decision.mode.as_str(),
			mmr_lambda,
			explored,
			"Rerank completed."
		);

		Ok(RerankResponse { items, gating: decision })
	}
}

fn validate_query(query: &[f32]) -> Result<()> {
	if query.is_empty() {
		return Err(Error::InputShape { message: "query_embedding must be non-empty.".to_string() });
	}
	if query.iter().any(|value| !value.is_finite()) {
		return Err(Error::InputShape {
			message: "query_embedding must contain only finite values.".to_string(),
		});
	}

	Ok(())
}

fn collect_embeddings(documents: &[Document]) -> Result<Vec<Vec<f32>>> {
	let mut out: Vec<Vec<f32>> = Vec::with_capacity(documents.len());

	for doc in documents {
		let Some(embedding) = doc.embedding.as_ref() else {
			return Err(Error::InputShape {
				message: format!("Document {} has no embedding.", doc.id),
			});
		};

		if embedding.is_empty() {
			return Err(Error::InputShape {
				message: format!("Document {} has an empty embedding.", doc.id),
			});
		}
		if embedding.iter().any(|value| !value.is_finite()) {
			return Err(Error::InputShape {
				message: format!("Document {} embedding contains non-finite values.", doc.id),
			});
		}
		if let Some(first) = out.first()
			&& first.len() != embedding.len()
		{
			return Err(Error::InputShape {
				message: format!(
					"Document embeddings must share one dimension; {} has {}, expected {}.",
					doc.id,
					embedding.len(),
					first.len()
				),
			});
		}

		out.push(embedding.clone());
	}

	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn mixed_dimensions_are_an_input_shape_error() {
		let docs = vec![
			Document::new("a", "").with_embedding(vec![1.0, 0.0]),
			Document::new("b", "").with_embedding(vec![1.0, 0.0, 0.0]),
		];

		assert!(matches!(collect_embeddings(&docs), Err(Error::InputShape { .. })));
	}

	#[test]
	fn missing_embedding_names_the_document() {
		let docs = vec![Document::new("orphan", "text")];
		let err = collect_embeddings(&docs).expect_err("Must fail.");

		assert!(err.to_string().contains("orphan"));
	}

	#[test]
	fn non_finite_query_is_rejected() {
		assert!(validate_query(&[]).is_err());
		assert!(validate_query(&[f32::NAN, 1.0]).is_err());
		assert!(validate_query(&[0.0, 1.0]).is_ok());
	}

	#[test]
	fn scored_document_flattens_the_document() {
		let item = ScoredDocument {
			document: Document::new("a", "alpha"),
			score: 0.5,
			components: ScoreComponents { dense: 0.5, narrative: 0.0, pheromone: 0.0 },
		};
		let json = serde_json::to_value(&item).expect("Serializable.");

		assert_eq!(json["id"], "a");
		assert_eq!(json["text"], "alpha");
		assert_eq!(json["score"], 0.5);
		assert_eq!(json["components"]["dense"], 0.5);
	}
}
