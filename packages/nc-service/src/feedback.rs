use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, NarrativeUpdate, RerankEngine, Result, rerank::Document};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FeedbackRequest {
	pub selected_ids: Vec<String>,
	/// Documents from the ranked response, keyed by id. Used to build the narrative embedding.
	#[serde(default)]
	pub documents: HashMap<String, Document>,
	pub success: f32,
	/// Takes precedence over the mean of the selected documents' embeddings.
	#[serde(default)]
	pub best_doc_embedding: Option<Vec<f32>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FeedbackReport {
	pub reinforced: usize,
	/// Selected ids whose embedding contributed to the narrative update.
	pub resolved: usize,
	pub narrative: NarrativeUpdate,
}

impl RerankEngine {
	pub fn update_feedback(&self, req: FeedbackRequest) -> Result<FeedbackReport> {
		self.update_feedback_at(req, OffsetDateTime::now_utc())
	}

	/// Reinforces every selected id with `success`, then feeds one embedding to the narrative
	/// tracker. The tracker applies its own success gate.
	pub fn update_feedback_at(
		&self,
		req: FeedbackRequest,
		now: OffsetDateTime,
	) -> Result<FeedbackReport> {
		if !req.success.is_finite() || !(0.0..=1.0).contains(&req.success) {
			return Err(Error::InvalidRequest {
				message: "success must be a finite number in the range 0.0-1.0.".to_string(),
			});
		}

		self.pheromones().reinforce(&req.selected_ids, f64::from(req.success), now);

		let (embedding, resolved) = match req.best_doc_embedding {
			Some(embedding) if !embedding.is_empty() => (Some(embedding), 0),
			_ => mean_embedding(&req.selected_ids, &req.documents),
		};
		let narrative = match embedding {
			Some(embedding) => self.narrative().update(&embedding, req.success, now),
			None => NarrativeUpdate::Skipped,
		};

		tracing::debug!(
			reinforced = req.selected_ids.len(),
			resolved,
			success = req.success,
			narrative = ?narrative,
			"Feedback applied."
		);

		Ok(FeedbackReport { reinforced: req.selected_ids.len(), resolved, narrative })
	}
}

/// Mean of the embeddings of `selected_ids` found in `documents`.
///
/// The first resolved embedding fixes the dimension; later ones of another length are skipped.
fn mean_embedding(
	selected_ids: &[String],
	documents: &HashMap<String, Document>,
) -> (Option<Vec<f32>>, usize) {
	let mut sum: Vec<f32> = Vec::new();
	let mut count = 0_usize;

	for id in selected_ids {
		let Some(embedding) = documents.get(id).and_then(|doc| doc.embedding.as_ref()) else {
			continue;
		};

		if embedding.is_empty() {
			continue;
		}
		if count == 0 {
			sum = embedding.clone();
			count = 1;

			continue;
		}
		if embedding.len() != sum.len() {
			tracing::debug!(
				id = %id,
				expected = sum.len(),
				actual = embedding.len(),
				"Skipping feedback embedding with a different dimension."
			);

			continue;
		}

		for (acc, value) in sum.iter_mut().zip(embedding) {
			*acc += value;
		}

		count += 1;
	}

	if count == 0 {
		return (None, 0);
	}

	let scale = 1.0 / count as f32;

	for value in &mut sum {
		*value *= scale;
	}

	(Some(sum), count)
}
