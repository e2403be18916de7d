use std::{collections::BTreeMap, f64::consts::TAU};

use clap::Parser;
use color_eyre::eyre;
use rand::{
	Rng, SeedableRng,
	distributions::{Distribution, WeightedIndex},
	rngs::StdRng,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use nc_domain::gating::{self, GatingMode, GatingPolicy};

const TOP_K: usize = 10;
const RELEVANT_NEIGHBORS: usize = 5;

/// Compares gating `off` against `auto` on synthetic easy, medium and hard queries.
#[derive(Debug, Parser)]
#[command(
	version = nc_cli::VERSION,
	rename_all = "kebab",
	styles = nc_cli::styles(),
)]
pub struct Args {
	#[arg(long, value_name = "N", default_value_t = 600)]
	pub queries: usize,
	#[arg(long, value_name = "N", default_value_t = 400)]
	pub docs: usize,
	#[arg(long, value_name = "SEED", default_value_t = 7)]
	pub seed: u64,
	#[arg(long, value_name = "F", default_value_t = 0.7)]
	pub threshold: f64,
	#[arg(long, value_name = "N", default_value_t = 100)]
	pub min_candidates: usize,
	#[arg(long, value_name = "N", default_value_t = 400)]
	pub max_candidates: usize,
	#[arg(long, value_name = "F", default_value_t = 1.0)]
	pub entropy_temp: f64,
	/// Include one row per query and mode in the output.
	#[arg(long)]
	pub per_query: bool,
	#[arg(long, value_name = "FILTER", default_value = "warn")]
	pub log_level: String,
}

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
	Easy,
	Medium,
	Hard,
}
impl Difficulty {
	const ALL: [Self; 3] = [Self::Easy, Self::Medium, Self::Hard];
	const WEIGHTS: [f64; 3] = [0.4, 0.4, 0.2];

	/// Similarities for one query. Index 0 is the relevant document.
	fn sample<R>(self, docs: usize, rng: &mut R) -> Vec<f32>
	where
		R: Rng + ?Sized,
	{
		let mut out = Vec::with_capacity(docs);

		match self {
			Self::Easy => {
				out.push(3.0);
				out.extend((1..docs).map(|_| normal(rng, 0.2, 0.2).abs() as f32));
			},
			Self::Medium => {
				out.push(1.5);
				out.extend((1..docs).map(|_| normal(rng, 0.8, 0.4).abs() as f32));
			},
			Self::Hard => out.extend((0..docs).map(|_| (1.0 + normal(rng, 0.0, 0.05)) as f32)),
		}

		out
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct EvalSettings {
	pub queries: usize,
	pub docs: usize,
	pub seed: u64,
	pub threshold: f64,
	pub min_candidates: usize,
	pub max_candidates: usize,
	pub entropy_temp: f64,
}

#[derive(Debug, Serialize)]
pub struct EvalOutput {
	pub settings: EvalSettings,
	pub summary: Vec<ModeSummary>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub queries: Option<Vec<QueryReport>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ModeSummary {
	pub difficulty: Difficulty,
	pub mode: GatingMode,
	pub queries: usize,
	pub mean_candidate_count: f64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub mean_uncertainty: Option<f64>,
	pub hit_at_10: f64,
	pub ndcg_at_10: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct QueryReport {
	pub query_id: usize,
	pub difficulty: Difficulty,
	pub mode: GatingMode,
	pub uncertainty: Option<f64>,
	pub candidate_count: usize,
	pub hit_at_10: bool,
	pub ndcg_at_10: f64,
}

pub fn run(args: Args) -> color_eyre::Result<()> {
	let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	let settings = EvalSettings {
		queries: args.queries,
		docs: args.docs,
		seed: args.seed,
		threshold: args.threshold,
		min_candidates: args.min_candidates,
		max_candidates: args.max_candidates,
		entropy_temp: args.entropy_temp,
	};
	let mut output = synthetic_run(&settings)?;

	if !args.per_query {
		output.queries = None;
	}

	let json = serde_json::to_string_pretty(&output)?;

	println!("{json}");

	Ok(())
}

pub fn synthetic_run(settings: &EvalSettings) -> color_eyre::Result<EvalOutput> {
	if settings.docs <= RELEVANT_NEIGHBORS {
		return Err(eyre::eyre!("--docs must be greater than {RELEVANT_NEIGHBORS}."));
	}

	nc_config::validate_gating(&nc_config::Gating {
		mode: nc_config::GATING_AUTO.to_string(),
		threshold: settings.threshold,
		min_candidates: settings.min_candidates,
		max_candidates: settings.max_candidates,
		entropy_temp: settings.entropy_temp,
	})?;

	let auto = GatingPolicy {
		mode: GatingMode::Auto,
		threshold: settings.threshold,
		min_candidates: settings.min_candidates,
		max_candidates: settings.max_candidates,
		entropy_temp: settings.entropy_temp,
	};
	let off = GatingPolicy { mode: GatingMode::Off, ..auto.clone() };
	let difficulty_index = WeightedIndex::new(Difficulty::WEIGHTS)?;
	let relevance = relevance(settings.docs);
	let ideal = ideal_dcg(&relevance);
	let mut rng = StdRng::seed_from_u64(settings.seed);
	let mut reports = Vec::with_capacity(settings.queries * 2);

	for query_id in 0..settings.queries {
		let difficulty = Difficulty::ALL[difficulty_index.sample(&mut rng)];
		let similarities = difficulty.sample(settings.docs, &mut rng);

		for policy in [&off, &auto] {
			let decision = gating::make_decision(&similarities, policy);
			let ranked = gating::top_indices_by_similarity(&similarities, decision.candidate_count);
			let top: Vec<usize> = ranked.into_iter().take(TOP_K).collect();

			reports.push(QueryReport {
				query_id,
				difficulty,
				mode: policy.mode,
				uncertainty: decision.uncertainty,
				candidate_count: decision.candidate_count,
				hit_at_10: top.contains(&0),
				ndcg_at_10: dcg(&top, &relevance) / ideal,
			});
		}
	}

	let summary = summarize(&reports);

	for row in &summary {
		tracing::info!(
			difficulty = ?row.difficulty,
			mode = row.mode.as_str(),
			mean_candidate_count = row.mean_candidate_count,
			hit_at_10 = row.hit_at_10,
			ndcg_at_10 = row.ndcg_at_10,
			"Gating evaluation summary."
		);
	}

	Ok(EvalOutput { settings: settings.clone(), summary, queries: Some(reports) })
}

fn summarize(reports: &[QueryReport]) -> Vec<ModeSummary> {
	let mut groups: BTreeMap<(Difficulty, &'static str), Vec<&QueryReport>> = BTreeMap::new();

	for report in reports {
		groups.entry((report.difficulty, report.mode.as_str())).or_default().push(report);
	}

	groups
		.into_values()
		.filter_map(|rows| {
			let first = rows.first()?;
			let count = rows.len() as f64;
			let uncertainties: Vec<f64> = rows.iter().filter_map(|row| row.uncertainty).collect();

			Some(ModeSummary {
				difficulty: first.difficulty,
				mode: first.mode,
				queries: rows.len(),
				mean_candidate_count: rows
					.iter()
					.map(|row| row.candidate_count as f64)
					.sum::<f64>() / count,
				mean_uncertainty: (!uncertainties.is_empty())
					.then(|| uncertainties.iter().sum::<f64>() / uncertainties.len() as f64),
				hit_at_10: rows.iter().filter(|row| row.hit_at_10).count() as f64 / count,
				ndcg_at_10: rows.iter().map(|row| row.ndcg_at_10).sum::<f64>() / count,
			})
		})
		.collect()
}

/// Graded relevance: document 0 is the answer, the next few are partial matches.
fn relevance(docs: usize) -> Vec<f64> {
	let mut out = vec![0.0; docs];

	out[0] = 1.0;

	for value in out.iter_mut().skip(1).take(RELEVANT_NEIGHBORS) {
		*value = 0.5;
	}

	out
}

fn dcg(ranked: &[usize], relevance: &[f64]) -> f64 {
	ranked
		.iter()
		.enumerate()
		.map(|(rank, &idx)| (2_f64.powf(relevance[idx]) - 1.0) / (rank as f64 + 2.0).log2())
		.sum()
}

fn ideal_dcg(relevance: &[f64]) -> f64 {
	let mut sorted: Vec<usize> = (0..relevance.len()).collect();

	sorted.sort_by(|&a, &b| relevance[b].total_cmp(&relevance[a]).then_with(|| a.cmp(&b)));
	sorted.truncate(TOP_K);

	dcg(&sorted, relevance)
}

/// Box-Muller sample from `N(mean, std_dev)`.
fn normal<R>(rng: &mut R, mean: f64, std_dev: f64) -> f64
where
	R: Rng + ?Sized,
{
	let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
	let u2: f64 = rng.gen_range(0.0..1.0);

	mean + std_dev * (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}
