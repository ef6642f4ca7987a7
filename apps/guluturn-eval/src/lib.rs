use std::{
	collections::HashMap,
	fs,
	path::{Path, PathBuf},
	sync::Arc,
	time::Instant,
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use guluturn_domain::{
	TagRegistry,
	models::{ParsedIntent, Provenance, Restaurant, RestaurantRef, ScoredCandidate},
};
use guluturn_service::{
	EmbeddingProvider, Providers, RejectOutcome, SessionOrchestrator, SessionRecord,
};
use guluturn_testkit::{ScriptedParser, StaticEmbedding};

#[derive(Debug, Parser)]
#[command(
	version = guluturn_cli::VERSION,
	rename_all = "kebab",
	styles = guluturn_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// JSON array of restaurants.
	#[arg(long, short = 'p', value_name = "FILE")]
	pub pool: PathBuf,
	#[arg(long, short = 's', value_name = "FILE")]
	pub script: PathBuf,
	/// Overrides `session.seed` from the config.
	#[arg(long, value_name = "N")]
	pub seed: Option<u64>,
	/// Embed through the configured HTTP provider instead of the script's table.
	#[arg(long)]
	pub live_embeddings: bool,
}

/// Steps run in order. Non-blank reasons are answered from the step's `intent`; see
/// `demos/session.json`.
#[derive(Debug, Deserialize)]
struct EvalScript {
	name: Option<String>,
	#[serde(default)]
	embeddings: HashMap<String, Vec<f32>>,
	steps: Vec<EvalStep>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum EvalStep {
	Recommend {
		#[serde(default)]
		reason: String,
		intent: Option<ParsedIntent>,
	},
	Reject {
		pick: Option<usize>,
		restaurant_id: Option<String>,
		#[serde(default)]
		reason: String,
		intent: Option<ParsedIntent>,
	},
	Accept {
		pick: Option<usize>,
		restaurant_id: Option<String>,
	},
}
impl EvalStep {
	fn scripted_reason(&self) -> Option<(&str, Option<&ParsedIntent>)> {
		match self {
			Self::Recommend { reason, intent } | Self::Reject { reason, intent, .. }
				if !reason.trim().is_empty() =>
				Some((reason.as_str(), intent.as_ref())),
			_ => None,
		}
	}
}

#[derive(Debug, Serialize)]
struct EvalReport {
	script: String,
	settings: EvalSettings,
	session_id: Uuid,
	rounds: Vec<RoundReport>,
	#[serde(skip_serializing_if = "Option::is_none")]
	record: Option<SessionRecord>,
}

#[derive(Debug, Serialize)]
struct EvalSettings {
	config_path: String,
	pool_path: String,
	pool_size: usize,
	card_count: u32,
	max_rounds: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	seed: Option<u64>,
	live_embeddings: bool,
}

#[derive(Debug, Serialize)]
struct RoundReport {
	step: usize,
	action: &'static str,
	latency_ms: f64,
	candidates: Vec<CandidateLine>,
}
impl RoundReport {
	fn new(
		step: usize,
		action: &'static str,
		started: Instant,
		candidates: &[ScoredCandidate],
	) -> Self {
		Self {
			step,
			action,
			latency_ms: started.elapsed().as_secs_f64() * 1_000.0,
			candidates: candidates.iter().map(CandidateLine::from).collect(),
		}
	}
}

#[derive(Debug, Serialize)]
struct CandidateLine {
	id: String,
	name: String,
	provenance: Provenance,
	score: Option<i32>,
}
impl From<&ScoredCandidate> for CandidateLine {
	fn from(candidate: &ScoredCandidate) -> Self {
		Self {
			id: candidate.restaurant.id.clone(),
			name: candidate.restaurant.name.clone(),
			provenance: candidate.provenance,
			score: candidate.score,
		}
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let cfg = guluturn_config::load(&args.config)?;
	let filter = EnvFilter::new(cfg.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	let registry = Arc::new(TagRegistry::load(&cfg.taxonomy.path)?);
	let pool = load_pool(&args.pool)?;
	let script = load_script(&args.script)?;
	let embedding: Arc<dyn EmbeddingProvider> = if args.live_embeddings {
		Providers::from_config(&cfg)?.embedding
	} else {
		Arc::new(StaticEmbedding::new(script.embeddings.clone()))
	};
	let providers = Providers::new(embedding, Arc::new(scripted_parser(&script)));
	let mut session = SessionOrchestrator::new(&cfg, registry, providers)?;

	if let Some(seed) = args.seed {
		session = session.with_seed(seed);
	}

	let settings = EvalSettings {
		config_path: args.config.display().to_string(),
		pool_path: args.pool.display().to_string(),
		pool_size: pool.len(),
		card_count: cfg.pipeline.card_count,
		max_rounds: cfg.session.max_rounds,
		seed: args.seed.or(cfg.session.seed),
		live_embeddings: args.live_embeddings,
	};
	let session_id = session.session_id();
	let script_name = script.name.unwrap_or_else(|| args.script.display().to_string());
	let (rounds, record) = replay(&mut session, script.steps, &pool).await?;

	info!(
		script = %script_name,
		rounds = rounds.len(),
		committed = record.is_some(),
		"Replay finished."
	);

	let report = EvalReport { script: script_name, settings, session_id, rounds, record };
	let json = serde_json::to_string_pretty(&report)?;

	println!("{json}");

	Ok(())
}

async fn replay(
	session: &mut SessionOrchestrator,
	steps: Vec<EvalStep>,
	pool: &[RestaurantRef],
) -> color_eyre::Result<(Vec<RoundReport>, Option<SessionRecord>)> {
	let mut rounds = Vec::new();
	let mut record = None;

	for (index, step) in steps.into_iter().enumerate() {
		if record.is_some() {
			return Err(eyre::eyre!("Step {index} follows a committed session."));
		}

		let started = Instant::now();

		match step {
			EvalStep::Recommend { reason, intent } => {
				let candidates = match intent {
					Some(intent) if reason.trim().is_empty() =>
						session.run_round(intent, pool).await?,
					_ => session.recommend(&reason, pool).await?,
				};

				rounds.push(RoundReport::new(index, "recommend", started, &candidates));
			},
			EvalStep::Reject { pick, restaurant_id, reason, .. } => {
				let target = resolve_target(session, index, pick, restaurant_id)?;

				match session.reject(&target, &reason, pool).await? {
					RejectOutcome::Next(candidates) =>
						rounds.push(RoundReport::new(index, "reject", started, &candidates)),
					RejectOutcome::Exhausted(done) => record = Some(done),
				}
			},
			EvalStep::Accept { pick, restaurant_id } => {
				let target = resolve_target(session, index, pick, restaurant_id)?;

				record = Some(session.accept(&target)?);
			},
		}
	}

	Ok((rounds, record))
}

fn resolve_target(
	session: &SessionOrchestrator,
	index: usize,
	pick: Option<usize>,
	restaurant_id: Option<String>,
) -> color_eyre::Result<String> {
	if let Some(id) = restaurant_id {
		return Ok(id);
	}

	let Some(pick) = pick else {
		return Err(eyre::eyre!("Step {index} needs either pick or restaurant_id."));
	};

	session
		.current_candidates()
		.get(pick)
		.map(|candidate| candidate.restaurant.id.clone())
		.ok_or_else(|| eyre::eyre!("Step {index} picks card {pick}, which is not on the table."))
}

fn scripted_parser(script: &EvalScript) -> ScriptedParser {
	script.steps.iter().filter_map(EvalStep::scripted_reason).fold(
		ScriptedParser::new(),
		|parser, (reason, intent)| {
			parser.with(reason, intent.cloned().unwrap_or_default())
		},
	)
}

fn load_pool(path: &Path) -> color_eyre::Result<Vec<RestaurantRef>> {
	let raw = fs::read_to_string(path)?;
	let restaurants: Vec<Restaurant> = serde_json::from_str(&raw)?;

	if restaurants.is_empty() {
		return Err(eyre::eyre!("Restaurant pool must not be empty."));
	}

	Ok(restaurants.into_iter().map(Arc::new).collect())
}

fn load_script(path: &Path) -> color_eyre::Result<EvalScript> {
	let raw = fs::read_to_string(path)?;
	let script: EvalScript = serde_json::from_str(&raw)?;

	if script.steps.is_empty() {
		return Err(eyre::eyre!("Script must include at least one step."));
	}

	Ok(script)
}
