use std::{collections::BTreeSet, sync::Arc};

use futures_util::future;
use rand::{SeedableRng, rngs::StdRng};
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use guluturn_config::Config;
use guluturn_domain::{
	PipelineSettings, TagRegistry, USER_REPORT_CLOSED,
	availability::{AvailabilityFilter, Clock, SystemClock},
	hard_filter,
	models::{ParsedIntent, Provenance, RestaurantRef, ScoredCandidate},
	rerank,
	scoring::PreferenceScorer,
	selection,
};

use crate::{
	AcceptedRestaurant, CandidateSnapshot, Error, Providers, Result, RoundFeedback, RoundRecord,
	SessionOutcome, SessionRecord, compose::NamedComposer, embeddings::EmbeddingLookup,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionPhase {
	Idle,
	RoundInProgress,
	Committed,
}

/// Constraints carried between rounds of one session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionState {
	/// Hard-strength tags and the closed-report marker seen so far.
	pub sticky_general_tags: BTreeSet<String>,
	pub rejected_restaurant_ids: BTreeSet<String>,
}
impl SessionState {
	fn clear(&mut self) {
		self.sticky_general_tags.clear();
		self.rejected_restaurant_ids.clear();
	}
}

#[derive(Debug)]
pub enum RejectOutcome {
	/// A fresh list for the next round.
	Next(Vec<ScoredCandidate>),
	/// The round limit was reached and the session is committed.
	Exhausted(SessionRecord),
}

struct ShownRound {
	candidates: Vec<ScoredCandidate>,
}

pub struct SessionOrchestrator {
	registry: Arc<TagRegistry>,
	providers: Providers,
	settings: PipelineSettings,
	availability: AvailabilityFilter,
	clock: Arc<dyn Clock>,
	rng: StdRng,
	max_rounds: usize,
	session_id: Uuid,
	started_at: Option<OffsetDateTime>,
	phase: SessionPhase,
	state: SessionState,
	shown: Option<ShownRound>,
	rounds: Vec<RoundRecord>,
}
impl SessionOrchestrator {
	pub fn new(cfg: &Config, registry: Arc<TagRegistry>, providers: Providers) -> Result<Self> {
		let rng = match cfg.session.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_entropy(),
		};

		Ok(Self {
			registry,
			providers,
			settings: PipelineSettings::from_config(&cfg.pipeline)?,
			availability: AvailabilityFilter::from_config(&cfg.availability)?,
			clock: Arc::new(SystemClock),
			rng,
			max_rounds: cfg.session.max_rounds as usize,
			session_id: Uuid::new_v4(),
			started_at: None,
			phase: SessionPhase::Idle,
			state: SessionState::default(),
			shown: None,
			rounds: Vec::new(),
		})
	}

	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	pub fn with_seed(mut self, seed: u64) -> Self {
		self.rng = StdRng::seed_from_u64(seed);

		self
	}

	pub fn session_id(&self) -> Uuid {
		self.session_id
	}

	pub fn phase(&self) -> SessionPhase {
		self.phase
	}

	pub fn state(&self) -> &SessionState {
		&self.state
	}

	pub fn rounds(&self) -> &[RoundRecord] {
		&self.rounds
	}

	/// Candidates of the round currently shown to the user.
	pub fn current_candidates(&self) -> &[ScoredCandidate] {
		self.shown.as_ref().map(|shown| shown.candidates.as_slice()).unwrap_or_default()
	}

	/// Parses `reason` and runs a round.
	///
	/// A blank reason on a fresh session is an opening spin: a random sample. Later blank reasons
	/// still run the pipeline, so sticky hard tags and rejections keep applying.
	pub async fn recommend(
		&mut self,
		reason: &str,
		pool: &[RestaurantRef],
	) -> Result<Vec<ScoredCandidate>> {
		self.ensure_open()?;

		if reason.trim().is_empty() {
			if self.phase == SessionPhase::Idle {
				return Ok(self.random_round(pool));
			}

			return self.run_round(ParsedIntent::default(), pool).await;
		}

		let intent = self.parse(reason).await?;

		self.run_round(intent, pool).await
	}

	/// Runs a round from an already parsed intent.
	pub async fn run_round(
		&mut self,
		intent: ParsedIntent,
		pool: &[RestaurantRef],
	) -> Result<Vec<ScoredCandidate>> {
		self.ensure_open()?;
		self.begin_round();

		let mut candidates = self.pipeline(intent, pool).await;

		if candidates.is_empty() {
			info!(
				session_id = %self.session_id,
				"Pipeline yielded nothing. Falling back to a random sample."
			);

			candidates = self.random_candidates(pool);
		}

		info!(
			session_id = %self.session_id,
			round_index = self.rounds.len(),
			candidates = candidates.len(),
			locked = candidates
				.iter()
				.filter(|candidate| candidate.provenance == Provenance::Locked)
				.count(),
			"Round completed."
		);

		Ok(self.show(candidates))
	}

	/// Rejects `restaurant_id` from the shown round and re-spins with `reason`.
	///
	/// Once the number of recorded rounds reaches the limit the session commits as exhausted.
	pub async fn reject(
		&mut self,
		restaurant_id: &str,
		reason: &str,
		pool: &[RestaurantRef],
	) -> Result<RejectOutcome> {
		self.ensure_open()?;
		self.ensure_shown(restaurant_id)?;

		let intent = if reason.trim().is_empty() {
			ParsedIntent::default()
		} else {
			self.parse(reason).await?
		};
		let feedback = RoundFeedback {
			accepted: false,
			reason_input: (!reason.trim().is_empty()).then(|| reason.to_string()),
			parsed_general_tags: intent.general_tags.clone(),
			parsed_specific_tags: intent
				.specific_tags
				.iter()
				.map(|tag| tag.text.clone())
				.collect(),
		};

		self.record_round(Some(restaurant_id), Some(feedback));
		self.state.rejected_restaurant_ids.insert(restaurant_id.to_string());

		debug!(session_id = %self.session_id, restaurant_id, "Restaurant rejected.");

		if self.rounds.len() >= self.max_rounds {
			return Ok(RejectOutcome::Exhausted(self.commit(SessionOutcome::Exhausted, None)));
		}

		Ok(RejectOutcome::Next(self.run_round(intent, pool).await?))
	}

	/// Accepts a restaurant from the shown round and commits the session.
	pub fn accept(&mut self, restaurant_id: &str) -> Result<SessionRecord> {
		self.ensure_open()?;

		let accepted = self.ensure_shown(restaurant_id)?;
		let accepted = AcceptedRestaurant::from(accepted.as_ref());
		let feedback = RoundFeedback { accepted: true, ..RoundFeedback::default() };

		self.record_round(Some(restaurant_id), Some(feedback));

		Ok(self.commit(SessionOutcome::Accepted, Some(accepted)))
	}

	/// Starts over with a new session id and no state or history.
	pub fn reset(&mut self) {
		self.session_id = Uuid::new_v4();
		self.started_at = None;
		self.phase = SessionPhase::Idle;
		self.state.clear();
		self.shown = None;
		self.rounds.clear();
	}

	async fn parse(&self, reason: &str) -> Result<ParsedIntent> {
		let vocabulary = self.registry.tag_names();
		let intent = self.providers.parser.parse(reason, &vocabulary).await?;

		debug!(
			general_tags = ?intent.general_tags,
			specific_tags = intent.specific_tags.len(),
			preferred = ?intent.preferred_restaurant_names,
			"Reason parsed."
		);

		Ok(intent)
	}

	async fn pipeline(
		&mut self,
		mut intent: ParsedIntent,
		pool: &[RestaurantRef],
	) -> Vec<ScoredCandidate> {
		for tag in &intent.general_tags {
			if tag == USER_REPORT_CLOSED || self.registry.is_hard(tag) {
				self.state.sticky_general_tags.insert(tag.clone());
			}
		}

		let mut effective = intent.general_tags.clone();

		for tag in &self.state.sticky_general_tags {
			if !effective.contains(tag) {
				effective.push(tag.clone());
			}
		}

		let available: Vec<RestaurantRef> = self
			.availability
			.apply(
				effective.iter().map(String::as_str),
				&intent.preferred_restaurant_names,
				pool,
				self.clock.now_utc(),
			)
			.into_iter()
			.filter(|restaurant| !self.state.rejected_restaurant_ids.contains(&restaurant.id))
			.collect();
		let admitted = hard_filter::apply_hard_filter(
			&self.registry,
			effective.iter().map(String::as_str),
			&available,
			self.settings.hard_filter_scope,
		);
		let ranked = PreferenceScorer::new(&self.registry, self.settings.weights)
			.score_pool(&effective, &admitted);
		let timeout = self.settings.embedding_timeout;
		let lookup = EmbeddingLookup::new(self.providers.embedding.as_ref(), timeout);
		let composer = NamedComposer::new(
			&self.settings.selector,
			self.settings.named_similarity_threshold,
			lookup,
		);
		let (_, prefetched) = future::join(
			lookup.fill_specific_tags(&mut intent.specific_tags),
			composer.prefetch(&intent.preferred_restaurant_names, &admitted),
		)
		.await;
		let mut ranked = rerank::rerank(ranked, &intent.specific_tags, &self.settings.rerank);

		selection::shuffle_score_groups(&mut ranked, &mut self.rng);

		debug!(
			effective_tags = ?effective,
			available = available.len(),
			admitted = admitted.len(),
			"Pipeline stages finished."
		);

		composer.compose(&intent.preferred_restaurant_names, &admitted, ranked, prefetched).await
	}

	fn random_round(&mut self, pool: &[RestaurantRef]) -> Vec<ScoredCandidate> {
		self.begin_round();

		let candidates = self.random_candidates(pool);

		info!(
			session_id = %self.session_id,
			candidates = candidates.len(),
			"Random round completed."
		);

		self.show(candidates)
	}

	fn random_candidates(&mut self, pool: &[RestaurantRef]) -> Vec<ScoredCandidate> {
		let eligible: Vec<RestaurantRef> = pool
			.iter()
			.filter(|restaurant| !self.state.rejected_restaurant_ids.contains(&restaurant.id))
			.cloned()
			.collect();

		selection::random_sample(&eligible, self.settings.card_count(), &mut self.rng)
			.into_iter()
			.map(|restaurant| ScoredCandidate {
				restaurant,
				score: None,
				provenance: Provenance::Random,
			})
			.collect()
	}

	fn begin_round(&mut self) {
		if self.phase == SessionPhase::Idle {
			self.phase = SessionPhase::RoundInProgress;
			self.started_at = Some(self.clock.now_utc());
		}
	}

	fn show(&mut self, candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
		self.shown = Some(ShownRound { candidates: candidates.clone() });

		candidates
	}

	fn ensure_open(&self) -> Result<()> {
		if self.phase == SessionPhase::Committed {
			return Err(Error::SessionCommitted);
		}

		Ok(())
	}

	fn ensure_shown(&self, restaurant_id: &str) -> Result<RestaurantRef> {
		let Some(shown) = &self.shown else {
			return Err(Error::InvalidRequest {
				message: "No round has been shown yet.".to_string(),
			});
		};

		shown
			.candidates
			.iter()
			.find(|candidate| candidate.restaurant.id == restaurant_id)
			.map(|candidate| candidate.restaurant.clone())
			.ok_or_else(|| Error::InvalidRequest {
				message: format!("Restaurant {restaurant_id} is not in the current round."),
			})
	}

	fn record_round(&mut self, selected_id: Option<&str>, feedback: Option<RoundFeedback>) {
		let candidates: Vec<CandidateSnapshot> = self
			.current_candidates()
			.iter()
			.map(|candidate| CandidateSnapshot::new(candidate, selected_id))
			.collect();

		self.rounds.push(RoundRecord {
			round_index: self.rounds.len() as u32,
			candidates,
			selected_restaurant_id: selected_id.map(str::to_string),
			feedback,
		});
	}

	fn commit(
		&mut self,
		outcome: SessionOutcome,
		accepted_restaurant: Option<AcceptedRestaurant>,
	) -> SessionRecord {
		let finished_at = self.clock.now_utc();
		let record = SessionRecord {
			session_id: self.session_id,
			started_at: self.started_at.unwrap_or(finished_at),
			finished_at,
			outcome,
			accepted_restaurant,
			rounds: std::mem::take(&mut self.rounds),
		};

		self.phase = SessionPhase::Committed;
		self.state.clear();
		self.shown = None;

		info!(
			session_id = %record.session_id,
			outcome = ?record.outcome,
			rounds = record.rounds.len(),
			"Session committed."
		);

		record
	}
}
