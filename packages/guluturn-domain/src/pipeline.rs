use std::time::Duration;

use crate::{
	Result,
	hard_filter::{self, HardFilterScope},
	models::{RankedRestaurant, RestaurantRef},
	rerank::RerankParams,
	scoring::{PreferenceScorer, ScoringWeights},
	selection::{CandidateSelector, SelectionPolicy},
	tags::TagRegistry,
};

/// Typed view of the `[pipeline]` configuration section.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineSettings {
	pub hard_filter_scope: HardFilterScope,
	pub weights: ScoringWeights,
	pub rerank: RerankParams,
	pub selector: CandidateSelector,
	pub named_similarity_threshold: f32,
	pub embedding_timeout: Duration,
}
impl PipelineSettings {
	pub fn from_config(cfg: &guluturn_config::Pipeline) -> Result<Self> {
		Ok(Self {
			hard_filter_scope: HardFilterScope::from_config(&cfg.hard_filter)?,
			weights: ScoringWeights::from(&cfg.scoring),
			rerank: RerankParams::from(&cfg.rerank),
			selector: CandidateSelector::from_config(cfg)?,
			named_similarity_threshold: cfg.named.similarity_threshold,
			embedding_timeout: Duration::from_millis(cfg.embedding_timeout_ms),
		})
	}

	pub fn card_count(&self) -> usize {
		self.selector.card_count()
	}

	/// Hard filter, preference scoring and selection with these settings.
	pub fn filter_and_select(
		&self,
		registry: &TagRegistry,
		tags: &[String],
		pool: &[RestaurantRef],
	) -> Vec<RankedRestaurant> {
		let admitted = hard_filter::apply_hard_filter(
			registry,
			tags.iter().map(String::as_str),
			pool,
			self.hard_filter_scope,
		);
		let ranked = PreferenceScorer::new(registry, self.weights).score_pool(tags, &admitted);

		self.selector.select(&ranked)
	}
}
impl Default for PipelineSettings {
	fn default() -> Self {
		let cfg = guluturn_config::Pipeline::default();

		Self {
			hard_filter_scope: HardFilterScope::default(),
			weights: ScoringWeights::default(),
			rerank: RerankParams::default(),
			selector: CandidateSelector::new(cfg.card_count as usize, SelectionPolicy::Fixed),
			named_similarity_threshold: cfg.named.similarity_threshold,
			embedding_timeout: Duration::from_millis(cfg.embedding_timeout_ms),
		}
	}
}

/// Stateless one-shot ranking: hard filter, preference scoring, then `selector`.
pub fn filter_and_select(
	registry: &TagRegistry,
	tags: &[String],
	pool: &[RestaurantRef],
	selector: &CandidateSelector,
) -> Vec<RankedRestaurant> {
	let settings = PipelineSettings { selector: *selector, ..PipelineSettings::default() };

	settings.filter_and_select(registry, tags, pool)
}
