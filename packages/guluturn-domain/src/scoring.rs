use tracing::debug;

use crate::{
	models::{Polarity, RankedRestaurant, Restaurant, RestaurantRef},
	tags::{TagCategory, TagMetadata, TagRegistry},
};

const TOPIC_PREFIXES: [&str; 6] =
	["prefer_", "avoid_", "quality_ok_", "quality_too_", "quality_", "too_"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoringWeights {
	pub same_match: i32,
	pub opposite_strong: i32,
	pub quality_align_bonus: i32,
	pub too_bonus_prefer: i32,
	pub too_penalty_avoid: i32,
}
impl Default for ScoringWeights {
	fn default() -> Self {
		Self::from(&guluturn_config::Scoring::default())
	}
}
impl From<&guluturn_config::Scoring> for ScoringWeights {
	fn from(cfg: &guluturn_config::Scoring) -> Self {
		Self {
			same_match: cfg.same_match,
			opposite_strong: cfg.opposite_strong,
			quality_align_bonus: cfg.quality_align_bonus,
			too_bonus_prefer: cfg.too_bonus_prefer,
			too_penalty_avoid: cfg.too_penalty_avoid,
		}
	}
}

pub struct PreferenceScorer<'a> {
	registry: &'a TagRegistry,
	weights: ScoringWeights,
}
impl<'a> PreferenceScorer<'a> {
	pub fn new(registry: &'a TagRegistry, weights: ScoringWeights) -> Self {
		Self { registry, weights }
	}

	pub fn score(&self, user_tags: &[String], restaurant: &Restaurant) -> i32 {
		let mut total = 0;

		for user_tag in user_tags {
			let Some(user_meta) = self.registry.get(user_tag) else {
				continue;
			};

			if user_meta.category == TagCategory::System || user_meta.is_hard() {
				continue;
			}

			for candidate_tag in &restaurant.general_tags {
				let Some(candidate_meta) = self.registry.get(candidate_tag) else {
					continue;
				};

				total += self.pair_delta(user_meta, candidate_meta);
			}
		}

		total
	}

	/// Scores every candidate and sorts by score descending. Ties keep pool order.
	pub fn score_pool(&self, user_tags: &[String], pool: &[RestaurantRef]) -> Vec<RankedRestaurant> {
		let mut ranked: Vec<RankedRestaurant> = pool
			.iter()
			.map(|restaurant| {
				RankedRestaurant::new(restaurant.clone(), self.score(user_tags, restaurant))
			})
			.collect();

		ranked.sort_by(|lhs, rhs| rhs.score.cmp(&lhs.score));

		debug!(
			candidates = ranked.len(),
			top_score = ranked.first().map(|entry| entry.score),
			"Preference scoring finished."
		);

		ranked
	}

	fn pair_delta(&self, user: &TagMetadata, candidate: &TagMetadata) -> i32 {
		let w = &self.weights;

		if user.name == candidate.name {
			return w.same_match;
		}

		let opposite = user.opposite_tags.contains(&candidate.name)
			|| candidate.opposite_tags.contains(&user.name);

		if opposite {
			match (user.category, candidate.category) {
				(TagCategory::Quality, TagCategory::Quality)
				| (TagCategory::Preference, TagCategory::Preference) => return w.opposite_strong,
				(TagCategory::Preference, TagCategory::Quality)
					if candidate.polarity == Polarity::Negative =>
					return w.opposite_strong,
				(TagCategory::Preference, TagCategory::Quality)
					if user.polarity == Polarity::Negative
						&& candidate.polarity == Polarity::Positive =>
					return w.quality_align_bonus,
				_ => {},
			}
		}

		if candidate.category != TagCategory::Quality || !same_topic(&user.name, &candidate.name) {
			return 0;
		}

		match candidate.polarity {
			Polarity::Positive => w.quality_align_bonus,
			Polarity::Negative if is_intensifier(&candidate.name) => match user.polarity {
				Polarity::Positive => w.too_bonus_prefer,
				Polarity::Negative => w.too_penalty_avoid,
				Polarity::Neutral => 0,
			},
			_ => 0,
		}
	}
}

/// Strips the first matching directional prefix, e.g. `avoid_spicy` -> `spicy`.
pub fn topic(tag: &str) -> &str {
	TOPIC_PREFIXES.iter().find_map(|prefix| tag.strip_prefix(prefix)).unwrap_or(tag)
}

pub fn same_topic(lhs: &str, rhs: &str) -> bool {
	topic(lhs) == topic(rhs)
}

/// "Too much X" quality tags such as `quality_too_spicy` or `portion_too_small`.
pub fn is_intensifier(tag: &str) -> bool {
	tag.starts_with("quality_too_") || tag.starts_with("too_") || tag.contains("_too_")
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;

	const TAXONOMY: &str = r#"
[[preference]]
tag = "prefer_spicy"
polarity = "positive"
strength = "soft"

[[preference]]
tag = "avoid_spicy"
polarity = "negative"
strength = "soft"

[[preference]]
tag = "spicy"
polarity = "neutral"
strength = "soft"

[[preference]]
tag = "avoid_pork"
polarity = "negative"
strength = "hard"

[[preference]]
tag = "avoid_noise"
polarity = "negative"
strength = "soft"
opposite = ["quality_quiet"]

[[preference]]
tag = "prefer_clean"
polarity = "positive"
strength = "soft"
opposite = ["quality_dirty"]

[[quality]]
tag = "quality_quiet"
polarity = "positive"
strength = "soft"

[[quality]]
tag = "quality_dirty"
polarity = "negative"
strength = "soft"

[[quality]]
tag = "quality_too_spicy"
polarity = "negative"
strength = "soft"

[[quality]]
tag = "quality_ok_spicy"
polarity = "positive"
strength = "soft"

[[system]]
tag = "user_report_closed"
polarity = "neutral"
strength = "soft"
"#;

	fn registry() -> TagRegistry {
		TagRegistry::from_toml_str(TAXONOMY).expect("Taxonomy must load.")
	}

	fn restaurant(id: &str, tags: &[&str]) -> RestaurantRef {
		Arc::new(Restaurant {
			id: id.to_string(),
			general_tags: tags.iter().map(|tag| tag.to_string()).collect(),
			..Restaurant::default()
		})
	}

	fn score(registry: &TagRegistry, user: &[&str], candidate: &[&str]) -> i32 {
		let scorer = PreferenceScorer::new(registry, ScoringWeights::default());
		let user: Vec<String> = user.iter().map(|tag| tag.to_string()).collect();

		scorer.score(&user, &restaurant("r", candidate))
	}

	#[test]
	fn exact_match_scores_three() {
		assert_eq!(score(&registry(), &["prefer_spicy"], &["prefer_spicy"]), 3);
	}

	#[test]
	fn prefer_avoid_opposites_score_minus_three() {
		assert_eq!(score(&registry(), &["prefer_spicy"], &["avoid_spicy"]), -3);
	}

	#[test]
	fn preference_against_negative_quality_opposite_is_strong_conflict() {
		assert_eq!(score(&registry(), &["prefer_clean"], &["quality_dirty"]), -3);
	}

	#[test]
	fn avoidance_opposite_to_positive_quality_is_bonus() {
		assert_eq!(score(&registry(), &["avoid_noise"], &["quality_quiet"]), 1);
	}

	#[test]
	fn same_topic_quality_rules() {
		let registry = registry();

		assert_eq!(score(&registry, &["prefer_spicy"], &["quality_ok_spicy"]), 1);
		assert_eq!(score(&registry, &["prefer_spicy"], &["quality_too_spicy"]), 1);
		assert_eq!(score(&registry, &["avoid_spicy"], &["quality_too_spicy"]), -2);
		assert_eq!(score(&registry, &["spicy"], &["quality_too_spicy"]), 0);
	}

	#[test]
	fn hard_system_and_unknown_tags_are_skipped() {
		let registry = registry();

		assert_eq!(score(&registry, &["avoid_pork"], &["avoid_pork"]), 0);
		assert_eq!(score(&registry, &["user_report_closed"], &["user_report_closed"]), 0);
		assert_eq!(score(&registry, &["made_up"], &["made_up"]), 0);
		assert_eq!(score(&registry, &["prefer_spicy"], &["made_up"]), 0);
	}

	#[test]
	fn pairs_are_summed() {
		assert_eq!(
			score(&registry(), &["prefer_spicy", "avoid_noise"], &["prefer_spicy", "quality_quiet"]),
			4
		);
	}

	#[test]
	fn score_pool_sorts_descending_and_keeps_ties_in_pool_order() {
		let registry = registry();
		let scorer = PreferenceScorer::new(&registry, ScoringWeights::default());
		let pool = vec![
			restaurant("a", &[]),
			restaurant("b", &["prefer_spicy"]),
			restaurant("c", &[]),
			restaurant("d", &["avoid_spicy"]),
		];
		let ranked = scorer.score_pool(&["prefer_spicy".to_string()], &pool);
		let order: Vec<(&str, i32)> =
			ranked.iter().map(|entry| (entry.restaurant.id.as_str(), entry.score)).collect();

		assert_eq!(order, vec![("b", 3), ("a", 0), ("c", 0), ("d", -3)]);
	}

	#[test]
	fn topic_helpers() {
		assert_eq!(topic("prefer_spicy"), "spicy");
		assert_eq!(topic("quality_too_spicy"), "spicy");
		assert_eq!(topic("too_spicy"), "spicy");
		assert_eq!(topic("spicy"), "spicy");
		assert!(is_intensifier("portion_too_small"));
		assert!(!is_intensifier("quality_dirty"));
	}
}
