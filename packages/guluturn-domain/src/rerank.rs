use tracing::debug;

use crate::{
	models::{Polarity, RankedRestaurant, SpecificTag},
	similarity,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RerankParams {
	/// Only the leading `top_n` entries are adjusted.
	pub top_n: usize,
	pub similarity_threshold: f32,
	pub bonus_positive: i32,
	pub bonus_other: i32,
	pub penalty_mismatch: i32,
}
impl Default for RerankParams {
	fn default() -> Self {
		Self::from(&guluturn_config::Rerank::default())
	}
}
impl From<&guluturn_config::Rerank> for RerankParams {
	fn from(cfg: &guluturn_config::Rerank) -> Self {
		Self {
			top_n: cfg.top_n as usize,
			similarity_threshold: cfg.similarity_threshold,
			bonus_positive: cfg.bonus_positive,
			bonus_other: cfg.bonus_other,
			penalty_mismatch: cfg.penalty_mismatch,
		}
	}
}

/// Adjusts scores of the leading slice by dish similarity, then re-sorts the whole list.
///
/// For each user tag with an embedding, the closest embedded candidate tag decides the delta:
/// below the threshold is a mismatch, otherwise the bonus depends on that candidate tag's
/// polarity. User tags without embeddings contribute nothing.
pub fn rerank(
	mut ranked: Vec<RankedRestaurant>,
	user_tags: &[SpecificTag],
	params: &RerankParams,
) -> Vec<RankedRestaurant> {
	let queries: Vec<(&str, &[f32])> = user_tags
		.iter()
		.filter_map(|tag| match tag.embedding.as_deref() {
			Some(vec) if !vec.is_empty() => Some((tag.text.as_str(), vec)),
			_ => None,
		})
		.collect();

	if queries.is_empty() || params.top_n == 0 {
		return ranked;
	}

	let inspected = params.top_n.min(ranked.len());

	for entry in ranked.iter_mut().take(inspected) {
		let candidate_tags: Vec<&SpecificTag> =
			entry.restaurant.specific_tags.iter().filter(|tag| tag.has_embedding()).collect();

		if candidate_tags.is_empty() {
			continue;
		}

		let mut delta = 0;

		for (text, query) in &queries {
			let Some((idx, sim)) = similarity::best_match(
				query,
				candidate_tags.iter().map(|tag| tag.embedding.as_deref()),
			) else {
				continue;
			};
			let best = candidate_tags[idx];
			let step = if sim < params.similarity_threshold {
				params.penalty_mismatch
			} else if best.polarity == Polarity::Positive {
				params.bonus_positive
			} else {
				params.bonus_other
			};

			debug!(
				restaurant_id = %entry.restaurant.id,
				user_tag = %text,
				matched_tag = %best.text,
				similarity = sim,
				delta = step,
				"Dish similarity scored."
			);

			delta += step;
		}

		entry.score += delta;
	}

	ranked.sort_by(|lhs, rhs| rhs.score.cmp(&lhs.score));

	ranked
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::models::Restaurant;

	fn entry(id: &str, score: i32, tags: Vec<SpecificTag>) -> RankedRestaurant {
		RankedRestaurant::new(
			Arc::new(Restaurant {
				id: id.to_string(),
				specific_tags: tags,
				..Restaurant::default()
			}),
			score,
		)
	}

	fn dish(text: &str, polarity: Polarity, vec: [f32; 2]) -> SpecificTag {
		SpecificTag::new(text, polarity).with_embedding(vec.to_vec())
	}

	fn scores(ranked: &[RankedRestaurant]) -> Vec<(&str, i32)> {
		ranked.iter().map(|entry| (entry.restaurant.id.as_str(), entry.score)).collect()
	}

	#[test]
	fn close_positive_match_gets_large_bonus_and_moves_up() {
		let ranked = vec![
			entry("a", 5, vec![dish("noodles", Polarity::Positive, [0.0, 1.0])]),
			entry("b", 3, vec![dish("dumplings", Polarity::Positive, [1.0, 0.0])]),
		];
		let user = [dish("dumpling", Polarity::Positive, [1.0, 0.05])];
		let out = rerank(ranked, &user, &RerankParams::default());

		assert_eq!(scores(&out), vec![("b", 23), ("a", 0)]);
	}

	#[test]
	fn close_non_positive_match_gets_small_bonus() {
		let ranked = vec![entry("a", 0, vec![dish("greasy fries", Polarity::Negative, [1.0, 0.0])])];
		let user = [dish("fries", Polarity::Positive, [1.0, 0.0])];
		let out = rerank(ranked, &user, &RerankParams::default());

		assert_eq!(scores(&out), vec![("a", 10)]);
	}

	#[test]
	fn only_leading_slice_is_adjusted() {
		let ranked = vec![
			entry("a", 2, vec![dish("x", Polarity::Positive, [0.0, 1.0])]),
			entry("b", 1, vec![dish("y", Polarity::Positive, [1.0, 0.0])]),
		];
		let user = [dish("y", Polarity::Positive, [1.0, 0.0])];
		let params = RerankParams { top_n: 1, ..RerankParams::default() };
		let out = rerank(ranked, &user, &params);

		assert_eq!(scores(&out), vec![("b", 1), ("a", -3)]);
	}

	#[test]
	fn candidates_without_embedded_tags_are_skipped() {
		let ranked = vec![
			entry("a", 4, vec![SpecificTag::new("ramen", Polarity::Positive)]),
			entry("b", 4, Vec::new()),
		];
		let user = [dish("ramen", Polarity::Positive, [1.0, 0.0])];
		let out = rerank(ranked, &user, &RerankParams::default());

		assert_eq!(scores(&out), vec![("a", 4), ("b", 4)]);
	}

	#[test]
	fn user_tags_without_embedding_contribute_nothing() {
		let ranked = vec![entry("a", 1, vec![dish("ramen", Polarity::Positive, [1.0, 0.0])])];
		let user = [SpecificTag::new("ramen", Polarity::Positive)];
		let out = rerank(ranked, &user, &RerankParams::default());

		assert_eq!(scores(&out), vec![("a", 1)]);
	}
}
