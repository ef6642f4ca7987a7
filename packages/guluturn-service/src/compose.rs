use std::collections::HashMap;

use tracing::{debug, info};

use guluturn_domain::{
	models::{Provenance, RankedRestaurant, RestaurantRef, ScoredCandidate},
	selection::CandidateSelector,
	similarity,
};

use crate::embeddings::EmbeddingLookup;

pub type NameEmbeddings = HashMap<String, Option<Vec<f32>>>;

/// Locks at most one restaurant per preferred name, by substring match or else by the closest
/// name embedding above the threshold, then pads from the ranked list.
pub struct NamedComposer<'a> {
	selector: &'a CandidateSelector,
	similarity_threshold: f32,
	lookup: EmbeddingLookup<'a>,
}
impl<'a> NamedComposer<'a> {
	pub fn new(
		selector: &'a CandidateSelector,
		similarity_threshold: f32,
		lookup: EmbeddingLookup<'a>,
	) -> Self {
		Self { selector, similarity_threshold, lookup }
	}

	/// Embeds, concurrently, the names that cannot be resolved by substring match anywhere in
	/// `pool`. Other names are embedded on demand during composition.
	pub async fn prefetch(&self, names: &[String], pool: &[RestaurantRef]) -> NameEmbeddings {
		let unmatched: Vec<String> = names
			.iter()
			.filter(|name| !pool.iter().any(|restaurant| restaurant.name_matches(name)))
			.cloned()
			.collect();
		let vectors = self.lookup.embed_many(&unmatched).await;

		unmatched.into_iter().zip(vectors).collect()
	}

	pub async fn compose(
		&self,
		names: &[String],
		pool: &[RestaurantRef],
		ranked: Vec<RankedRestaurant>,
		mut prefetched: NameEmbeddings,
	) -> Vec<ScoredCandidate> {
		let card_count = self.selector.card_count();
		let scores: HashMap<String, i32> =
			ranked.iter().map(|entry| (entry.restaurant.id.clone(), entry.score)).collect();
		let mut working = pool.to_vec();
		let mut remainder = ranked;
		let mut locked: Vec<ScoredCandidate> = Vec::new();

		for name in names {
			if locked.len() >= card_count {
				break;
			}

			let chosen = if let Some(idx) =
				working.iter().position(|restaurant| restaurant.name_matches(name))
			{
				debug!(name = %name, restaurant_id = %working[idx].id, "Named match by substring.");

				Some(working.remove(idx))
			} else {
				let query = match prefetched.remove(name) {
					Some(query) => query,
					None => self.lookup.embed_one(name).await,
				};

				query.and_then(|query| self.closest(&query, name, &mut working))
			};
			let Some(restaurant) = chosen else {
				continue;
			};

			remainder.retain(|entry| entry.restaurant.name != restaurant.name);
			locked.push(ScoredCandidate {
				score: scores.get(&restaurant.id).copied(),
				restaurant,
				provenance: Provenance::Locked,
			});
		}

		let slots = card_count.saturating_sub(locked.len());
		let padding = self.selector.select_slots(&remainder, slots);

		locked.extend(padding.into_iter().map(|entry| ScoredCandidate {
			restaurant: entry.restaurant,
			score: Some(entry.score),
			provenance: Provenance::Filtered,
		}));

		locked
	}

	fn closest(
		&self,
		query: &[f32],
		name: &str,
		working: &mut Vec<RestaurantRef>,
	) -> Option<RestaurantRef> {
		let (idx, sim) = similarity::best_match(
			query,
			working.iter().map(|restaurant| restaurant.name_embedding.as_deref()),
		)?;

		if sim < self.similarity_threshold {
			info!(name, best_similarity = sim, "No restaurant close enough to preferred name.");

			return None;
		}

		debug!(
			name,
			restaurant_id = %working[idx].id,
			similarity = sim,
			"Named match by embedding."
		);

		Some(working.remove(idx))
	}
}
