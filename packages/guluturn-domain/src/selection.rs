use rand::{Rng, seq::SliceRandom};

use crate::{
	Error, Result,
	models::{RankedRestaurant, RestaurantRef},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SelectionPolicy {
	/// Strict top-K truncation.
	Fixed,
	/// Top-(K-1) plus every candidate tied with the K-th score, capped at `max_size`.
	TieBand { max_size: usize },
}

/// Bounds a score-sorted list to the configured card count.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CandidateSelector {
	card_count: usize,
	policy: SelectionPolicy,
}
impl CandidateSelector {
	pub fn new(card_count: usize, policy: SelectionPolicy) -> Self {
		Self { card_count, policy }
	}

	pub fn fixed(card_count: usize) -> Self {
		Self::new(card_count, SelectionPolicy::Fixed)
	}

	pub fn from_config(cfg: &guluturn_config::Pipeline) -> Result<Self> {
		let card_count = cfg.card_count as usize;
		let policy = match cfg.selection.policy.as_str() {
			"fixed" => SelectionPolicy::Fixed,
			"tie_band" => SelectionPolicy::TieBand {
				max_size: cfg.selection.max_size.map_or(card_count + 1, |size| size as usize),
			},
			other => {
				return Err(Error::InvalidConfig {
					message: format!("Unknown selection policy {other:?}."),
				});
			},
		};

		Ok(Self::new(card_count, policy))
	}

	pub fn card_count(&self) -> usize {
		self.card_count
	}

	pub fn policy(&self) -> SelectionPolicy {
		self.policy
	}

	/// Largest list this selector can return.
	pub fn max_output(&self) -> usize {
		match self.policy {
			SelectionPolicy::Fixed => self.card_count,
			SelectionPolicy::TieBand { max_size } => max_size.max(self.card_count),
		}
	}

	pub fn select(&self, ranked: &[RankedRestaurant]) -> Vec<RankedRestaurant> {
		self.select_slots(ranked, self.card_count)
	}

	/// Fills `slots` positions, e.g. the cards left after named lock-ins.
	///
	/// Under the tie band the overflow allowance is the same as for a full selection.
	pub fn select_slots(&self, ranked: &[RankedRestaurant], slots: usize) -> Vec<RankedRestaurant> {
		if slots == 0 {
			return Vec::new();
		}
		if ranked.len() <= slots {
			return ranked.to_vec();
		}

		match self.policy {
			SelectionPolicy::Fixed => ranked[..slots].to_vec(),
			SelectionPolicy::TieBand { max_size } => {
				let cap = slots + max_size.saturating_sub(self.card_count);
				let cutoff = ranked[slots - 1].score;
				let mut selected = ranked[..slots - 1].to_vec();

				selected.extend(
					ranked[slots - 1..]
						.iter()
						.take_while(|entry| entry.score == cutoff)
						.take(cap - selected.len())
						.cloned(),
				);

				selected
			},
		}
	}
}

/// Shuffles runs of equal score in a score-sorted list, leaving the run order intact.
pub fn shuffle_score_groups<R>(ranked: &mut [RankedRestaurant], rng: &mut R)
where
	R: Rng + ?Sized,
{
	let mut start = 0;

	while start < ranked.len() {
		let score = ranked[start].score;
		let end = ranked[start..]
			.iter()
			.position(|entry| entry.score != score)
			.map_or(ranked.len(), |offset| start + offset);

		ranked[start..end].shuffle(rng);

		start = end;
	}
}

/// Uniform sample without replacement of at most `count` restaurants.
pub fn random_sample<R>(pool: &[RestaurantRef], count: usize, rng: &mut R) -> Vec<RestaurantRef>
where
	R: Rng + ?Sized,
{
	pool.choose_multiple(rng, count).cloned().collect()
}

#[cfg(test)]
mod tests {
	use std::{collections::BTreeSet, sync::Arc};

	use rand::{SeedableRng, rngs::StdRng};

	use super::*;
	use crate::models::Restaurant;

	fn ranked(scores: &[i32]) -> Vec<RankedRestaurant> {
		scores
			.iter()
			.enumerate()
			.map(|(idx, score)| {
				RankedRestaurant::new(
					Arc::new(Restaurant { id: format!("r{idx}"), ..Restaurant::default() }),
					*score,
				)
			})
			.collect()
	}

	fn ids(list: &[RankedRestaurant]) -> Vec<&str> {
		list.iter().map(|entry| entry.restaurant.id.as_str()).collect()
	}

	#[test]
	fn fixed_policy_truncates() {
		let selector = CandidateSelector::fixed(3);
		let list = ranked(&[9, 8, 7, 7, 1]);

		assert_eq!(ids(&selector.select(&list)), vec!["r0", "r1", "r2"]);
		assert_eq!(selector.select(&list[..2]).len(), 2);
	}

	#[test]
	fn tie_band_includes_ties_up_to_cap() {
		let selector = CandidateSelector::new(3, SelectionPolicy::TieBand { max_size: 4 });
		let list = ranked(&[9, 8, 7, 7, 7, 1]);

		assert_eq!(ids(&selector.select(&list)), vec!["r0", "r1", "r2", "r3"]);

		let list = ranked(&[9, 8, 7, 6]);

		assert_eq!(ids(&selector.select(&list)), vec!["r0", "r1", "r2"]);
	}

	#[test]
	fn slots_respect_policy() {
		let selector = CandidateSelector::new(6, SelectionPolicy::TieBand { max_size: 7 });
		let list = ranked(&[5, 5, 5, 5]);

		assert_eq!(selector.select_slots(&list, 0).len(), 0);
		assert_eq!(ids(&selector.select_slots(&list, 2)), vec!["r0", "r1", "r2"]);
		assert_eq!(CandidateSelector::fixed(6).select_slots(&list, 2).len(), 2);
	}

	#[test]
	fn policy_resolves_from_config() {
		let mut cfg = guluturn_config::Pipeline::default();

		assert_eq!(CandidateSelector::from_config(&cfg).expect("Selector."), CandidateSelector::fixed(6));

		cfg.selection.policy = "tie_band".to_string();

		let selector = CandidateSelector::from_config(&cfg).expect("Selector.");

		assert_eq!(selector.policy(), SelectionPolicy::TieBand { max_size: 7 });
		assert_eq!(selector.max_output(), 7);

		cfg.selection.policy = "lottery".to_string();

		assert!(CandidateSelector::from_config(&cfg).is_err());
	}

	#[test]
	fn shuffle_keeps_groups_in_place() {
		let mut rng = StdRng::seed_from_u64(7);
		let mut list = ranked(&[5, 5, 5, 3, 3, 1]);

		shuffle_score_groups(&mut list, &mut rng);

		let scores: Vec<i32> = list.iter().map(|entry| entry.score).collect();
		let head: BTreeSet<&str> = ids(&list[..3]).into_iter().collect();

		assert_eq!(scores, vec![5, 5, 5, 3, 3, 1]);
		assert_eq!(head, BTreeSet::from(["r0", "r1", "r2"]));
		assert_eq!(list[5].restaurant.id, "r5");
	}

	#[test]
	fn random_sample_is_bounded_and_distinct() {
		let mut rng = StdRng::seed_from_u64(1);
		let pool: Vec<RestaurantRef> =
			ranked(&[0; 10]).into_iter().map(|entry| entry.restaurant).collect();
		let sample = random_sample(&pool, 6, &mut rng);
		let distinct: BTreeSet<&str> = sample.iter().map(|r| r.id.as_str()).collect();

		assert_eq!(sample.len(), 6);
		assert_eq!(distinct.len(), 6);
		assert_eq!(random_sample(&pool[..3], 6, &mut rng).len(), 3);
	}
}
