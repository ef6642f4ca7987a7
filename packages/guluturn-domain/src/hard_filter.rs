use std::collections::BTreeSet;

use tracing::debug;

use crate::{
	Error, Result,
	models::{Polarity, Restaurant, RestaurantRef},
	tags::{TagCategory, TagRegistry},
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum HardFilterScope {
	/// Ban a hard-negative tag together with all of its opposites.
	#[default]
	TagAndOpposites,
	/// Ban only the hard-negative tag itself.
	TagOnly,
}
impl HardFilterScope {
	pub fn from_config(cfg: &guluturn_config::HardFilter) -> Result<Self> {
		match cfg.scope.as_str() {
			"tag_and_opposites" => Ok(Self::TagAndOpposites),
			"tag_only" => Ok(Self::TagOnly),
			other => Err(Error::InvalidConfig {
				message: format!("Unknown hard filter scope {other:?}."),
			}),
		}
	}
}

/// Banned and required tag sets derived from the effective user tags of one round.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HardConstraints {
	pub banned: BTreeSet<String>,
	pub required: BTreeSet<String>,
}
impl HardConstraints {
	pub fn from_tags<'a, I>(registry: &TagRegistry, tags: I, scope: HardFilterScope) -> Self
	where
		I: IntoIterator<Item = &'a str>,
	{
		let mut constraints = Self::default();

		for tag in tags {
			let Some(meta) = registry.get(tag) else {
				continue;
			};

			if !meta.is_hard()
				|| !matches!(meta.category, TagCategory::Preference | TagCategory::Safety)
			{
				continue;
			}

			match meta.polarity {
				Polarity::Negative => {
					constraints.banned.insert(tag.to_string());

					if scope == HardFilterScope::TagAndOpposites {
						constraints.banned.extend(meta.opposite_tags.iter().cloned());
					}
				},
				Polarity::Positive => {
					constraints.required.insert(tag.to_string());
				},
				Polarity::Neutral => {},
			}
		}

		constraints
	}

	pub fn is_empty(&self) -> bool {
		self.banned.is_empty() && self.required.is_empty()
	}

	pub fn admits(&self, restaurant: &Restaurant) -> bool {
		self.banned.is_disjoint(&restaurant.general_tags)
			&& self.required.is_subset(&restaurant.general_tags)
	}
}

/// Keeps the restaurants that satisfy every hard constraint, preserving pool order.
pub fn apply_hard_filter<'a, I>(
	registry: &TagRegistry,
	tags: I,
	pool: &[RestaurantRef],
	scope: HardFilterScope,
) -> Vec<RestaurantRef>
where
	I: IntoIterator<Item = &'a str>,
{
	let constraints = HardConstraints::from_tags(registry, tags, scope);

	if constraints.is_empty() {
		return pool.to_vec();
	}

	let admitted: Vec<RestaurantRef> =
		pool.iter().filter(|restaurant| constraints.admits(restaurant)).cloned().collect();

	debug!(
		banned = ?constraints.banned,
		required = ?constraints.required,
		before = pool.len(),
		after = admitted.len(),
		"Hard filter applied."
	);

	admitted
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;

	const TAXONOMY: &str = r#"
[[preference]]
tag = "avoid_pork"
polarity = "negative"
strength = "hard"
opposite = ["contains_pork"]

[[preference]]
tag = "contains_pork"
polarity = "neutral"
strength = "soft"

[[preference]]
tag = "prefer_spicy_dishes"
polarity = "positive"
strength = "soft"

[[safety]]
tag = "need_vegetarian_options"
polarity = "positive"
strength = "hard"

[[quality]]
tag = "quality_too_salty"
polarity = "negative"
strength = "hard"
"#;

	fn restaurant(id: &str, tags: &[&str]) -> RestaurantRef {
		Arc::new(Restaurant {
			id: id.to_string(),
			name: id.to_string(),
			general_tags: tags.iter().map(|tag| tag.to_string()).collect(),
			..Restaurant::default()
		})
	}

	fn ids(pool: &[RestaurantRef]) -> Vec<&str> {
		pool.iter().map(|restaurant| restaurant.id.as_str()).collect()
	}

	#[test]
	fn bans_hard_negative_tag_and_its_opposites() {
		let registry = TagRegistry::from_toml_str(TAXONOMY).expect("Taxonomy must load.");
		let pool = vec![
			restaurant("a", &["contains_pork"]),
			restaurant("b", &["prefer_spicy_dishes"]),
			restaurant("c", &["avoid_pork"]),
		];
		let kept =
			apply_hard_filter(&registry, ["avoid_pork"], &pool, HardFilterScope::TagAndOpposites);

		assert_eq!(ids(&kept), vec!["b"]);
	}

	#[test]
	fn tag_only_scope_skips_opposite_expansion() {
		let registry = TagRegistry::from_toml_str(TAXONOMY).expect("Taxonomy must load.");
		let pool = vec![restaurant("a", &["contains_pork"]), restaurant("c", &["avoid_pork"])];
		let kept = apply_hard_filter(&registry, ["avoid_pork"], &pool, HardFilterScope::TagOnly);

		assert_eq!(ids(&kept), vec!["a"]);
	}

	#[test]
	fn hard_positive_safety_tag_is_required() {
		let registry = TagRegistry::from_toml_str(TAXONOMY).expect("Taxonomy must load.");
		let pool = vec![
			restaurant("a", &["need_vegetarian_options", "prefer_spicy_dishes"]),
			restaurant("b", &["prefer_spicy_dishes"]),
		];
		let kept = apply_hard_filter(
			&registry,
			["need_vegetarian_options"],
			&pool,
			HardFilterScope::TagAndOpposites,
		);

		assert_eq!(ids(&kept), vec!["a"]);
	}

	#[test]
	fn soft_unknown_and_quality_tags_do_not_constrain() {
		let registry = TagRegistry::from_toml_str(TAXONOMY).expect("Taxonomy must load.");
		let pool = vec![restaurant("a", &["quality_too_salty"]), restaurant("b", &[])];
		let kept = apply_hard_filter(
			&registry,
			["prefer_spicy_dishes", "made_up_tag", "quality_too_salty"],
			&pool,
			HardFilterScope::TagAndOpposites,
		);

		assert_eq!(ids(&kept), vec!["a", "b"]);
	}

	#[test]
	fn result_does_not_depend_on_tag_order() {
		let registry = TagRegistry::from_toml_str(TAXONOMY).expect("Taxonomy must load.");
		let forward = HardConstraints::from_tags(
			&registry,
			["avoid_pork", "need_vegetarian_options"],
			HardFilterScope::TagAndOpposites,
		);
		let backward = HardConstraints::from_tags(
			&registry,
			["need_vegetarian_options", "avoid_pork"],
			HardFilterScope::TagAndOpposites,
		);

		assert_eq!(forward, backward);
	}

	#[test]
	fn scope_parses_from_config() {
		let cfg = guluturn_config::HardFilter { scope: "tag_only".to_string() };

		assert_eq!(HardFilterScope::from_config(&cfg).expect("Scope."), HardFilterScope::TagOnly);

		let cfg = guluturn_config::HardFilter { scope: "nope".to_string() };

		assert!(HardFilterScope::from_config(&cfg).is_err());
	}
}
