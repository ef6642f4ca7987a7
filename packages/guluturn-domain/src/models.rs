use std::{
	collections::{BTreeMap, BTreeSet},
	sync::Arc,
};

use serde::{Deserialize, Serialize};
use time::Weekday;

pub type RestaurantRef = Arc<Restaurant>;

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
	#[default]
	Positive,
	Negative,
	Neutral,
}
impl Polarity {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Positive => "positive",
			Self::Negative => "negative",
			Self::Neutral => "neutral",
		}
	}
}

/// A free-text phrase attached to a restaurant or extracted from user input.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SpecificTag {
	#[serde(alias = "tag")]
	pub text: String,
	#[serde(default)]
	pub polarity: Polarity,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub embedding: Option<Vec<f32>>,
}
impl SpecificTag {
	pub fn new(text: impl Into<String>, polarity: Polarity) -> Self {
		Self { text: text.into(), polarity, embedding: None }
	}

	pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
		self.embedding = Some(embedding);

		self
	}

	pub fn has_embedding(&self) -> bool {
		self.embedding.as_ref().is_some_and(|vec| !vec.is_empty())
	}
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct BusinessHours {
	/// `HH:MM`, 24-hour clock.
	pub open: Option<String>,
	pub close: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Location {
	pub lat: f64,
	pub lng: f64,
	pub address: String,
}

/// Canonical restaurant record shared by every pipeline stage.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Restaurant {
	pub id: String,
	pub name: String,
	#[serde(default)]
	pub summary: String,
	#[serde(default)]
	pub general_tags: BTreeSet<String>,
	#[serde(default)]
	pub specific_tags: Vec<SpecificTag>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name_embedding: Option<Vec<f32>>,
	/// Keyed by lowercase English weekday name, e.g. `monday`.
	#[serde(default)]
	pub business_hours: BTreeMap<String, BusinessHours>,
	#[serde(default)]
	pub location: Location,
	#[serde(default)]
	pub price_range: Option<String>,
	#[serde(default)]
	pub rating: Option<f64>,
	#[serde(default)]
	pub review_count: u32,
}
impl Restaurant {
	pub fn hours_on(&self, weekday: Weekday) -> Option<&BusinessHours> {
		self.business_hours.get(weekday_key(weekday))
	}

	/// Case-insensitive substring match of a user-supplied name against the display name.
	pub fn name_matches(&self, query: &str) -> bool {
		let query = query.trim();

		!query.is_empty() && self.name.to_lowercase().contains(&query.to_lowercase())
	}
}

/// Structured output of the semantic parser for one round.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ParsedIntent {
	#[serde(default)]
	pub user_input: String,
	#[serde(default)]
	pub general_tags: Vec<String>,
	#[serde(default)]
	pub specific_tags: Vec<SpecificTag>,
	#[serde(default, alias = "preferred_restaurants")]
	pub preferred_restaurant_names: Vec<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
	Locked,
	Filtered,
	Random,
}

/// A restaurant carrying its pre-composition score.
#[derive(Clone, Debug)]
pub struct RankedRestaurant {
	pub restaurant: RestaurantRef,
	pub score: i32,
}
impl RankedRestaurant {
	pub fn new(restaurant: RestaurantRef, score: i32) -> Self {
		Self { restaurant, score }
	}
}

/// An entry of the list handed back to the caller.
#[derive(Clone, Debug)]
pub struct ScoredCandidate {
	pub restaurant: RestaurantRef,
	/// `None` when the entry never went through scoring, e.g. random fallback.
	pub score: Option<i32>,
	pub provenance: Provenance,
}

pub fn weekday_key(weekday: Weekday) -> &'static str {
	match weekday {
		Weekday::Monday => "monday",
		Weekday::Tuesday => "tuesday",
		Weekday::Wednesday => "wednesday",
		Weekday::Thursday => "thursday",
		Weekday::Friday => "friday",
		Weekday::Saturday => "saturday",
		Weekday::Sunday => "sunday",
	}
}
