use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use guluturn_domain::models::{Location, Provenance, Restaurant, ScoredCandidate};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
	Accepted,
	/// The round limit was reached without an acceptance.
	Exhausted,
}

/// Serializable summary of one finished session, handed to the caller on commit.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SessionRecord {
	pub session_id: Uuid,
	#[serde(with = "time::serde::rfc3339")]
	pub started_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub finished_at: OffsetDateTime,
	pub outcome: SessionOutcome,
	pub accepted_restaurant: Option<AcceptedRestaurant>,
	pub rounds: Vec<RoundRecord>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct AcceptedRestaurant {
	pub id: String,
	pub name: String,
	pub general_tags: Vec<String>,
	pub specific_tags: Vec<String>,
	pub summary: String,
	pub location: Location,
	pub rating: Option<f64>,
}
impl From<&Restaurant> for AcceptedRestaurant {
	fn from(restaurant: &Restaurant) -> Self {
		Self {
			id: restaurant.id.clone(),
			name: restaurant.name.clone(),
			general_tags: restaurant.general_tags.iter().cloned().collect(),
			specific_tags: restaurant.specific_tags.iter().map(|tag| tag.text.clone()).collect(),
			summary: restaurant.summary.clone(),
			location: restaurant.location.clone(),
			rating: restaurant.rating,
		}
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoundRecord {
	pub round_index: u32,
	pub candidates: Vec<CandidateSnapshot>,
	pub selected_restaurant_id: Option<String>,
	pub feedback: Option<RoundFeedback>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CandidateSnapshot {
	pub id: String,
	pub name: String,
	pub tags: Vec<String>,
	pub summary: String,
	pub rating: Option<f64>,
	pub provenance: Provenance,
	pub score: Option<i32>,
	pub is_selected: bool,
}
impl CandidateSnapshot {
	pub fn new(candidate: &ScoredCandidate, selected_id: Option<&str>) -> Self {
		let restaurant = &candidate.restaurant;

		Self {
			id: restaurant.id.clone(),
			name: restaurant.name.clone(),
			tags: restaurant.general_tags.iter().cloned().collect(),
			summary: restaurant.summary.clone(),
			rating: restaurant.rating,
			provenance: candidate.provenance,
			score: candidate.score,
			is_selected: selected_id == Some(restaurant.id.as_str()),
		}
	}
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct RoundFeedback {
	pub accepted: bool,
	pub reason_input: Option<String>,
	pub parsed_general_tags: Vec<String>,
	pub parsed_specific_tags: Vec<String>,
}
