use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub taxonomy: Taxonomy,
	pub providers: Providers,
	#[serde(default)]
	pub pipeline: Pipeline,
	#[serde(default)]
	pub availability: Availability,
	#[serde(default)]
	pub session: Session,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Taxonomy {
	/// Relative paths are resolved against the directory of the config file.
	pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub parser: LlmProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Pipeline {
	/// Number of cards shown to the user per round.
	pub card_count: u32,
	/// Upper bound for a single embedding lookup before it is treated as failed.
	pub embedding_timeout_ms: u64,
	pub hard_filter: HardFilter,
	pub scoring: Scoring,
	pub rerank: Rerank,
	pub selection: Selection,
	pub named: Named,
}
impl Default for Pipeline {
	fn default() -> Self {
		Self {
			card_count: 6,
			embedding_timeout_ms: 3_000,
			hard_filter: HardFilter::default(),
			scoring: Scoring::default(),
			rerank: Rerank::default(),
			selection: Selection::default(),
			named: Named::default(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HardFilter {
	/// One of `tag_and_opposites` or `tag_only`.
	pub scope: String,
}
impl Default for HardFilter {
	fn default() -> Self {
		Self { scope: "tag_and_opposites".to_string() }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Scoring {
	pub same_match: i32,
	pub opposite_strong: i32,
	pub quality_align_bonus: i32,
	pub too_bonus_prefer: i32,
	pub too_penalty_avoid: i32,
}
impl Default for Scoring {
	fn default() -> Self {
		Self {
			same_match: 3,
			opposite_strong: -3,
			quality_align_bonus: 1,
			too_bonus_prefer: 1,
			too_penalty_avoid: -2,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Rerank {
	pub top_n: u32,
	pub similarity_threshold: f32,
	pub bonus_positive: i32,
	pub bonus_other: i32,
	pub penalty_mismatch: i32,
}
impl Default for Rerank {
	fn default() -> Self {
		Self {
			top_n: 40,
			similarity_threshold: 0.85,
			bonus_positive: 20,
			bonus_other: 10,
			penalty_mismatch: -5,
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Selection {
	/// One of `fixed` or `tie_band`.
	pub policy: String,
	/// Only read by `tie_band`. Defaults to `card_count + 1`.
	pub max_size: Option<u32>,
}
impl Default for Selection {
	fn default() -> Self {
		Self { policy: "fixed".to_string(), max_size: None }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Named {
	pub similarity_threshold: f32,
}
impl Default for Named {
	fn default() -> Self {
		Self { similarity_threshold: 0.5 }
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Availability {
	/// Offset of the reference time zone used to evaluate opening hours.
	pub utc_offset_minutes: i32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Session {
	pub max_rounds: u32,
	pub seed: Option<u64>,
}
impl Default for Session {
	fn default() -> Self {
		Self { max_rounds: 6, seed: None }
	}
}
