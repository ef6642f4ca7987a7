mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Availability, Config, EmbeddingProviderConfig, HardFilter, LlmProviderConfig, Named, Pipeline,
	Providers, Rerank, Scoring, Selection, Service, Session, Taxonomy,
};

use std::{fs, path::Path};

const MAX_UTC_OFFSET_MINUTES: i32 = 18 * 60;

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg, path.parent());

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.taxonomy.path.as_os_str().is_empty() {
		return Err(Error::validation("taxonomy.path must be non-empty."));
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::validation(
			"providers.embedding.dimensions must be greater than zero.",
		));
	}

	for (label, timeout_ms) in [
		("providers.embedding.timeout_ms", cfg.providers.embedding.timeout_ms),
		("providers.parser.timeout_ms", cfg.providers.parser.timeout_ms),
		("pipeline.embedding_timeout_ms", cfg.pipeline.embedding_timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::validation(format!("{label} must be greater than zero.")));
		}
	}
	for (label, key) in
		[("embedding", &cfg.providers.embedding.api_key), ("parser", &cfg.providers.parser.api_key)]
	{
		if key.trim().is_empty() {
			return Err(Error::validation(format!("Provider {label} api_key must be non-empty.")));
		}
	}

	if !cfg.providers.parser.temperature.is_finite() || cfg.providers.parser.temperature < 0.0 {
		return Err(Error::validation(
			"providers.parser.temperature must be a finite number, zero or greater.",
		));
	}

	validate_pipeline(&cfg.pipeline)?;

	if cfg.availability.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
		return Err(Error::validation(
			"availability.utc_offset_minutes must be within -1080..=1080.",
		));
	}
	if cfg.session.max_rounds == 0 {
		return Err(Error::validation("session.max_rounds must be greater than zero."));
	}

	Ok(())
}

fn validate_pipeline(pipeline: &Pipeline) -> Result<()> {
	if pipeline.card_count == 0 {
		return Err(Error::validation("pipeline.card_count must be greater than zero."));
	}
	if !matches!(pipeline.hard_filter.scope.as_str(), "tag_and_opposites" | "tag_only") {
		return Err(Error::validation(
			"pipeline.hard_filter.scope must be one of tag_and_opposites or tag_only.",
		));
	}
	if pipeline.rerank.top_n == 0 {
		return Err(Error::validation("pipeline.rerank.top_n must be greater than zero."));
	}

	for (label, threshold) in [
		("pipeline.rerank.similarity_threshold", pipeline.rerank.similarity_threshold),
		("pipeline.named.similarity_threshold", pipeline.named.similarity_threshold),
	] {
		if !threshold.is_finite() {
			return Err(Error::validation(format!("{label} must be a finite number.")));
		}
		if !(-1.0..=1.0).contains(&threshold) {
			return Err(Error::validation(format!("{label} must be in the range -1.0-1.0.")));
		}
	}

	match pipeline.selection.policy.as_str() {
		"fixed" => {},
		"tie_band" =>
			if let Some(max_size) = pipeline.selection.max_size
				&& max_size < pipeline.card_count
			{
				return Err(Error::validation(
					"pipeline.selection.max_size must be at least pipeline.card_count.",
				));
			},
		_ => {
			return Err(Error::validation(
				"pipeline.selection.policy must be one of fixed or tie_band.",
			));
		},
	}

	Ok(())
}

fn normalize(cfg: &mut Config, base_dir: Option<&Path>) {
	cfg.service.log_level = cfg.service.log_level.trim().to_string();

	if cfg.service.log_level.is_empty() {
		cfg.service.log_level = "info".to_string();
	}
	if let Some(base_dir) = base_dir
		&& cfg.taxonomy.path.is_relative()
		&& !cfg.taxonomy.path.as_os_str().is_empty()
	{
		cfg.taxonomy.path = base_dir.join(&cfg.taxonomy.path);
	}

	cfg.pipeline.hard_filter.scope = cfg.pipeline.hard_filter.scope.trim().to_ascii_lowercase();
	cfg.pipeline.selection.policy = cfg.pipeline.selection.policy.trim().to_ascii_lowercase();
}
