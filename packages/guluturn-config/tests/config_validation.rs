use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::{Table, Value};

use guluturn_config::{Config, Error};

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn template() -> Table {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.")
}

fn section<'a>(root: &'a mut Table, path: &[&str]) -> &'a mut Table {
	let mut table = root;

	for key in path {
		table = table
			.get_mut(*key)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Template config must include [{key}]."));
	}

	table
}

fn render(root: &Table) -> String {
	toml::to_string(root).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("guluturn_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String) -> guluturn_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = guluturn_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn base_config() -> Config {
	toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse test config.")
}

fn expect_validation(result: guluturn_config::Result<Config>, expected: &str) {
	let err = result.expect_err("Expected validation error.");
	let message = err.to_string();

	assert!(matches!(err, Error::Validation { .. }), "Unexpected error kind: {err:?}");
	assert!(message.contains(expected), "Unexpected error message: {message}");
}

#[test]
fn template_config_is_valid() {
	let cfg = base_config();

	assert!(guluturn_config::validate(&cfg).is_ok());
	assert_eq!(cfg.pipeline.card_count, 6);
	assert_eq!(cfg.pipeline.rerank.top_n, 40);
	assert_eq!(cfg.availability.utc_offset_minutes, 480);
}

#[test]
fn omitted_pipeline_sections_use_defaults() {
	let mut root = template();

	root.remove("pipeline");
	root.remove("availability");
	root.remove("session");

	let cfg = load_payload(render(&root)).expect("Config without optional sections must load.");

	assert_eq!(cfg.pipeline.card_count, 6);
	assert_eq!(cfg.pipeline.embedding_timeout_ms, 3_000);
	assert_eq!(cfg.pipeline.hard_filter.scope, "tag_and_opposites");
	assert_eq!(cfg.pipeline.scoring.same_match, 3);
	assert_eq!(cfg.pipeline.scoring.too_penalty_avoid, -2);
	assert_eq!(cfg.pipeline.rerank.penalty_mismatch, -5);
	assert_eq!(cfg.pipeline.selection.policy, "fixed");
	assert_eq!(cfg.pipeline.named.similarity_threshold, 0.5);
	assert_eq!(cfg.availability.utc_offset_minutes, 0);
	assert_eq!(cfg.session.max_rounds, 6);
	assert!(cfg.session.seed.is_none());
}

#[test]
fn relative_taxonomy_path_is_resolved_against_config_dir() {
	let cfg = load_payload(render(&template())).expect("Template config must load.");

	assert!(cfg.taxonomy.path.is_absolute(), "Path was not resolved: {:?}", cfg.taxonomy.path);
	assert!(cfg.taxonomy.path.ends_with("tags.toml"));
}

#[test]
fn card_count_must_be_positive() {
	let mut root = template();

	section(&mut root, &["pipeline"]).insert("card_count".to_string(), Value::Integer(0));

	expect_validation(load_payload(render(&root)), "pipeline.card_count must be greater than zero.");
}

#[test]
fn hard_filter_scope_must_be_known() {
	let mut root = template();

	section(&mut root, &["pipeline", "hard_filter"])
		.insert("scope".to_string(), Value::String("everything".to_string()));

	expect_validation(
		load_payload(render(&root)),
		"pipeline.hard_filter.scope must be one of tag_and_opposites or tag_only.",
	);
}

#[test]
fn scope_and_policy_are_case_normalized() {
	let mut root = template();

	section(&mut root, &["pipeline", "hard_filter"])
		.insert("scope".to_string(), Value::String(" TAG_ONLY ".to_string()));
	section(&mut root, &["pipeline", "selection"])
		.insert("policy".to_string(), Value::String("Tie_Band".to_string()));

	let cfg = load_payload(render(&root)).expect("Normalized config must load.");

	assert_eq!(cfg.pipeline.hard_filter.scope, "tag_only");
	assert_eq!(cfg.pipeline.selection.policy, "tie_band");
}

#[test]
fn tie_band_max_size_cannot_undercut_card_count() {
	let mut cfg = base_config();

	cfg.pipeline.selection.policy = "tie_band".to_string();
	cfg.pipeline.selection.max_size = Some(5);

	expect_validation(
		guluturn_config::validate(&cfg).map(|_| cfg),
		"pipeline.selection.max_size must be at least pipeline.card_count.",
	);
}

#[test]
fn selection_policy_must_be_known() {
	let mut cfg = base_config();

	cfg.pipeline.selection.policy = "random".to_string();

	expect_validation(
		guluturn_config::validate(&cfg).map(|_| cfg),
		"pipeline.selection.policy must be one of fixed or tie_band.",
	);
}

#[test]
fn similarity_thresholds_must_be_in_cosine_range() {
	let mut cfg = base_config();

	cfg.pipeline.rerank.similarity_threshold = 1.5;

	expect_validation(
		guluturn_config::validate(&cfg).map(|_| cfg),
		"pipeline.rerank.similarity_threshold must be in the range -1.0-1.0.",
	);

	let mut cfg = base_config();

	cfg.pipeline.named.similarity_threshold = f32::NAN;

	expect_validation(
		guluturn_config::validate(&cfg).map(|_| cfg),
		"pipeline.named.similarity_threshold must be a finite number.",
	);
}

#[test]
fn rerank_top_n_must_be_positive() {
	let mut cfg = base_config();

	cfg.pipeline.rerank.top_n = 0;

	expect_validation(
		guluturn_config::validate(&cfg).map(|_| cfg),
		"pipeline.rerank.top_n must be greater than zero.",
	);
}

#[test]
fn provider_api_keys_must_be_present() {
	let mut cfg = base_config();

	cfg.providers.parser.api_key = "   ".to_string();

	expect_validation(
		guluturn_config::validate(&cfg).map(|_| cfg),
		"Provider parser api_key must be non-empty.",
	);
}

#[test]
fn utc_offset_must_be_realistic() {
	let mut cfg = base_config();

	cfg.availability.utc_offset_minutes = 20 * 60;

	expect_validation(
		guluturn_config::validate(&cfg).map(|_| cfg),
		"availability.utc_offset_minutes must be within -1080..=1080.",
	);
}

#[test]
fn max_rounds_must_be_positive() {
	let mut cfg = base_config();

	cfg.session.max_rounds = 0;

	expect_validation(
		guluturn_config::validate(&cfg).map(|_| cfg),
		"session.max_rounds must be greater than zero.",
	);
}

#[test]
fn missing_file_reports_read_error() {
	let path = env::temp_dir().join("guluturn_config_test_does_not_exist.toml");
	let err = guluturn_config::load(&path).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }), "Unexpected error: {err:?}");
}

#[test]
fn malformed_file_reports_parse_error() {
	let err = load_payload("[service\nlog_level = ".to_string()).expect_err("Expected parse error.");

	assert!(matches!(err, Error::ParseConfig { .. }), "Unexpected error: {err:?}");
}
