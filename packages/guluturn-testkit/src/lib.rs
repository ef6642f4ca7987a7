use std::{
	collections::HashMap,
	path::Path,
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use time::{OffsetDateTime, Weekday};

use guluturn_config::Config;
use guluturn_domain::{
	TagRegistry,
	availability::Clock,
	models::{self, BusinessHours, ParsedIntent, Polarity, Restaurant, RestaurantRef, SpecificTag},
};
use guluturn_service::{BoxFuture, EmbeddingProvider, Error, IntentParser, Providers, Result};

pub const SAMPLE_TAXONOMY_TOML: &str = include_str!("../fixtures/tags.toml");
pub const SAMPLE_CONFIG_TOML: &str = include_str!("../fixtures/config.toml");

pub fn sample_registry() -> guluturn_domain::Result<Arc<TagRegistry>> {
	TagRegistry::from_toml_str(SAMPLE_TAXONOMY_TOML).map(Arc::new)
}

/// The sample config, with its taxonomy path pointing at the bundled fixture.
pub fn sample_config() -> guluturn_config::Result<Config> {
	let mut cfg: Config = toml::from_str(SAMPLE_CONFIG_TOML).map_err(|err| {
		guluturn_config::Error::ParseConfig { path: "fixtures/config.toml".into(), source: err }
	})?;

	cfg.taxonomy.path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/tags.toml");

	guluturn_config::validate(&cfg)?;

	Ok(cfg)
}

/// Looks texts up in a fixed table. Unknown texts fail the whole call.
#[derive(Default)]
pub struct StaticEmbedding {
	table: HashMap<String, Vec<f32>>,
	delay: Option<Duration>,
	calls: AtomicUsize,
}
impl StaticEmbedding {
	pub fn new<I, S>(entries: I) -> Self
	where
		I: IntoIterator<Item = (S, Vec<f32>)>,
		S: Into<String>,
	{
		Self {
			table: entries.into_iter().map(|(text, vec)| (text.into(), vec)).collect(),
			..Self::default()
		}
	}

	/// Every call sleeps for `delay` before answering.
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl EmbeddingProvider for StaticEmbedding {
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);

			if let Some(delay) = self.delay {
				tokio::time::sleep(delay).await;
			}

			texts
				.iter()
				.map(|text| {
					self.table.get(text).cloned().ok_or_else(|| Error::Provider {
						message: format!("No embedding for {text:?}."),
					})
				})
				.collect()
		})
	}
}

pub struct FailingEmbedding;
impl EmbeddingProvider for FailingEmbedding {
	fn embed<'a>(&'a self, _texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async {
			Err(Error::Provider { message: "Embedding backend is down.".to_string() })
		})
	}
}

/// Answers with pre-registered intents keyed by the exact input text.
#[derive(Default)]
pub struct ScriptedParser {
	intents: HashMap<String, ParsedIntent>,
	seen: Mutex<Vec<String>>,
}
impl ScriptedParser {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, input: impl Into<String>, intent: ParsedIntent) -> Self {
		let input = input.into();

		self.intents.insert(input.clone(), ParsedIntent { user_input: input, ..intent });

		self
	}

	/// Inputs received so far, in call order.
	pub fn seen(&self) -> Vec<String> {
		self.seen.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl IntentParser for ScriptedParser {
	fn parse<'a>(
		&'a self,
		user_input: &'a str,
		vocabulary: &'a [&'a str],
	) -> BoxFuture<'a, Result<ParsedIntent>> {
		Box::pin(async move {
			self.seen.lock().unwrap_or_else(|err| err.into_inner()).push(user_input.to_string());

			let Some(intent) = self.intents.get(user_input) else {
				return Err(Error::Parser { message: format!("No script for {user_input:?}.") });
			};
			let mut intent = intent.clone();

			intent.general_tags.retain(|tag| vocabulary.contains(&tag.as_str()));

			Ok(intent)
		})
	}
}

pub fn providers(embedding: impl EmbeddingProvider + 'static, parser: ScriptedParser) -> Providers {
	Providers::new(Arc::new(embedding), Arc::new(parser))
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub OffsetDateTime);
impl Clock for FixedClock {
	fn now_utc(&self) -> OffsetDateTime {
		self.0
	}
}

pub fn intent(general_tags: &[&str]) -> ParsedIntent {
	ParsedIntent {
		general_tags: general_tags.iter().map(|tag| tag.to_string()).collect(),
		..ParsedIntent::default()
	}
}

/// Fluent construction of restaurant fixtures.
pub struct RestaurantBuilder {
	inner: Restaurant,
}
impl RestaurantBuilder {
	pub fn new(id: &str, name: &str) -> Self {
		let inner =
			Restaurant { id: id.to_string(), name: name.to_string(), ..Restaurant::default() };

		Self { inner }
	}

	pub fn tags(mut self, tags: &[&str]) -> Self {
		self.inner.general_tags.extend(tags.iter().map(|tag| tag.to_string()));

		self
	}

	pub fn dish(mut self, text: &str, polarity: Polarity, embedding: Vec<f32>) -> Self {
		self.inner.specific_tags.push(SpecificTag::new(text, polarity).with_embedding(embedding));

		self
	}

	pub fn name_embedding(mut self, embedding: Vec<f32>) -> Self {
		self.inner.name_embedding = Some(embedding);

		self
	}

	pub fn hours(mut self, weekday: Weekday, open: &str, close: &str) -> Self {
		self.inner.business_hours.insert(
			models::weekday_key(weekday).to_string(),
			BusinessHours { open: Some(open.to_string()), close: Some(close.to_string()) },
		);

		self
	}

	pub fn build(self) -> RestaurantRef {
		Arc::new(self.inner)
	}
}

/// `count` plain restaurants with ids `r0..` and names `Restaurant 0..`.
pub fn plain_pool(count: usize) -> Vec<RestaurantRef> {
	(0..count)
		.map(|idx| {
			RestaurantBuilder::new(&format!("r{idx}"), &format!("Restaurant {idx}")).build()
		})
		.collect()
}
