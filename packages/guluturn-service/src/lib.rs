pub mod compose;
pub mod embeddings;
pub mod record;
pub mod session;

mod error;

pub use error::{Error, Result};
pub use record::{
	AcceptedRestaurant, CandidateSnapshot, RoundFeedback, RoundRecord, SessionOutcome,
	SessionRecord,
};
pub use session::{RejectOutcome, SessionOrchestrator, SessionPhase, SessionState};

use std::{future::Future, pin::Pin, sync::Arc};

use guluturn_config::Config;
use guluturn_domain::models::ParsedIntent;
use guluturn_providers::{embedding::EmbeddingClient, parser::IntentParserClient};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	/// One vector per input text, in input order.
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

pub trait IntentParser
where
	Self: Send + Sync,
{
	/// General tags in the result must come from `vocabulary`.
	fn parse<'a>(
		&'a self,
		user_input: &'a str,
		vocabulary: &'a [&'a str],
	) -> BoxFuture<'a, Result<ParsedIntent>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub parser: Arc<dyn IntentParser>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, parser: Arc<dyn IntentParser>) -> Self {
		Self { embedding, parser }
	}

	/// HTTP adapters built from `[providers]`.
	pub fn from_config(cfg: &Config) -> Result<Self> {
		let embedding = EmbeddingClient::new(cfg.providers.embedding.clone())?;
		let parser = IntentParserClient::new(cfg.providers.parser.clone())?;

		Ok(Self::new(Arc::new(embedding), Arc::new(parser)))
	}
}

impl EmbeddingProvider for EmbeddingClient {
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(EmbeddingClient::embed(self, texts).await?) })
	}
}

impl IntentParser for IntentParserClient {
	fn parse<'a>(
		&'a self,
		user_input: &'a str,
		vocabulary: &'a [&'a str],
	) -> BoxFuture<'a, Result<ParsedIntent>> {
		Box::pin(async move {
			IntentParserClient::parse(self, user_input, vocabulary)
				.await
				.map_err(|err| Error::Parser { message: err.to_string() })
		})
	}
}
