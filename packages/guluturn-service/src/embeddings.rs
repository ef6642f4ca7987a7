use std::time::Duration;

use futures_util::future;
use tracing::warn;

use guluturn_domain::models::SpecificTag;

use crate::EmbeddingProvider;

/// Fail-soft embedding lookups: every text is requested on its own, under a timeout.
#[derive(Clone, Copy)]
pub struct EmbeddingLookup<'a> {
	provider: &'a dyn EmbeddingProvider,
	timeout: Duration,
}
impl<'a> EmbeddingLookup<'a> {
	pub fn new(provider: &'a dyn EmbeddingProvider, timeout: Duration) -> Self {
		Self { provider, timeout }
	}

	/// `None` when the provider fails, times out, or returns nothing usable.
	pub async fn embed_one(&self, text: &str) -> Option<Vec<f32>> {
		let texts = [text.to_string()];

		match tokio::time::timeout(self.timeout, self.provider.embed(&texts)).await {
			Ok(Ok(mut vectors)) => match vectors.pop() {
				Some(vec) if !vec.is_empty() => Some(vec),
				_ => {
					warn!(text, "Embedding provider returned no vector.");

					None
				},
			},
			Ok(Err(err)) => {
				warn!(text, error = %err, "Embedding lookup failed.");

				None
			},
			Err(_) => {
				warn!(
					text,
					timeout = ?self.timeout,
					"Embedding lookup timed out."
				);

				None
			},
		}
	}

	/// Concurrent `embed_one` over all texts, results in input order.
	pub async fn embed_many(&self, texts: &[String]) -> Vec<Option<Vec<f32>>> {
		future::join_all(texts.iter().map(|text| self.embed_one(text))).await
	}

	/// Fills in embeddings for tags that lack one. Failed lookups leave the tag unembedded.
	pub async fn fill_specific_tags(&self, tags: &mut [SpecificTag]) {
		let missing: Vec<usize> =
			(0..tags.len()).filter(|&idx| !tags[idx].has_embedding()).collect();

		if missing.is_empty() {
			return;
		}

		let texts: Vec<String> = missing.iter().map(|&idx| tags[idx].text.clone()).collect();
		let vectors = self.embed_many(&texts).await;

		for (idx, vec) in missing.into_iter().zip(vectors) {
			tags[idx].embedding = vec;
		}
	}
}
