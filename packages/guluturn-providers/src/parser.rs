use std::{collections::HashSet, time::Duration};

use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use guluturn_domain::models::{ParsedIntent, Polarity};

use crate::{Error, Result};

const MAX_ATTEMPTS: usize = 3;

const SYSTEM_PROMPT: &str = r#"You are the tagging backend of a restaurant recommendation service.
Read the user's sentence and return exactly one JSON object. No markdown, no comments, no extra text.

Schema:
{
  "user_input": "<the original sentence>",
  "general_tags": ["<tag>", ...],
  "specific_tags": [{ "tag": "<dish>", "polarity": "positive" }],
  "preferred_restaurants": ["<name>", ...]
}

general_tags:
- Choose only from the allowed list below, exact spelling. Never invent or alter tag names.
- Cover every preference, constraint and quality complaint the user actually expresses.
- If the user says a restaurant is closed, include "user_report_closed".

preferred_restaurants:
- Copy restaurant names or nicknames exactly as written. Do not translate them.
- Use [] when no name is mentioned.

specific_tags:
- Short, lowercase English dish names the user wants to eat, e.g. "beef noodles", "hot pot".
- Translate non-English dish names into idiomatic English.
- Polarity is always "positive". Express dislikes through general_tags instead.
- Do not repeat general tags or include flavour, price or portion words.

Allowed general_tags:
"#;

/// Client for an OpenAI-compatible chat completion endpoint that turns free text into intent.
#[derive(Clone, Debug)]
pub struct IntentParserClient {
	client: Client,
	cfg: guluturn_config::LlmProviderConfig,
}
impl IntentParserClient {
	pub fn new(cfg: guluturn_config::LlmProviderConfig) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;

		Ok(Self { client, cfg })
	}

	/// Malformed completions are retried up to three times; transport errors return at once.
	pub async fn parse(&self, user_input: &str, vocabulary: &[&str]) -> Result<ParsedIntent> {
		let url = format!("{}{}", self.cfg.api_base, self.cfg.path);
		let body = serde_json::json!({
			"model": self.cfg.model,
			"temperature": self.cfg.temperature,
			"messages": build_messages(user_input, vocabulary),
		});

		for attempt in 1..=MAX_ATTEMPTS {
			let res = self
				.client
				.post(&url)
				.headers(crate::auth_headers(&self.cfg.api_key, &self.cfg.default_headers)?)
				.json(&body)
				.send()
				.await?;
			let json: Value = res.error_for_status()?.json().await?;

			match parse_intent_response(json) {
				Ok(intent) => return Ok(normalize_intent(intent, user_input, vocabulary)),
				Err(err) => {
					warn!(attempt, error = %err, "Parser returned an unusable completion.");
				},
			}
		}

		Err(Error::InvalidResponse {
			message: format!("Parser response is not valid JSON after {MAX_ATTEMPTS} attempts."),
		})
	}
}

pub fn build_messages(user_input: &str, vocabulary: &[&str]) -> Vec<Value> {
	let allowed =
		vocabulary.iter().map(|tag| format!("\"{tag}\"")).collect::<Vec<_>>().join(", ");

	vec![
		serde_json::json!({ "role": "system", "content": format!("{SYSTEM_PROMPT}[{allowed}]") }),
		serde_json::json!({ "role": "user", "content": user_input }),
	]
}

fn parse_intent_response(json: Value) -> Result<ParsedIntent> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Parser response is missing message content.".to_string(),
		})?;

	Ok(serde_json::from_str(strip_code_fence(content))?)
}

fn strip_code_fence(content: &str) -> &str {
	let trimmed = content.trim();

	trimmed
		.strip_prefix("```json")
		.or_else(|| trimmed.strip_prefix("```"))
		.and_then(|rest| rest.strip_suffix("```"))
		.map(str::trim)
		.unwrap_or(trimmed)
}

/// Drops out-of-vocabulary general tags, forces dish polarity to positive, and trims names.
pub fn normalize_intent(
	mut intent: ParsedIntent,
	user_input: &str,
	vocabulary: &[&str],
) -> ParsedIntent {
	let allowed: HashSet<&str> = vocabulary.iter().copied().collect();
	let mut seen = HashSet::new();

	if intent.user_input.trim().is_empty() {
		intent.user_input = user_input.to_string();
	}

	intent.general_tags = intent
		.general_tags
		.into_iter()
		.map(|tag| tag.trim().to_string())
		.filter(|tag| allowed.contains(tag.as_str()) && seen.insert(tag.clone()))
		.collect();
	intent.specific_tags.retain(|tag| !tag.text.trim().is_empty());

	for tag in &mut intent.specific_tags {
		tag.text = tag.text.trim().to_string();
		tag.polarity = Polarity::Positive;
		tag.embedding = None;
	}

	seen.clear();

	intent.preferred_restaurant_names = intent
		.preferred_restaurant_names
		.into_iter()
		.map(|name| name.trim().to_string())
		.filter(|name| !name.is_empty() && seen.insert(name.clone()))
		.collect();

	intent
}
