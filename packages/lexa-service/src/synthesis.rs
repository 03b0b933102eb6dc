//! Answer synthesis over the top search results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};

use lexa_domain::text;
use lexa_storage::queries;

use crate::{BoxFuture, Error, LexaService, Result, search::fusion::FusedCandidate, with_timeout};

const STRUCTURED_SYSTEM_PROMPT: &str = "\
You are Lexa, a document intelligence assistant. Answer the user's query using only the supplied \
documents. Respond with one JSON object and nothing else, no markdown and no commentary, shaped as:
{\"answer\": \"one sentence that answers the query directly\", \
\"key_insights\": [\"...\"], \"risks\": [\"...\"], \"trends\": [\"...\"], \"confidence\": 85}
confidence is an integer between 0 and 100.";
const NARRATIVE_SYSTEM_PROMPT: &str = "\
You are Lexa, a document intelligence assistant. Summarize what the supplied documents say about \
the user's query in two or three plain sentences.";

/// An answer generated from the top results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Synthesis {
	Structured {
		answer: String,
		key_insights: Vec<String>,
		risks: Vec<String>,
		trends: Vec<String>,
		confidence: u8,
	},
	Narrative {
		text: String,
	},
}

/// Optional memoization of structured syntheses.
pub trait SynthesisCache
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Synthesis>>>;

	fn put<'a>(&'a self, key: &'a str, synthesis: &'a Synthesis) -> BoxFuture<'a, Result<()>>;
}

pub struct PgSynthesisCache {
	pool: PgPool,
	cfg: lexa_config::SynthesisCache,
}
impl PgSynthesisCache {
	pub fn new(pool: PgPool, cfg: lexa_config::SynthesisCache) -> Self {
		Self { pool, cfg }
	}
}

impl SynthesisCache for PgSynthesisCache {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Synthesis>>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();
			let Some(payload) = queries::fetch_cache_payload(&self.pool, key, now).await? else {
				return Ok(None);
			};

			serde_json::from_value(payload).map(Some).map_err(|err| Error::Storage {
				message: format!("Failed to decode cached synthesis: {err}"),
			})
		})
	}

	fn put<'a>(&'a self, key: &'a str, synthesis: &'a Synthesis) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let payload = serde_json::to_value(synthesis).map_err(|err| Error::Storage {
				message: format!("Failed to encode synthesis cache payload: {err}"),
			})?;
			let size = serde_json::to_vec(&payload)
				.map_err(|err| Error::Storage {
					message: format!("Failed to encode synthesis cache payload: {err}"),
				})?
				.len();

			if let Some(max) = self.cfg.max_payload_bytes
				&& size as u64 > max
			{
				tracing::info!(
					cache_key_prefix = cache_key_prefix(key),
					payload_size = size,
					"Synthesis cache payload too large. Skipping store."
				);

				return Ok(());
			}

			let now = OffsetDateTime::now_utc();
			let expires_at = now + Duration::seconds(self.cfg.ttl_secs);

			queries::store_cache_payload(&self.pool, key, &payload, now, expires_at).await?;

			Ok(())
		})
	}
}

#[derive(Debug, Deserialize)]
struct StructuredOutput {
	#[serde(alias = "intelligence")]
	answer: String,
	#[serde(default, alias = "keyInsights")]
	key_insights: Vec<String>,
	#[serde(default)]
	risks: Vec<String>,
	#[serde(default)]
	trends: Vec<String>,
	confidence: f64,
}

impl LexaService {
	/// Produces a synthesis for `query` from the head of `results`, or `None` when generation
	/// fails. Never returns an error.
	pub(crate) async fn synthesize(
		&self,
		query: &str,
		results: &[FusedCandidate],
	) -> Option<Synthesis> {
		let sources = &results[..results.len().min(self.cfg.synthesis.max_sources as usize)];

		if sources.is_empty() {
			return None;
		}

		let cache_key = match self.synthesis_cache.as_ref() {
			Some(_) => match self.synthesis_cache_key(query, sources) {
				Ok(key) => Some(key),
				Err(err) => {
					tracing::warn!(error = %err, "Synthesis cache key build failed.");

					None
				},
			},
			None => None,
		};

		let cache_timeout_ms = self.cfg.synthesis.cache.timeout_ms;

		if let (Some(cache), Some(key)) = (self.synthesis_cache.as_ref(), cache_key.as_deref()) {
			match with_timeout(cache_timeout_ms, cache.get(key)).await {
				Ok(Some(hit)) => {
					tracing::info!(cache_key_prefix = cache_key_prefix(key), "Synthesis cache hit.");

					return Some(hit);
				},
				Ok(None) => {
					tracing::info!(
						cache_key_prefix = cache_key_prefix(key),
						"Synthesis cache miss."
					);
				},
				Err(err) => {
					tracing::warn!(
						error = %err,
						cache_key_prefix = cache_key_prefix(key),
						"Synthesis cache read failed."
					);
				},
			}
		}

		let context = build_context(sources, self.cfg.synthesis.max_source_chars as usize);
		let synthesis = self.generate(query, &context).await?;

		if let (Some(cache), Some(key)) = (self.synthesis_cache.as_ref(), cache_key.as_deref())
			&& matches!(synthesis, Synthesis::Structured { .. })
			&& let Err(err) = with_timeout(cache_timeout_ms, cache.put(key, &synthesis)).await
		{
			tracing::warn!(
				error = %err,
				cache_key_prefix = cache_key_prefix(key),
				"Synthesis cache write failed."
			);
		}

		Some(synthesis)
	}

	/// One structured attempt, then at most one narrative attempt.
	async fn generate(&self, query: &str, context: &str) -> Option<Synthesis> {
		let cfg = &self.cfg.providers.llm_synthesis;
		let messages = build_messages(STRUCTURED_SYSTEM_PROMPT, query, context);

		match with_timeout(cfg.timeout_ms, self.providers.synthesis.complete(cfg, &messages)).await
		{
			Ok(raw) => match parse_structured(&raw) {
				Some(synthesis) => return Some(synthesis),
				None => tracing::warn!("Structured synthesis output is malformed. Retrying as narrative."),
			},
			Err(err) => {
				tracing::warn!(error = %err, "Structured synthesis failed. Retrying as narrative.");
			},
		}

		let messages = build_messages(NARRATIVE_SYSTEM_PROMPT, query, context);

		match with_timeout(cfg.timeout_ms, self.providers.synthesis.complete(cfg, &messages)).await
		{
			Ok(raw) if !raw.trim().is_empty() =>
				Some(Synthesis::Narrative { text: raw.trim().to_string() }),
			Ok(_) => {
				tracing::warn!("Narrative synthesis returned no text.");

				None
			},
			Err(err) => {
				tracing::warn!(error = %err, "Narrative synthesis failed.");

				None
			},
		}
	}

	fn synthesis_cache_key(&self, query: &str, sources: &[FusedCandidate]) -> Result<String> {
		let cfg = &self.cfg.providers.llm_synthesis;

		build_cache_key(
			query,
			sources.iter().map(|item| item.candidate.passage_id.as_str()),
			cfg.provider_id.as_str(),
			cfg.model.as_str(),
		)
	}
}

/// `[Source N] title: text` blocks, one per source, each text cut to `max_chars` graphemes.
pub(crate) fn build_context(sources: &[FusedCandidate], max_chars: usize) -> String {
	sources
		.iter()
		.enumerate()
		.map(|(idx, item)| {
			format!(
				"[Source {}] {}: {}",
				idx + 1,
				item.candidate.title,
				text::truncate_graphemes(&item.candidate.content, max_chars)
			)
		})
		.collect::<Vec<_>>()
		.join("\n\n")
}

fn build_messages(system: &str, query: &str, context: &str) -> Vec<Value> {
	vec![
		serde_json::json!({ "role": "system", "content": system }),
		serde_json::json!({
			"role": "user",
			"content": format!("Query: \"{query}\"\n\nDocuments:\n{context}"),
		}),
	]
}

/// Parses a structured answer, tolerating surrounding code fences.
///
/// A blank answer or a confidence outside 0..=100 counts as malformed.
pub(crate) fn parse_structured(raw: &str) -> Option<Synthesis> {
	let output: StructuredOutput = serde_json::from_str(strip_code_fence(raw)).ok()?;
	let answer = output.answer.trim();

	if answer.is_empty() || !(0.0..=100.0).contains(&output.confidence) {
		return None;
	}

	Some(Synthesis::Structured {
		answer: answer.to_string(),
		key_insights: output.key_insights,
		risks: output.risks,
		trends: output.trends,
		confidence: output.confidence.round() as u8,
	})
}

fn strip_code_fence(raw: &str) -> &str {
	let trimmed = raw.trim();
	let Some(body) = trimmed.strip_prefix("```") else {
		return trimmed;
	};
	let body = body.strip_prefix("json").unwrap_or(body);

	body.strip_suffix("```").unwrap_or(body).trim()
}

pub(crate) fn build_cache_key<'a>(
	query: &str,
	passage_ids: impl Iterator<Item = &'a str>,
	provider_id: &str,
	model: &str,
) -> Result<String> {
	let mut ids: Vec<&str> = passage_ids.collect();

	ids.sort_unstable();
	ids.dedup();

	let payload = serde_json::json!({
		"kind": "synthesis",
		"normalized_query": text::normalize_query(query),
		"passage_ids": ids,
		"provider_id": provider_id,
		"model": model,
	});
	let raw = serde_json::to_vec(&payload).map_err(|err| Error::Storage {
		message: format!("Failed to encode cache key payload: {err}"),
	})?;

	Ok(blake3::hash(&raw).to_hex().to_string())
}

pub(crate) fn cache_key_prefix(key: &str) -> &str {
	let len = key.len().min(12);

	&key[..len]
}
