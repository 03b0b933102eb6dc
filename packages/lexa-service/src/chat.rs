//! Conversational answers grounded in vector-retrieved passages.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use lexa_domain::{scope::Scope, text};

use crate::{
	Error, LexaService, Result,
	index::{Candidate, VectorQuery},
	search::filter,
	validate_scope, with_timeout,
};

pub const NO_SOURCES_ANSWER: &str = "I couldn't find relevant information in the uploaded documents. Please upload documents related to your question first.";
pub const GENERATION_FAILED_ANSWER: &str =
	"I found relevant documents but couldn't generate a response. Please try again.";

const CHAT_SYSTEM_PROMPT: &str = "\
You are Lexa, an intelligent document assistant. Answer using ONLY the provided documents.
Rules:
- Answer only from the documents.
- Cite every claim with its [Source N] marker.
- If the documents do not contain the answer, say: \"I couldn't find relevant information in the uploaded documents.\"
- Be concise (2-4 sentences).";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
	User,
	Assistant,
}
impl ChatRole {
	fn label(self) -> &'static str {
		match self {
			Self::User => "User",
			Self::Assistant => "Lexa",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
	pub role: ChatRole,
	pub content: String,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
	pub query: String,
	pub scope: Scope,
	/// Earlier turns, oldest first. Only the most recent ones reach the prompt.
	pub history: Vec<ChatTurn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSource {
	pub id: String,
	pub title: String,
	/// Vector similarity as a rounded percentage.
	pub score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
	pub answer: String,
	pub sources: Vec<ChatSource>,
	pub latency_ms: u64,
}

impl LexaService {
	pub async fn chat(&self, req: ChatRequest) -> Result<ChatResponse> {
		let started = Instant::now();
		let query = req.query.trim();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}

		validate_scope(&req.scope)?;

		let vector = self.embed_query(query).await?;
		let sources = self.chat_sources(&vector, &req.scope).await;

		if sources.is_empty() {
			return Ok(ChatResponse {
				answer: NO_SOURCES_ANSWER.to_string(),
				sources: Vec::new(),
				latency_ms: elapsed_ms(started),
			});
		}

		let context = build_chat_context(&sources, self.cfg.chat.max_source_chars as usize);
		let messages =
			build_chat_messages(query, &context, &req.history, self.cfg.chat.history_turns as usize);
		let cfg = &self.cfg.providers.llm_synthesis;
		let answer =
			match with_timeout(cfg.timeout_ms, self.providers.synthesis.complete(cfg, &messages))
				.await
			{
				Ok(answer) if !answer.trim().is_empty() => answer.trim().to_string(),
				Ok(_) => {
					tracing::warn!("Chat completion returned no text.");

					GENERATION_FAILED_ANSWER.to_string()
				},
				Err(err) => {
					tracing::warn!(error = %err, "Chat completion failed.");

					GENERATION_FAILED_ANSWER.to_string()
				},
			};

		Ok(ChatResponse {
			answer,
			sources: sources.iter().map(chat_source).collect(),
			latency_ms: elapsed_ms(started),
		})
	}

	/// Vector-only retrieval for chat. Failures yield no sources.
	async fn chat_sources(&self, vector: &[f32], scope: &Scope) -> Vec<Candidate> {
		let max_sources = self.cfg.chat.max_sources;
		let query = VectorQuery {
			vector,
			scope,
			category: None,
			candidate_count: max_sources.saturating_mul(self.cfg.search.candidate_breadth_multiplier),
			top_n: max_sources,
		};
		let mut hits = match with_timeout(
			self.cfg.search.retrieval_timeout_ms,
			self.indexes.vector.search(&query),
		)
		.await
		{
			Ok(hits) => hits,
			Err(err) => {
				tracing::warn!(error = %err, "Chat retrieval failed.");

				return Vec::new();
			},
		};

		if self.cfg.search.scope_enforced {
			let dropped = filter::retain_in_scope(&mut hits, scope);

			if dropped > 0 {
				tracing::warn!(dropped, scope = scope.label(), "Dropped out-of-scope candidates.");
			}
		}

		hits.truncate(max_sources as usize);

		hits
	}
}

fn build_chat_context(sources: &[Candidate], max_chars: usize) -> String {
	sources
		.iter()
		.enumerate()
		.map(|(idx, source)| {
			format!(
				"[Source {}] {}: {}",
				idx + 1,
				source.title,
				text::truncate_graphemes(&source.content, max_chars)
			)
		})
		.collect::<Vec<_>>()
		.join("\n\n")
}

fn build_chat_messages(
	query: &str,
	context: &str,
	history: &[ChatTurn],
	history_turns: usize,
) -> Vec<Value> {
	let recent = &history[history.len().saturating_sub(history_turns)..];
	let transcript = recent
		.iter()
		.map(|turn| format!("{}: {}", turn.role.label(), turn.content))
		.collect::<Vec<_>>()
		.join("\n");
	let mut user = String::new();

	if !transcript.is_empty() {
		user.push_str("Recent conversation:\n");
		user.push_str(&transcript);
		user.push_str("\n\n");
	}

	user.push_str("Retrieved documents:\n");
	user.push_str(context);
	user.push_str(&format!("\n\nUser question: \"{query}\""));

	vec![
		serde_json::json!({ "role": "system", "content": CHAT_SYSTEM_PROMPT }),
		serde_json::json!({ "role": "user", "content": user }),
	]
}

fn chat_source(candidate: &Candidate) -> ChatSource {
	ChatSource {
		id: candidate.passage_id.clone(),
		title: candidate.title.clone(),
		score: (candidate.score.clamp(0.0, 1.0) * 100.0).round() as u32,
	}
}

fn elapsed_ms(started: Instant) -> u64 {
	u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
