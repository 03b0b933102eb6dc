pub mod fusion;

pub(crate) mod filter;
pub(crate) mod rerank;

use std::time::Instant;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use lexa_domain::scope::Scope;

use self::fusion::FusedCandidate;
use crate::{
	Error, LexaService, Result,
	index::{Candidate, LexicalQuery, VectorQuery},
	synthesis::Synthesis,
	telemetry::QueryRecord,
	validate_scope, with_timeout,
};

#[derive(Debug, Clone)]
pub struct SearchRequest {
	pub query: String,
	/// Resolved upstream and trusted as-is.
	pub scope: Scope,
	pub limit: Option<u32>,
	pub category: Option<String>,
	pub synthesize: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchMode {
	#[serde(rename = "HYBRID")]
	Hybrid,
	#[serde(rename = "VECTOR-ONLY")]
	VectorOnly,
}
impl SearchMode {
	pub fn from_lexical_hits(lexical_hits: usize) -> Self {
		if lexical_hits > 0 { Self::Hybrid } else { Self::VectorOnly }
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Hybrid => "HYBRID",
			Self::VectorOnly => "VECTOR-ONLY",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchItem {
	pub id: String,
	pub title: String,
	pub content: String,
	pub category: Option<String>,
	pub tags: Vec<String>,
	pub chunk_index: i32,
	pub total_chunks: i32,
	/// The score the result is ordered by: the rerank score when present, else the fused score.
	pub score: f32,
	pub fused_score: f32,
	pub vector_score: Option<f32>,
	pub lexical_score: Option<f32>,
	pub rerank_score: Option<f32>,
}
impl From<FusedCandidate> for SearchItem {
	fn from(item: FusedCandidate) -> Self {
		let score = item.ranking_score();
		let FusedCandidate { candidate, fused_score, vector_score, lexical_score, rerank_score } =
			item;

		Self {
			id: candidate.passage_id,
			title: candidate.title,
			content: candidate.content,
			category: candidate.category,
			tags: candidate.tags,
			chunk_index: candidate.chunk_index,
			total_chunks: candidate.total_chunks,
			score,
			fused_score,
			vector_score,
			lexical_score,
			rerank_score,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMeta {
	pub total: usize,
	pub latency_ms: u64,
	pub vector_hits: usize,
	pub lexical_hits: usize,
	pub mode: SearchMode,
	pub rerank_used: bool,
	pub synthesis_used: bool,
	pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
	pub query: String,
	pub results: Vec<SearchItem>,
	pub synthesis: Option<Synthesis>,
	pub meta: SearchMeta,
}

struct Retrieved {
	vector: Vec<Candidate>,
	lexical: Vec<Candidate>,
}

impl LexaService {
	/// Hybrid search: embed, retrieve from both indexes, fuse, rerank, and synthesize.
	///
	/// Only invalid input and an unavailable embedding are reported as errors. Retrieval, rerank
	/// and synthesis failures shrink the response instead and show up in `SearchMeta`.
	pub async fn search(&self, req: SearchRequest) -> Result<SearchResponse> {
		let started = Instant::now();
		let query = req.query.trim();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}

		validate_scope(&req.scope)?;

		let limit = self.resolve_limit(req.limit)?;
		let category = req.category.as_deref().map(str::trim).filter(|value| !value.is_empty());
		let vector = self.embed_query(query).await?;
		let Retrieved { vector: vector_hits, lexical: lexical_hits } =
			self.retrieve(query, &vector, &req.scope, category, limit).await;
		let vector_count = vector_hits.len();
		let lexical_count = lexical_hits.len();
		let mut results =
			fusion::fuse(vector_hits, lexical_hits, self.cfg.search.rrf_k, limit as usize);
		let rerank_used = if self.cfg.search.rerank_enabled && !results.is_empty() {
			self.rerank(query, &mut results).await
		} else {
			false
		};
		let wants_synthesis = req.synthesize && self.cfg.search.synthesis_enabled;
		let synthesis = if wants_synthesis && !results.is_empty() {
			self.synthesize(query, &results).await
		} else {
			None
		};
		let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
		let meta = SearchMeta {
			total: results.len(),
			latency_ms,
			vector_hits: vector_count,
			lexical_hits: lexical_count,
			mode: SearchMode::from_lexical_hits(lexical_count),
			rerank_used,
			synthesis_used: synthesis.is_some(),
			scope: req.scope.label().to_string(),
		};

		tracing::info!(
			vector_hits = meta.vector_hits,
			lexical_hits = meta.lexical_hits,
			total = meta.total,
			mode = meta.mode.as_str(),
			rerank_used,
			synthesis_used = meta.synthesis_used,
			latency_ms,
			"Search completed."
		);

		self.record_query(QueryRecord {
			query: query.to_string(),
			scope: req.scope.clone(),
			category: category.map(str::to_string),
			result_count: u32::try_from(meta.total).unwrap_or(u32::MAX),
			latency_ms,
			mode: meta.mode,
			rerank_used,
			synthesis_used: meta.synthesis_used,
			recorded_at: OffsetDateTime::now_utc(),
		});

		Ok(SearchResponse {
			query: query.to_string(),
			results: results.into_iter().map(SearchItem::from).collect(),
			synthesis,
			meta,
		})
	}

	fn resolve_limit(&self, requested: Option<u32>) -> Result<u32> {
		let max = self.cfg.search.max_limit;

		match requested {
			None => Ok(self.cfg.search.default_limit),
			Some(limit) if (1..=max).contains(&limit) => Ok(limit),
			Some(_) => Err(Error::InvalidRequest {
				message: format!("limit must be between 1 and {max}."),
			}),
		}
	}

	/// Queries both indexes concurrently. A failed or timed-out index contributes no candidates.
	async fn retrieve(
		&self,
		query: &str,
		vector: &[f32],
		scope: &Scope,
		category: Option<&str>,
		limit: u32,
	) -> Retrieved {
		let cfg = &self.cfg.search;
		let top_n = limit.saturating_mul(cfg.retrieval_limit_multiplier);
		let vector_query = VectorQuery {
			vector,
			scope,
			category,
			candidate_count: limit.saturating_mul(cfg.candidate_breadth_multiplier),
			top_n,
		};
		let lexical_query = LexicalQuery { text: query, scope, category, top_n };
		let lexical_index = self.indexes.lexical.as_ref().filter(|_| cfg.lexical.enabled);
		let vector_search =
			with_timeout(cfg.retrieval_timeout_ms, self.indexes.vector.search(&vector_query));
		let lexical_search = async {
			match lexical_index {
				Some(index) =>
					with_timeout(cfg.retrieval_timeout_ms, index.search(&lexical_query)).await,
				None => Ok(Vec::new()),
			}
		};
		let (vector_result, lexical_result) = tokio::join!(vector_search, lexical_search);
		let mut vector_hits = vector_result.unwrap_or_else(|err| {
			tracing::warn!(error = %err, "Vector retrieval failed. Continuing without it.");

			Vec::new()
		});
		let mut lexical_hits = lexical_result.unwrap_or_else(|err| {
			tracing::warn!(error = %err, "Lexical retrieval failed. Continuing without it.");

			Vec::new()
		});

		if cfg.scope_enforced {
			let dropped = filter::retain_in_scope(&mut vector_hits, scope)
				+ filter::retain_in_scope(&mut lexical_hits, scope);

			if dropped > 0 {
				tracing::warn!(dropped, scope = scope.label(), "Dropped out-of-scope candidates.");
			}
		}

		Retrieved { vector: vector_hits, lexical: lexical_hits }
	}

	/// Reranks the head of `results` in place. Returns whether rerank scores were applied.
	async fn rerank(&self, query: &str, results: &mut Vec<FusedCandidate>) -> bool {
		let cfg = &self.cfg.search.rerank;
		let provider_cfg = &self.cfg.providers.rerank;
		let docs = rerank::rerank_documents(results, cfg.window as usize, cfg.max_doc_chars as usize);
		let scores = match with_timeout(
			provider_cfg.timeout_ms,
			self.providers.rerank.rerank(provider_cfg, query, &docs),
		)
		.await
		{
			Ok(scores) => scores,
			Err(err) => {
				tracing::warn!(error = %err, "Rerank failed. Keeping fused order.");

				return false;
			},
		};

		if scores.len() != docs.len() {
			tracing::warn!(
				expected = docs.len(),
				actual = scores.len(),
				"Rerank provider returned a mismatched score count. Keeping fused order."
			);

			return false;
		}

		let applied = rerank::apply_rerank_scores(results, &scores, cfg.top_n as usize);

		if !applied {
			tracing::info!("Rerank provider scored no documents. Keeping fused order.");
		}

		applied
	}
}
