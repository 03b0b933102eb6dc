use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub synthesis: Synthesis,
	#[serde(default)]
	pub chat: Chat,
	#[serde(default)]
	pub telemetry: Telemetry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub rerank: ProviderConfig,
	pub llm_synthesis: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
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

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
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

/// Pipeline switches and fusion parameters for `LexaService::search`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Search {
	pub default_limit: u32,
	pub max_limit: u32,
	/// Drop any retrieved candidate whose scope tag does not match the query scope.
	/// Index-level filters are always applied.
	pub scope_enforced: bool,
	pub rerank_enabled: bool,
	pub synthesis_enabled: bool,
	pub rrf_k: u32,
	/// Approximate-nearest-neighbor breadth, as a multiple of the requested limit.
	pub candidate_breadth_multiplier: u32,
	/// Per-retriever result count, as a multiple of the requested limit.
	pub retrieval_limit_multiplier: u32,
	/// Upper bound for each index query, in milliseconds.
	pub retrieval_timeout_ms: u64,
	pub lexical: SearchLexical,
	pub rerank: SearchRerank,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_limit: 10,
			max_limit: 50,
			scope_enforced: true,
			rerank_enabled: true,
			synthesis_enabled: true,
			rrf_k: 60,
			candidate_breadth_multiplier: 20,
			retrieval_limit_multiplier: 2,
			retrieval_timeout_ms: 10_000,
			lexical: SearchLexical::default(),
			rerank: SearchRerank::default(),
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchLexical {
	pub enabled: bool,
	pub title_boost: f32,
	pub fuzzy_max_edits: u32,
	pub fuzzy_min_term_chars: u32,
}
impl Default for SearchLexical {
	fn default() -> Self {
		Self { enabled: true, title_boost: 3.0, fuzzy_max_edits: 1, fuzzy_min_term_chars: 4 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchRerank {
	/// Number of fused candidates sent to the reranker.
	pub window: u32,
	/// Number of results kept after a successful rerank.
	pub top_n: u32,
	pub max_doc_chars: u32,
}
impl Default for SearchRerank {
	fn default() -> Self {
		Self { window: 10, top_n: 5, max_doc_chars: 512 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Synthesis {
	pub max_sources: u32,
	pub max_source_chars: u32,
	pub cache: SynthesisCache,
}
impl Default for Synthesis {
	fn default() -> Self {
		Self { max_sources: 5, max_source_chars: 400, cache: SynthesisCache::default() }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SynthesisCache {
	pub enabled: bool,
	pub ttl_secs: i64,
	pub max_payload_bytes: Option<u64>,
	/// Upper bound for each cache read or write, in milliseconds.
	pub timeout_ms: u64,
}
impl Default for SynthesisCache {
	fn default() -> Self {
		Self { enabled: false, ttl_secs: 3_600, max_payload_bytes: Some(65_536), timeout_ms: 500 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Chat {
	pub max_sources: u32,
	pub max_source_chars: u32,
	pub history_turns: u32,
}
impl Default for Chat {
	fn default() -> Self {
		Self { max_sources: 5, max_source_chars: 500, history_turns: 6 }
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Telemetry {
	pub enabled: bool,
}
impl Default for Telemetry {
	fn default() -> Self {
		Self { enabled: true }
	}
}
