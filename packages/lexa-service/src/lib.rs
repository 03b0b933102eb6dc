pub mod chat;
pub mod index;
pub mod search;
pub mod suggest;
pub mod synthesis;
pub mod telemetry;

mod error;

pub use chat::{ChatRequest, ChatResponse, ChatRole, ChatSource, ChatTurn};
pub use error::{Error, Result};
pub use index::{
	Candidate, LexicalIndex, LexicalQuery, PgLexicalIndex, QdrantVectorIndex, VectorIndex,
	VectorQuery,
};
pub use lexa_domain::scope::{Scope, ScopeTag};
pub use search::{SearchItem, SearchMeta, SearchMode, SearchRequest, SearchResponse};
pub use suggest::{SuggestRequest, SuggestResponse};
pub use synthesis::{PgSynthesisCache, Synthesis, SynthesisCache};
pub use telemetry::{PgTelemetry, QueryRecord, TelemetrySink};

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use serde_json::Value;

use lexa_config::{Config, EmbeddingProviderConfig, LlmProviderConfig, ProviderConfig};
use lexa_providers::{embedding, llm, rerank};
use lexa_storage::{db::Db, qdrant::QdrantStore};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Cross-scores fused candidates against the query.
///
/// The returned scores are index-aligned with `docs`. `None` means the provider did not score
/// that document and its prior score stays in effect.
pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [RerankDocument],
	) -> BoxFuture<'a, Result<Vec<Option<f32>>>>;
}

pub trait SynthesisProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<String>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RerankDocument {
	pub passage_id: String,
	pub text: String,
	pub fused_score: f32,
	pub vector_score: Option<f32>,
	pub lexical_score: Option<f32>,
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub rerank: Arc<dyn RerankProvider>,
	pub synthesis: Arc<dyn SynthesisProvider>,
}

/// Retrieval backends. A missing lexical index puts every search in vector-only mode.
#[derive(Clone)]
pub struct Indexes {
	pub vector: Arc<dyn VectorIndex>,
	pub lexical: Option<Arc<dyn LexicalIndex>>,
}

pub struct LexaService {
	pub cfg: Config,
	pub providers: Providers,
	pub indexes: Indexes,
	pub telemetry: Option<Arc<dyn TelemetrySink>>,
	pub synthesis_cache: Option<Arc<dyn SynthesisCache>>,
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}

impl RerankProvider for DefaultProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [RerankDocument],
	) -> BoxFuture<'a, Result<Vec<Option<f32>>>> {
		Box::pin(async move {
			let texts: Vec<String> = docs.iter().map(|doc| doc.text.clone()).collect();

			Ok(rerank::rerank(cfg, query, &texts).await?)
		})
	}
}

impl SynthesisProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Ok(llm::complete(cfg, messages).await?) })
	}
}

impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		rerank: Arc<dyn RerankProvider>,
		synthesis: Arc<dyn SynthesisProvider>,
	) -> Self {
		Self { embedding, rerank, synthesis }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), rerank: provider.clone(), synthesis: provider }
	}
}

impl LexaService {
	/// Wires the HTTP providers, Qdrant, and Postgres backends selected by `cfg`.
	pub fn new(cfg: Config, db: Db, qdrant: QdrantStore) -> Self {
		let pool = db.pool;
		let lexical = if cfg.search.lexical.enabled {
			Some(Arc::new(PgLexicalIndex::new(pool.clone(), cfg.search.lexical.clone()))
				as Arc<dyn LexicalIndex>)
		} else {
			None
		};
		let telemetry = if cfg.telemetry.enabled {
			Some(Arc::new(PgTelemetry::new(pool.clone())) as Arc<dyn TelemetrySink>)
		} else {
			None
		};
		let synthesis_cache = if cfg.synthesis.cache.enabled {
			Some(Arc::new(PgSynthesisCache::new(pool, cfg.synthesis.cache.clone()))
				as Arc<dyn SynthesisCache>)
		} else {
			None
		};
		let indexes = Indexes { vector: Arc::new(QdrantVectorIndex::new(qdrant)), lexical };

		Self { cfg, providers: Providers::default(), indexes, telemetry, synthesis_cache }
	}

	/// Builds a service from explicit parts, without telemetry or a synthesis cache.
	pub fn with_parts(cfg: Config, providers: Providers, indexes: Indexes) -> Self {
		Self { cfg, providers, indexes, telemetry: None, synthesis_cache: None }
	}

	pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
		self.telemetry = Some(telemetry);

		self
	}

	pub fn with_synthesis_cache(mut self, cache: Arc<dyn SynthesisCache>) -> Self {
		self.synthesis_cache = Some(cache);

		self
	}

	/// Embeds one query text. Any failure, including a timeout or a wrong-sized vector, is
	/// reported as `EmbeddingUnavailable`.
	pub(crate) async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
		let cfg = &self.cfg.providers.embedding;
		let texts = [query.to_string()];
		let embedded = with_timeout(cfg.timeout_ms, self.providers.embedding.embed(cfg, &texts))
			.await
			.map_err(|err| Error::EmbeddingUnavailable { message: err.to_string() })?;
		let vector = embedded.into_iter().next().ok_or_else(|| Error::EmbeddingUnavailable {
			message: "Embedding provider returned no vectors.".to_string(),
		})?;

		if vector.len() != self.cfg.storage.qdrant.vector_dim as usize {
			return Err(Error::EmbeddingUnavailable {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		Ok(vector)
	}
}

/// Runs `fut` with an upper bound; expiry is reported like any other provider failure.
pub(crate) async fn with_timeout<T, F>(timeout_ms: u64, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
		Ok(result) => result,
		Err(_) => Err(Error::Provider { message: format!("Timed out after {timeout_ms} ms.") }),
	}
}

pub(crate) fn validate_scope(scope: &Scope) -> Result<()> {
	if let Scope::Organization { organization_id } = scope
		&& organization_id.trim().is_empty()
	{
		return Err(Error::InvalidRequest {
			message: "organization_id must be non-empty.".to_string(),
		});
	}

	Ok(())
}
