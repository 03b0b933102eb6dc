use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LexicalHit {
	pub passage_id: String,
	pub scope: String,
	pub organization_id: Option<String>,
	pub title: String,
	pub content: String,
	pub category: Option<String>,
	pub tags: Vec<String>,
	pub chunk_index: i32,
	pub total_chunks: i32,
	pub lexical_score: f32,
}

#[derive(Debug, Clone)]
pub struct QueryHistoryRecord {
	pub query_id: Uuid,
	pub query: String,
	pub scope: String,
	pub organization_id: Option<String>,
	pub category: Option<String>,
	pub result_count: i32,
	pub latency_ms: i64,
	pub search_mode: String,
	pub rerank_used: bool,
	pub synthesis_used: bool,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuerySuggestion {
	pub query: String,
	pub uses: i64,
}
