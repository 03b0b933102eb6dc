use serde_json::Value;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::{
	Error, Result,
	models::{LexicalHit, QueryHistoryRecord, QuerySuggestion},
};

/// Weight of a fully fuzzy-matched query against body text, on the `ts_rank` scale.
pub const FUZZY_MATCH_WEIGHT: f32 = 0.1;

pub struct LexicalSearchArgs<'a> {
	pub query: &'a str,
	pub fuzzy_terms: &'a [String],
	pub scope: &'a str,
	pub organization_id: Option<&'a str>,
	pub category: Option<&'a str>,
	pub title_boost: f32,
	pub fuzzy_max_edits: u32,
	pub limit: u32,
}

/// Full-text search over `passages`.
///
/// Title matches are weighted by `title_boost`; body text adds its own rank plus a fuzzy term
/// bonus for query terms within `fuzzy_max_edits` of a body word. Only rows of the given scope
/// are considered.
pub async fn search_passages_lexical(
	pool: &PgPool,
	args: LexicalSearchArgs<'_>,
) -> Result<Vec<LexicalHit>> {
	if args.query.trim().is_empty() {
		return Err(Error::InvalidArgument("Lexical query must be non-empty.".to_string()));
	}
	if args.limit == 0 {
		return Ok(Vec::new());
	}

	let hits = sqlx::query_as::<_, LexicalHit>(
		"\
WITH q AS (
	SELECT websearch_to_tsquery('english', $1) AS tsq
)
SELECT
	p.passage_id,
	p.scope,
	p.organization_id,
	p.title,
	p.content,
	p.category,
	p.tags,
	p.chunk_index,
	p.total_chunks,
	scored.lexical_score
FROM passages p
CROSS JOIN q
CROSS JOIN LATERAL (
	SELECT
		(
			$2::real * ts_rank(p.title_tsv, q.tsq)
			+ ts_rank(p.content_tsv, q.tsq)
			+ $9::real * (
				SELECT count(*)::real
				FROM unnest($7::text[]) AS term
				WHERE EXISTS (
					SELECT 1
					FROM unnest(tsvector_to_array(to_tsvector('simple', p.content))) AS word
					WHERE levenshtein_less_equal(word, term, $8) <= $8
				)
			) / greatest(cardinality($7::text[]), 1)
		)::real AS lexical_score
) scored
WHERE p.scope = $3
	AND p.organization_id IS NOT DISTINCT FROM $4
	AND ($5::text IS NULL OR p.category = $5)
	AND scored.lexical_score > 0
ORDER BY scored.lexical_score DESC, p.passage_id ASC
LIMIT $6",
	)
	.bind(args.query)
	.bind(args.title_boost)
	.bind(args.scope)
	.bind(args.organization_id)
	.bind(args.category)
	.bind(i64::from(args.limit))
	.bind(args.fuzzy_terms)
	.bind(args.fuzzy_max_edits as i32)
	.bind(FUZZY_MATCH_WEIGHT)
	.fetch_all(pool)
	.await?;

	Ok(hits)
}

pub async fn insert_query_history(pool: &PgPool, record: &QueryHistoryRecord) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO query_history (
	query_id,
	query,
	scope,
	organization_id,
	category,
	result_count,
	latency_ms,
	search_mode,
	rerank_used,
	synthesis_used,
	created_at
)
VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)",
	)
	.bind(record.query_id)
	.bind(record.query.as_str())
	.bind(record.scope.as_str())
	.bind(record.organization_id.as_deref())
	.bind(record.category.as_deref())
	.bind(record.result_count)
	.bind(record.latency_ms)
	.bind(record.search_mode.as_str())
	.bind(record.rerank_used)
	.bind(record.synthesis_used)
	.bind(record.created_at)
	.execute(pool)
	.await?;

	Ok(())
}

/// Most frequent past queries of one scope that contain `needle`, case-insensitively.
pub async fn suggest_queries(
	pool: &PgPool,
	needle: &str,
	scope: &str,
	organization_id: Option<&str>,
	limit: u32,
) -> Result<Vec<QuerySuggestion>> {
	let pattern = format!("%{}%", escape_like(needle));
	let rows = sqlx::query_as::<_, QuerySuggestion>(
		"\
SELECT query, count(*) AS uses
FROM query_history
WHERE scope = $1
	AND organization_id IS NOT DISTINCT FROM $2
	AND query ILIKE $3 ESCAPE '\\'
GROUP BY query
ORDER BY uses DESC, query ASC
LIMIT $4",
	)
	.bind(scope)
	.bind(organization_id)
	.bind(pattern)
	.bind(i64::from(limit))
	.fetch_all(pool)
	.await?;

	Ok(rows)
}

pub async fn fetch_cache_payload(
	pool: &PgPool,
	cache_key: &str,
	now: OffsetDateTime,
) -> Result<Option<Value>> {
	let payload = sqlx::query_scalar::<_, Value>(
		"SELECT payload FROM synthesis_cache WHERE cache_key = $1 AND expires_at > $2",
	)
	.bind(cache_key)
	.bind(now)
	.fetch_optional(pool)
	.await?;

	Ok(payload)
}

pub async fn store_cache_payload(
	pool: &PgPool,
	cache_key: &str,
	payload: &Value,
	created_at: OffsetDateTime,
	expires_at: OffsetDateTime,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO synthesis_cache (cache_key, payload, created_at, expires_at)
VALUES ($1,$2,$3,$4)
ON CONFLICT (cache_key) DO UPDATE
SET payload = EXCLUDED.payload,
	created_at = EXCLUDED.created_at,
	expires_at = EXCLUDED.expires_at",
	)
	.bind(cache_key)
	.bind(payload)
	.bind(created_at)
	.bind(expires_at)
	.execute(pool)
	.await?;

	Ok(())
}

fn escape_like(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());

	for ch in raw.chars() {
		if matches!(ch, '%' | '_' | '\\') {
			out.push('\\');
		}

		out.push(ch);
	}

	out
}
