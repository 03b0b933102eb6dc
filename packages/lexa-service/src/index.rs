//! Vector and lexical retrieval seams and their default backends.

use std::collections::HashMap;

use qdrant_client::qdrant::{
	Query, QueryPointsBuilder, ScoredPoint, SearchParamsBuilder, Value,
	point_id::PointIdOptions, value::Kind,
};
use sqlx::PgPool;

use lexa_domain::{
	scope::{Scope, ScopeTag},
	text,
};
use lexa_storage::{
	models::LexicalHit,
	qdrant::{
		DENSE_VECTOR_NAME, PAYLOAD_CATEGORY, PAYLOAD_CHUNK_INDEX, PAYLOAD_CONTENT,
		PAYLOAD_ORGANIZATION_ID, PAYLOAD_PASSAGE_ID, PAYLOAD_SCOPE, PAYLOAD_TAGS, PAYLOAD_TITLE,
		PAYLOAD_TOTAL_CHUNKS, QdrantStore,
	},
	queries::{self, LexicalSearchArgs},
};

use crate::{BoxFuture, Error, Result, search::filter};

const MAX_FUZZY_TERMS: usize = 16;

/// A retrievable passage as returned by one index.
///
/// `score` is the index-native score: cosine similarity for the vector index, an unbounded rank
/// for the lexical index.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
	pub passage_id: String,
	pub scope: ScopeTag,
	pub title: String,
	pub content: String,
	pub category: Option<String>,
	pub tags: Vec<String>,
	pub chunk_index: i32,
	pub total_chunks: i32,
	pub score: f32,
}

#[derive(Debug, Clone)]
pub struct VectorQuery<'a> {
	pub vector: &'a [f32],
	pub scope: &'a Scope,
	pub category: Option<&'a str>,
	/// Approximate-nearest-neighbor breadth. Always larger than `top_n`.
	pub candidate_count: u32,
	pub top_n: u32,
}

#[derive(Debug, Clone)]
pub struct LexicalQuery<'a> {
	pub text: &'a str,
	pub scope: &'a Scope,
	pub category: Option<&'a str>,
	pub top_n: u32,
}

pub trait VectorIndex
where
	Self: Send + Sync,
{
	/// Nearest neighbors of `query.vector` inside `query.scope`, best first.
	fn search<'a>(&'a self, query: &'a VectorQuery<'a>) -> BoxFuture<'a, Result<Vec<Candidate>>>;
}

pub trait LexicalIndex
where
	Self: Send + Sync,
{
	/// Keyword and fuzzy matches of `query.text` inside `query.scope`, best first.
	fn search<'a>(
		&'a self,
		query: &'a LexicalQuery<'a>,
	) -> BoxFuture<'a, Result<Vec<Candidate>>>;
}

pub struct QdrantVectorIndex {
	store: QdrantStore,
}
impl QdrantVectorIndex {
	pub fn new(store: QdrantStore) -> Self {
		Self { store }
	}
}

impl VectorIndex for QdrantVectorIndex {
	fn search<'a>(&'a self, query: &'a VectorQuery<'a>) -> BoxFuture<'a, Result<Vec<Candidate>>> {
		Box::pin(async move {
			let search = QueryPointsBuilder::new(self.store.collection.clone())
				.query(Query::new_nearest(query.vector.to_vec()))
				.using(DENSE_VECTOR_NAME)
				.filter(filter::qdrant_scope_filter(query.scope, query.category))
				.params(SearchParamsBuilder::default().hnsw_ef(u64::from(query.candidate_count)))
				.limit(u64::from(query.top_n))
				.with_payload(true);
			let response = self
				.store
				.client
				.query(search)
				.await
				.map_err(|err| Error::Qdrant { message: err.to_string() })?;
			let candidates: Vec<Candidate> =
				response.result.iter().filter_map(candidate_from_point).collect();

			if candidates.len() < response.result.len() {
				tracing::warn!(
					dropped = response.result.len() - candidates.len(),
					"Qdrant returned points without a usable passage payload."
				);
			}

			Ok(candidates)
		})
	}
}

pub struct PgLexicalIndex {
	pool: PgPool,
	cfg: lexa_config::SearchLexical,
}
impl PgLexicalIndex {
	pub fn new(pool: PgPool, cfg: lexa_config::SearchLexical) -> Self {
		Self { pool, cfg }
	}
}

impl LexicalIndex for PgLexicalIndex {
	fn search<'a>(
		&'a self,
		query: &'a LexicalQuery<'a>,
	) -> BoxFuture<'a, Result<Vec<Candidate>>> {
		Box::pin(async move {
			let fuzzy_terms = fuzzy_terms(query.text, self.cfg.fuzzy_min_term_chars as usize);
			let hits = queries::search_passages_lexical(
				&self.pool,
				LexicalSearchArgs {
					query: query.text,
					fuzzy_terms: &fuzzy_terms,
					scope: query.scope.label(),
					organization_id: query.scope.organization_id(),
					category: query.category,
					title_boost: self.cfg.title_boost,
					fuzzy_max_edits: self.cfg.fuzzy_max_edits,
					limit: query.top_n,
				},
			)
			.await?;

			Ok(hits.into_iter().map(candidate_from_hit).collect())
		})
	}
}

/// Query terms long enough to be matched with edit distance.
fn fuzzy_terms(query: &str, min_chars: usize) -> Vec<String> {
	text::query_terms(query, MAX_FUZZY_TERMS)
		.into_iter()
		.filter(|term| term.chars().count() >= min_chars)
		.collect()
}

fn candidate_from_hit(hit: LexicalHit) -> Candidate {
	Candidate {
		passage_id: hit.passage_id,
		scope: ScopeTag { scope: hit.scope, organization_id: hit.organization_id },
		title: hit.title,
		content: hit.content,
		category: hit.category,
		tags: hit.tags,
		chunk_index: hit.chunk_index,
		total_chunks: hit.total_chunks,
		score: hit.lexical_score,
	}
}

fn candidate_from_point(point: &ScoredPoint) -> Option<Candidate> {
	let payload = &point.payload;
	let passage_id = payload_string(payload, PAYLOAD_PASSAGE_ID).or_else(|| {
		point.id.as_ref().and_then(|id| match &id.point_id_options {
			Some(PointIdOptions::Uuid(id)) => Some(id.clone()),
			Some(PointIdOptions::Num(id)) => Some(id.to_string()),
			None => None,
		})
	})?;

	Some(Candidate {
		passage_id,
		scope: ScopeTag {
			scope: payload_string(payload, PAYLOAD_SCOPE)?,
			organization_id: payload_string(payload, PAYLOAD_ORGANIZATION_ID),
		},
		title: payload_string(payload, PAYLOAD_TITLE).unwrap_or_default(),
		content: payload_string(payload, PAYLOAD_CONTENT)?,
		category: payload_string(payload, PAYLOAD_CATEGORY),
		tags: payload_strings(payload, PAYLOAD_TAGS),
		chunk_index: payload_i32(payload, PAYLOAD_CHUNK_INDEX).unwrap_or(0),
		total_chunks: payload_i32(payload, PAYLOAD_TOTAL_CHUNKS).unwrap_or(1),
		score: point.score,
	})
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		_ => None,
	}
}

fn payload_strings(payload: &HashMap<String, Value>, key: &str) -> Vec<String> {
	let Some(value) = payload.get(key) else {
		return Vec::new();
	};

	match &value.kind {
		Some(Kind::ListValue(list)) => list
			.values
			.iter()
			.filter_map(|item| match &item.kind {
				Some(Kind::StringValue(text)) => Some(text.to_string()),
				_ => None,
			})
			.collect(),
		_ => Vec::new(),
	}
}

fn payload_i32(payload: &HashMap<String, Value>, key: &str) -> Option<i32> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::IntegerValue(value)) => i32::try_from(*value).ok(),
		Some(Kind::DoubleValue(value)) =>
			if value.fract() == 0.0 {
				i32::try_from(*value as i64).ok()
			} else {
				None
			},
		_ => None,
	}
}
