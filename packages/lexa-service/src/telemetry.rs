use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use lexa_domain::scope::Scope;
use lexa_storage::{models::QueryHistoryRecord, queries};

use crate::{BoxFuture, LexaService, Result, search::SearchMode};

/// One completed search, as written to the query history.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRecord {
	pub query: String,
	pub scope: Scope,
	pub category: Option<String>,
	pub result_count: u32,
	pub latency_ms: u64,
	pub mode: SearchMode,
	pub rerank_used: bool,
	pub synthesis_used: bool,
	pub recorded_at: OffsetDateTime,
}

/// Query history: written after each search, read back for suggestions.
pub trait TelemetrySink
where
	Self: Send + Sync,
{
	fn record<'a>(&'a self, record: QueryRecord) -> BoxFuture<'a, Result<()>>;

	/// Most frequent past queries of `scope` containing `needle`, case-insensitively.
	fn suggest<'a>(
		&'a self,
		scope: &'a Scope,
		needle: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<String>>>;
}

pub struct PgTelemetry {
	pool: PgPool,
}
impl PgTelemetry {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}
}

impl TelemetrySink for PgTelemetry {
	fn record<'a>(&'a self, record: QueryRecord) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let row = QueryHistoryRecord {
				query_id: Uuid::new_v4(),
				query: record.query,
				scope: record.scope.label().to_string(),
				organization_id: record.scope.organization_id().map(str::to_string),
				category: record.category,
				result_count: i32::try_from(record.result_count).unwrap_or(i32::MAX),
				latency_ms: i64::try_from(record.latency_ms).unwrap_or(i64::MAX),
				search_mode: record.mode.as_str().to_string(),
				rerank_used: record.rerank_used,
				synthesis_used: record.synthesis_used,
				created_at: record.recorded_at,
			};

			queries::insert_query_history(&self.pool, &row).await?;

			Ok(())
		})
	}

	fn suggest<'a>(
		&'a self,
		scope: &'a Scope,
		needle: &'a str,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<String>>> {
		Box::pin(async move {
			let rows = queries::suggest_queries(
				&self.pool,
				needle,
				scope.label(),
				scope.organization_id(),
				limit,
			)
			.await?;

			Ok(rows.into_iter().map(|row| row.query).collect())
		})
	}
}

impl LexaService {
	/// Hands `record` to the telemetry sink on a detached task.
	pub(crate) fn record_query(&self, record: QueryRecord) {
		let Some(sink) = self.telemetry.clone() else {
			return;
		};

		tokio::spawn(async move {
			if let Err(err) = sink.record(record).await {
				tracing::warn!(error = %err, "Failed to record query telemetry.");
			}
		});
	}
}
