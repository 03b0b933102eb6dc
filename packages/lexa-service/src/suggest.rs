use serde::{Deserialize, Serialize};

use lexa_domain::scope::Scope;

use crate::{LexaService, Result, validate_scope, with_timeout};

const MIN_SUGGEST_CHARS: usize = 2;
const MAX_SUGGESTIONS: u32 = 6;
const SUGGEST_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Clone)]
pub struct SuggestRequest {
	pub scope: Scope,
	pub prefix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestResponse {
	pub suggestions: Vec<String>,
}

impl LexaService {
	/// Frequent past queries of the caller's scope that contain `prefix`.
	///
	/// Short input and history failures both yield an empty list.
	pub async fn suggest(&self, req: SuggestRequest) -> Result<SuggestResponse> {
		validate_scope(&req.scope)?;

		let needle = req.prefix.trim();

		if needle.chars().count() < MIN_SUGGEST_CHARS {
			return Ok(SuggestResponse::default());
		}

		let Some(sink) = self.telemetry.as_ref() else {
			return Ok(SuggestResponse::default());
		};

		match with_timeout(SUGGEST_TIMEOUT_MS, sink.suggest(&req.scope, needle, MAX_SUGGESTIONS))
			.await
		{
			Ok(suggestions) => Ok(SuggestResponse { suggestions }),
			Err(err) => {
				tracing::warn!(error = %err, "Query suggestions failed.");

				Ok(SuggestResponse::default())
			},
		}
	}
}
