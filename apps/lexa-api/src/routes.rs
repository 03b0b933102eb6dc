use axum::{
	Json, Router,
	extract::{Query, State},
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use lexa_service::{
	ChatRequest, ChatResponse, ChatTurn, Error, Scope, SearchRequest, SearchResponse,
	SuggestRequest, SuggestResponse,
};

use crate::state::AppState;

/// Set by the trusted upstream gateway. Absent means the shared sample corpus.
pub const ORGANIZATION_HEADER: &str = "x-lexa-organization-id";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search", post(search))
		.route("/v1/search/suggest", get(suggest))
		.route("/v1/chat", post(chat))
		.with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SearchBody {
	pub query: String,
	pub limit: Option<u32>,
	pub category: Option<String>,
	#[serde(default = "default_synthesize")]
	pub synthesize: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatBody {
	pub query: String,
	#[serde(default)]
	pub history: Vec<ChatTurn>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestParams {
	#[serde(default)]
	pub q: String,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<SearchBody>,
) -> Result<Json<SearchResponse>, ApiError> {
	let scope = scope_from_headers(&headers)?;
	let response = state
		.service
		.search(SearchRequest {
			query: payload.query,
			scope,
			limit: payload.limit,
			category: payload.category,
			synthesize: payload.synthesize,
		})
		.await?;

	Ok(Json(response))
}

async fn suggest(
	State(state): State<AppState>,
	headers: HeaderMap,
	Query(params): Query<SuggestParams>,
) -> Result<Json<SuggestResponse>, ApiError> {
	let scope = scope_from_headers(&headers)?;
	let response = state.service.suggest(SuggestRequest { scope, prefix: params.q }).await?;

	Ok(Json(response))
}

async fn chat(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<ChatBody>,
) -> Result<Json<ChatResponse>, ApiError> {
	let scope = scope_from_headers(&headers)?;
	let response = state
		.service
		.chat(ChatRequest { query: payload.query, scope, history: payload.history })
		.await?;

	Ok(Json(response))
}

fn default_synthesize() -> bool {
	true
}

fn scope_from_headers(headers: &HeaderMap) -> Result<Scope, ApiError> {
	let Some(raw) = headers.get(ORGANIZATION_HEADER) else {
		return Ok(Scope::Sample);
	};
	let organization_id = raw.to_str().map(str::trim).unwrap_or_default();

	if organization_id.is_empty() {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			format!("{ORGANIZATION_HEADER} must be a non-empty visible ASCII string."),
			Some(vec![ORGANIZATION_HEADER.to_string()]),
		));
	}

	Ok(Scope::organization(organization_id))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message, None),
			Error::EmbeddingUnavailable { message } => json_error(
				StatusCode::SERVICE_UNAVAILABLE,
				"embedding_unavailable",
				message,
				None,
			),
			other => {
				tracing::error!(error = %other, "Request failed.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"internal_error",
					"Internal error.",
					None,
				)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}
