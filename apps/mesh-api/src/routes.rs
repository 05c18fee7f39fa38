use std::time::Duration;

use axum::{
	Json, Router,
	extract::{FromRequest, Query, Request, State, rejection::JsonRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use mesh_domain::ConsensusStrategy;
use mesh_engine::{ContinueRequest, Deadline, Error, ExecuteRequest, RecallRequest};
use mesh_store::RecordedValidation;

use crate::state::AppState;

const DEFAULT_RECENT_LIMIT: usize = 20;
const MAX_RECENT_LIMIT: usize = 100;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/rag/query", post(rag_query).get(rag_query_get))
		.route("/mesh/execute", post(mesh_execute))
		.route("/mesh/continue", post(mesh_continue))
		.with_state(state)
}

pub fn ops_router(state: AppState) -> Router {
	Router::new().route("/ops/validate/recent", get(validate_recent)).with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn rag_query(
	State(state): State<AppState>,
	ApiJson(payload): ApiJson<RecallRequest>,
) -> Result<Response, ApiError> {
	let deadline = recall_deadline(&state);
	let response = state.engine.recall(&payload, &deadline).await?;

	Ok(Json(response).into_response())
}

/// GET variant of `/rag/query` for quick manual probing; same
/// semantics, options carried in the query string.
#[derive(Debug, Deserialize)]
struct RecallQuery {
	q: String,
	workspace_id: String,
	top_k: Option<u32>,
	strategy: Option<String>,
	use_mmr: Option<bool>,
	mmr_lambda: Option<f32>,
	budget_tokens: Option<u32>,
}

async fn rag_query_get(
	State(state): State<AppState>,
	Query(params): Query<RecallQuery>,
) -> Result<Response, ApiError> {
	let payload = RecallRequest {
		q: params.q,
		workspace_id: params.workspace_id,
		top_k: params.top_k,
		strategy: params.strategy,
		use_mmr: params.use_mmr,
		mmr_lambda: params.mmr_lambda,
		budget_tokens: params.budget_tokens,
	};
	let deadline = recall_deadline(&state);
	let response = state.engine.recall(&payload, &deadline).await?;

	Ok(Json(response).into_response())
}

// Mesh endpoints report failures as plain-text bodies; the structured
// `{error, message}` shape is reserved for the query surface.
async fn mesh_execute(
	State(state): State<AppState>,
	Json(payload): Json<ExecuteRequest>,
) -> Result<Response, PlainError> {
	let outcome = state.engine.execute(&payload).await?;

	Ok(Json(outcome).into_response())
}

async fn mesh_continue(
	State(state): State<AppState>,
	Json(payload): Json<ContinueRequest>,
) -> Result<Response, PlainError> {
	let outcome = state.engine.continue_session(&payload).await?;

	Ok(Json(outcome).into_response())
}

#[derive(Debug, Deserialize)]
struct RecentQuery {
	limit: Option<usize>,
	strategy: Option<String>,
}

async fn validate_recent(
	State(state): State<AppState>,
	Query(params): Query<RecentQuery>,
) -> Result<Response, ApiError> {
	let strategy = match params.strategy.as_deref() {
		Some(value) => Some(ConsensusStrategy::parse(value).ok_or_else(|| {
			ApiError::new(
				StatusCode::BAD_REQUEST,
				"invalid_argument",
				format!("Unknown consensus strategy: {value}."),
			)
		})?),
		None => None,
	};
	let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT).min(MAX_RECENT_LIMIT);
	let validations: Vec<serde_json::Value> =
		state.sink.recent_validations(limit, strategy).iter().map(present_validation).collect();
	let body = serde_json::json!({
		"ok": true,
		"count": validations.len(),
		"validations": validations,
	});

	Ok(Json(body).into_response())
}

/// Scores are rounded to three decimals on the ops surface; the stored
/// records keep full precision.
fn present_validation(validation: &RecordedValidation) -> serde_json::Value {
	serde_json::json!({
		"id": validation.id,
		"session_id": validation.record.session_id,
		"ts": validation.record.ts.format(&time::format_description::well_known::Rfc3339).unwrap_or_default(),
		"score": round3(validation.record.score),
		"subscores": {
			"citation": round3(validation.record.subscores.citation),
			"context": round3(validation.record.subscores.context),
			"source": round3(validation.record.subscores.source),
			"relevance": round3(validation.record.subscores.relevance),
		},
		"model_version": validation.record.model_version,
		"strategy": validation.record.strategy.as_str(),
		"passed": validation.record.passed,
	})
}

fn round3(value: f32) -> f64 {
	(value as f64 * 1_000.0).round() / 1_000.0
}

fn recall_deadline(state: &AppState) -> Deadline {
	Deadline::after(Duration::from_millis(state.engine.config().session.deadline_ms))
}

/// `Json` with the rejection folded into the query surface's error
/// body. Missing or wrong-typed fields are a client error, so the
/// response is 400 rather than axum's default 422.
struct ApiJson<T>(T);
impl<S, T> FromRequest<S> for ApiJson<T>
where
	S: Send + Sync,
	Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
	type Rejection = ApiError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let Json(payload) = Json::<T>::from_request(req, state).await.map_err(|rejection| {
			ApiError::new(StatusCode::BAD_REQUEST, "invalid_argument", rejection.body_text())
		})?;

		Ok(Self(payload))
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error: error.into(), message: message.into() }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		let message = err.to_string();

		match err {
			Error::InvalidArgument { .. } => {
				Self::new(StatusCode::BAD_REQUEST, "invalid_argument", message)
			},
			Error::SessionNotFound { .. } => {
				Self::new(StatusCode::NOT_FOUND, "session_not_found", message)
			},
			Error::ProviderUnavailable { .. } => {
				Self::new(StatusCode::SERVICE_UNAVAILABLE, "provider_unavailable", message)
			},
			Error::Provider { .. } => Self::new(StatusCode::BAD_GATEWAY, "provider_error", message),
			Error::Storage { .. } => {
				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", message)
			},
			Error::Timeout { .. } => Self::new(StatusCode::GATEWAY_TIMEOUT, "timeout", message),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error: self.error, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

#[derive(Debug)]
struct PlainError {
	status: StatusCode,
	message: String,
}
impl From<Error> for PlainError {
	fn from(err: Error) -> Self {
		let api = ApiError::from(err);

		Self { status: api.status, message: api.message }
	}
}
impl IntoResponse for PlainError {
	fn into_response(self) -> Response {
		(self.status, self.message).into_response()
	}
}
