//! HTTP handlers for the summary and preference-learning API

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, FromRequest, Json, Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::learning::{diff, UpdateOutcome, UpdateRequest};
use crate::server::ServerState;
use crate::types::{DiffSegment, LearningRate, Observation, PreferenceState, Rule, Threshold};

/// Summary request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    #[serde(alias = "record")]
    pub source_document: String,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// Summary response
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

/// Learning round request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesRequest {
    pub reference_summary: String,
    pub working_summary: String,
    #[serde(default)]
    pub direct_preference: Option<String>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub observations: Vec<Observation>,
    #[serde(default)]
    pub threshold: Option<Threshold>,
    #[serde(default)]
    pub learning_rate: Option<LearningRate>,
}

/// Diff request
#[derive(Debug, Deserialize)]
pub struct DiffRequest {
    pub original: String,
    pub edited: String,
}

/// Diff response
#[derive(Debug, Serialize)]
pub struct DiffResponse {
    pub segments: Vec<DiffSegment>,
}

/// Status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub model: String,
    pub default_threshold: u32,
}

/// Session learning round request; the rest comes from the stored state
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPreferencesRequest {
    #[serde(default)]
    pub working_summary: Option<String>,
    #[serde(default)]
    pub direct_preference: Option<String>,
    #[serde(default)]
    pub threshold: Option<Threshold>,
    #[serde(default)]
    pub learning_rate: Option<LearningRate>,
}

/// Session summary request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummaryRequest {
    #[serde(default, alias = "record")]
    pub source_document: Option<String>,
}

/// Map an engine failure to a status code and JSON body
pub fn error_response(err: &EngineError) -> Response {
    let status = match err {
        EngineError::Validation(_) => StatusCode::BAD_REQUEST,
        EngineError::Transport { .. } | EngineError::Content { .. } => StatusCode::BAD_GATEWAY,
    };
    let error = match err {
        EngineError::Validation(_) => "Invalid request",
        EngineError::Transport { .. } => "Model call failed",
        EngineError::Content { .. } => "Model returned invalid data",
    };
    (
        status,
        Json(json!({
            "error": error,
            "stage": err.stage(),
            "details": err.to_string()
        })),
    )
        .into_response()
}

/// JSON body extractor whose rejections use the `Validation` error body
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(error_response(&EngineError::Validation(rejection.body_text()))),
        }
    }
}

fn timeout_response(secs: u64) -> Response {
    (
        StatusCode::GATEWAY_TIMEOUT,
        Json(json!({
            "error": "Round timed out",
            "details": format!("no result within {}s; state unchanged", secs)
        })),
    )
        .into_response()
}

fn not_found(id: Uuid) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Session not found", "details": id.to_string() })),
    )
        .into_response()
}

/// Run a round under the configured timeout. On timeout the round's future,
/// with any in-flight model calls, is dropped.
async fn bounded<T, F>(state: &ServerState, round: F) -> Result<T, Response>
where
    F: Future<Output = EngineResult<T>>,
{
    match tokio::time::timeout(state.round_timeout, round).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(error_response(&e)),
        Err(_) => {
            tracing::warn!("Round exceeded {:?}", state.round_timeout);
            Err(timeout_response(state.round_timeout.as_secs()))
        }
    }
}

/// Status handler
pub async fn status_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let response = StatusResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        model: state.config.llm.model.clone(),
        default_threshold: state.config.learning.default_threshold().get(),
    };

    (StatusCode::OK, Json(response)).into_response()
}

/// Summary handler
pub async fn summary_handler(
    State(state): State<ServerState>,
    JsonBody(req): JsonBody<SummaryRequest>,
) -> impl IntoResponse {
    let engine = state.engine.clone();
    match bounded(&state, engine.produce_summary(&req.source_document, &req.rules)).await {
        Ok(summary) => (StatusCode::OK, Json(SummaryResponse { summary })).into_response(),
        Err(response) => response,
    }
}

/// Learning round handler
pub async fn preferences_handler(
    State(state): State<ServerState>,
    JsonBody(req): JsonBody<PreferencesRequest>,
) -> impl IntoResponse {
    let threshold = state.config.learning.resolve(req.threshold, req.learning_rate);
    let request = UpdateRequest {
        reference_summary: req.reference_summary,
        working_summary: req.working_summary,
        direct_preference: req.direct_preference,
        rules: req.rules,
        observations: req.observations,
        threshold,
    };

    let engine = state.engine.clone();
    match bounded(&state, engine.update_preferences(request)).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(response) => response,
    }
}

/// Diff handler
pub async fn diff_handler(JsonBody(req): JsonBody<DiffRequest>) -> impl IntoResponse {
    let segments = diff(&req.original, &req.edited);
    (StatusCode::OK, Json(DiffResponse { segments })).into_response()
}

/// Create a session from a full state
pub async fn create_session_handler(
    State(state): State<ServerState>,
    JsonBody(initial): JsonBody<PreferenceState>,
) -> impl IntoResponse {
    let session = state.sessions.create(initial).await;
    (StatusCode::CREATED, Json(session)).into_response()
}

pub async fn get_session_handler(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    match state.sessions.get(id).await {
        Some(session) => (StatusCode::OK, Json(session)).into_response(),
        None => not_found(id),
    }
}

pub async fn delete_session_handler(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> impl IntoResponse {
    if state.sessions.remove(id).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_found(id)
    }
}

/// Summarize the session's document and reset both summaries to the result
pub async fn session_summary_handler(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> impl IntoResponse {
    let Some(session) = state.sessions.get(id).await else {
        return not_found(id);
    };
    let req: SessionSummaryRequest = if body.is_empty() {
        SessionSummaryRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(req) => req,
            Err(e) => return error_response(&EngineError::Validation(e.to_string())),
        }
    };

    let mut next = session.state;
    if let Some(document) = req.source_document {
        next.source_document = document;
    }

    let engine = state.engine.clone();
    let summary = match bounded(&state, engine.produce_summary(&next.source_document, &next.rules)).await {
        Ok(summary) => summary,
        Err(response) => return response,
    };
    next.reference_summary = summary.clone();
    next.working_summary = summary;

    match state.sessions.replace(id, next).await {
        Some(session) => (StatusCode::OK, Json(session)).into_response(),
        None => not_found(id),
    }
}

/// Outcome of a session round together with the stored session
#[derive(Debug, Serialize)]
struct SessionRoundResponse {
    #[serde(flatten)]
    outcome: UpdateOutcome,
    session: crate::server::session::Session,
}

/// Run a learning round against the stored session state
pub async fn session_preferences_handler(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<SessionPreferencesRequest>,
) -> impl IntoResponse {
    let Some(session) = state.sessions.get(id).await else {
        return not_found(id);
    };
    let mut next = session.state;
    if let Some(working) = req.working_summary {
        next.working_summary = working;
    }

    let learning_rate = req.learning_rate.or(next.learning_rate);
    let request = UpdateRequest {
        reference_summary: next.reference_summary.clone(),
        working_summary: next.working_summary.clone(),
        direct_preference: req.direct_preference,
        rules: next.rules.clone(),
        observations: next.observations.clone(),
        threshold: state.config.learning.resolve(req.threshold, learning_rate),
    };

    let engine = state.engine.clone();
    let outcome = match bounded(&state, engine.update_preferences(request)).await {
        Ok(outcome) => outcome,
        Err(response) => return response,
    };
    next.rules = outcome.rules.clone();
    next.observations = outcome.observations.clone();

    match state.sessions.replace(id, next).await {
        Some(session) => (StatusCode::OK, Json(SessionRoundResponse { outcome, session })).into_response(),
        None => not_found(id),
    }
}
