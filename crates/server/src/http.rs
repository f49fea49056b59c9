//! HTTP endpoints (spec §6): `/search`, `/sessions`, `/health`,
//! `/admin/logs`, `/metrics`, built the way the teacher's `create_router`
//! assembles a single `Router<AppState>` with CORS/trace layers.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use ragcore_conversation::{ConversationError, PipelineOutcome};
use ragcore_core::conversation::{ConversationSession, MessageRole, MessageType, SessionStatus};
use ragcore_core::StructuredFormat;
use ragcore_logging::{LogFilter, SortOrder};
use ragcore_pipeline::PipelineRunConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::{auth_middleware, AuthenticatedUser};
use crate::error::ApiError;
use crate::metrics::{metrics_handler, metrics_middleware};
use crate::state::AppState;
use crate::websocket::ws_handler;

pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server.cors_origins);

    Router::new()
        .route("/search", post(search))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/messages", post(post_message))
        .route("/sessions/:id/pause", post(pause_session))
        .route("/sessions/:id/resume", post(resume_session))
        .route("/sessions/:id/warnings", get(list_warnings))
        .route("/sessions/:id/warnings/:warning_id/ack", post(ack_warning))
        .route("/health", get(health_check))
        .route("/admin/logs", get(list_logs))
        .route("/admin/logs/stats", get(log_stats))
        .route("/metrics", get(metrics_handler))
        .route("/ws", get(ws_handler))
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(axum::middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods([Method::GET, Method::POST]).allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    if parsed.is_empty() {
        tracing::warn!("no valid CORS origins configured, denying cross-origin requests");
        return CorsLayer::new();
    }

    CorsLayer::new().allow_origin(parsed).allow_methods([Method::GET, Method::POST]).allow_headers(Any).allow_credentials(true)
}

#[derive(Debug, Deserialize)]
struct ConfigMetadata {
    #[serde(default)]
    structured_output_enabled: Option<bool>,
    #[serde(default)]
    format_type: Option<String>,
    #[serde(default)]
    include_reasoning: Option<bool>,
    #[serde(default)]
    max_citations: Option<usize>,
    #[serde(default)]
    min_confidence: Option<f32>,
    #[serde(default)]
    validation_strict: Option<bool>,
    #[serde(default)]
    max_context_per_doc: Option<usize>,
    #[serde(default)]
    cot_requested: Option<bool>,
}

impl ConfigMetadata {
    fn into_run_config(self) -> PipelineRunConfig {
        let mut config = PipelineRunConfig::default();
        if let Some(v) = self.structured_output_enabled {
            config.structured_output_enabled = v;
        }
        if let Some(v) = self.format_type {
            config.format_type = if v == "cot_reasoning" { StructuredFormat::CotReasoning } else { StructuredFormat::Standard };
        }
        if let Some(v) = self.include_reasoning {
            config.include_reasoning = v;
        }
        if let Some(v) = self.max_citations {
            config = config.with_max_citations(v);
        }
        if let Some(v) = self.min_confidence {
            config.min_confidence = v;
        }
        if let Some(v) = self.validation_strict {
            config.validation_strict = v;
        }
        if let Some(v) = self.max_context_per_doc {
            config.max_context_per_doc = v;
        }
        if let Some(v) = self.cot_requested {
            config.cot_requested = v;
        }
        config
    }
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    question: String,
    collection_id: Uuid,
    user_id: Option<Uuid>,
    #[serde(default)]
    config_metadata: Option<ConfigMetadata>,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    answer: Option<String>,
    documents: Vec<String>,
    query_results: Vec<ragcore_core::QueryResult>,
    rewritten_query: Option<String>,
    structured_answer: Option<ragcore_core::StructuredAnswer>,
    artifacts: Value,
}

async fn search(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(auth_user)): Extension<AuthenticatedUser>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    let user_id = request.user_id.unwrap_or(auth_user);
    let config = request.config_metadata.map(ConfigMetadata::into_run_config).unwrap_or_default();
    let request_id = Uuid::new_v4().to_string();

    let ctx = state
        .orchestrator
        .run(request_id, request.question, user_id, request.collection_id, config)
        .await
        .map_err(ApiError::from)?;

    let documents = ctx.effective_results().iter().map(|r| r.chunk.document_id.clone()).collect::<std::collections::BTreeSet<_>>().into_iter().collect();

    Ok(Json(SearchResponse {
        answer: ctx.answer_text,
        documents,
        query_results: ctx.query_results,
        rewritten_query: ctx.rewritten_query,
        structured_answer: ctx.structured_answer,
        artifacts: serde_json::to_value(ctx.artifacts).unwrap_or(Value::Null),
    }))
}

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    collection_id: Uuid,
    session_name: String,
    #[serde(default)]
    context_window_size: Option<u32>,
    #[serde(default)]
    max_messages: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ConversationSessionOutput {
    id: Uuid,
    user_id: Uuid,
    collection_id: Uuid,
    name: String,
    status: SessionStatus,
    context_window_size: u32,
    max_messages: u32,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<ConversationSession> for ConversationSessionOutput {
    fn from(s: ConversationSession) -> Self {
        Self {
            id: s.id,
            user_id: s.user_id,
            collection_id: s.collection_id,
            name: s.name,
            status: s.status,
            context_window_size: s.context_window_size,
            max_messages: s.max_messages,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

async fn create_session(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<ConversationSessionOutput>, ApiError> {
    let sessions = sessions_or_unavailable(&state)?;

    let session = ConversationSession::new(
        user_id,
        request.collection_id,
        request.session_name,
        request.context_window_size.unwrap_or(state.settings.tokens.default_context_window),
        request.max_messages.unwrap_or(50),
    );

    sessions.create(&session).await.map_err(|e| ApiError(e.into()))?;
    Ok(Json(session.into()))
}

async fn get_session(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationSessionOutput>, ApiError> {
    let sessions = sessions_or_unavailable(&state)?;
    let session = fetch_owned_session(&sessions, id, user_id).await?;
    Ok(Json(session.into()))
}

async fn pause_session(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let sessions = sessions_or_unavailable(&state)?;
    fetch_owned_session(&sessions, id, user_id).await?;
    sessions.update_status(id, SessionStatus::Paused).await.map_err(|e| ApiError(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn resume_session(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let sessions = sessions_or_unavailable(&state)?;
    fetch_owned_session(&sessions, id, user_id).await?;
    sessions.update_status(id, SessionStatus::Active).await.map_err(|e| ApiError(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Fetches a session and confirms `user_id` owns it, returning the same
/// `NotFound` for a missing session as for one owned by someone else so the
/// response can't be used to enumerate other users' session ids.
async fn fetch_owned_session(sessions: &ragcore_persistence::ScyllaSessionStore, session_id: Uuid, user_id: Uuid) -> Result<ConversationSession, ApiError> {
    use ragcore_conversation::SessionStore;
    let session = sessions.get(session_id).await.map_err(ApiError::from)?.ok_or_else(|| ApiError(ragcore_core::Error::NotFound(format!("session {session_id}"))))?;
    if session.user_id != user_id {
        return Err(ApiError(ragcore_core::Error::NotFound(format!("session {session_id}"))));
    }
    Ok(session)
}

#[derive(Debug, Deserialize)]
struct PostMessageRequest {
    content: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    message_type: Option<String>,
    #[serde(default)]
    metadata: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ConversationMessageOutput {
    id: Uuid,
    session_id: Uuid,
    role: MessageRole,
    message_type: MessageType,
    content: String,
    metadata: Value,
    created_at: chrono::DateTime<chrono::Utc>,
}

/// Drives a conversation turn through the pipeline (spec §4.5): this is the
/// REST equivalent of a `chat_message` WebSocket frame.
async fn post_message(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<PostMessageRequest>,
) -> Result<Json<ConversationMessageOutput>, ApiError> {
    let conversation = conversation_or_unavailable(&state)?;
    let sessions = sessions_or_unavailable(&state)?;

    let session = fetch_owned_session(&sessions, session_id, user_id).await?;
    let collection_id = session.collection_id;
    let _ = (request.role, request.message_type, request.metadata);

    let orchestrator = state.orchestrator.clone();
    let state_for_warning = state.clone();
    let tracker = state.token_tracker.clone();
    let context_limit = state.settings.tokens.default_context_window;

    let assistant_message = conversation
        .handle_turn(session_id, request.content, move |augmented_query| async move {
            let request_id = Uuid::new_v4().to_string();
            let ctx = orchestrator.run(request_id, augmented_query, user_id, collection_id, PipelineRunConfig::default()).await?;

            let answer = ctx.answer_text.unwrap_or_default();
            let sources = ctx.structured_answer.as_ref().map(|a| a.citations.clone()).unwrap_or_default();
            let token_count = ragcore_llm::approx_token_count(&answer);

            let usage = ragcore_core::traits::TokenUsage { prompt_tokens: token_count, completion_tokens: 0 };
            if let Some(warning) = tracker.check_usage_warning(&usage, context_limit, None) {
                state_for_warning.record_warning(user_id, session_id, warning).await;
            }

            Ok(PipelineOutcome { answer, sources, token_count })
        })
        .await
        .map_err(conversation_error_to_api)?;

    Ok(Json(ConversationMessageOutput {
        id: assistant_message.id,
        session_id: assistant_message.session_id,
        role: assistant_message.role,
        message_type: assistant_message.message_type,
        content: assistant_message.content,
        metadata: assistant_message.metadata,
        created_at: assistant_message.created_at,
    }))
}

fn conversation_error_to_api(err: ConversationError) -> ApiError {
    ApiError(err.into())
}

fn sessions_or_unavailable(state: &AppState) -> Result<std::sync::Arc<ragcore_persistence::ScyllaSessionStore>, ApiError> {
    state.sessions.clone().ok_or_else(|| ApiError(ragcore_core::Error::Internal("persistence is not configured".into())))
}

fn conversation_or_unavailable(state: &AppState) -> Result<std::sync::Arc<ragcore_conversation::ConversationManager>, ApiError> {
    state.conversation.clone().ok_or_else(|| ApiError(ragcore_core::Error::Internal("persistence is not configured".into())))
}

#[derive(Debug, Serialize)]
struct WarningOutput {
    id: Uuid,
    kind: ragcore_tokens::WarningKind,
    current_tokens: u32,
    limit_tokens: u32,
    percentage: f64,
    severity: ragcore_tokens::Severity,
    message: String,
    suggested_action: Option<String>,
    acknowledged: bool,
}

impl From<ragcore_tokens::TokenWarning> for WarningOutput {
    fn from(w: ragcore_tokens::TokenWarning) -> Self {
        Self {
            id: w.id,
            kind: w.kind,
            current_tokens: w.current_tokens,
            limit_tokens: w.limit_tokens,
            percentage: w.percentage,
            severity: w.severity,
            message: w.message,
            suggested_action: w.suggested_action,
            acknowledged: w.acknowledged_at.is_some(),
        }
    }
}

async fn list_warnings(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<WarningOutput>>, ApiError> {
    if let Some(sessions) = state.sessions.clone() {
        fetch_owned_session(&sessions, session_id, user_id).await?;
    }
    let ids = state.warning_sessions.get(&session_id).map(|v| v.clone()).unwrap_or_default();
    let warnings = ids.into_iter().filter_map(|id| state.warnings.get(id)).map(WarningOutput::from).collect();
    Ok(Json(warnings))
}

async fn ack_warning(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path((session_id, warning_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    if let Some(sessions) = state.sessions.clone() {
        fetch_owned_session(&sessions, session_id, user_id).await?;
    }
    state.warnings.acknowledge(warning_id).map_err(|e| ApiError(e.into()))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let components = serde_json::json!({
        "persistence": if state.persistence_enabled() { "ok" } else { "disabled" },
    });
    (StatusCode::OK, Json(serde_json::json!({ "status": "healthy", "components": components })))
}

#[derive(Debug, Deserialize)]
struct LogQuery {
    entity: Option<String>,
    level: Option<String>,
    since: Option<chrono::DateTime<chrono::Utc>>,
    until: Option<chrono::DateTime<chrono::Utc>>,
    stage: Option<String>,
    q: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
    order: Option<String>,
}

async fn list_logs(State(state): State<AppState>, Query(query): Query<LogQuery>) -> Json<Vec<ragcore_logging::LogEntry>> {
    let mut filter = LogFilter::new();
    filter.entity_id = query.entity;
    filter.level = query.level.and_then(|l| parse_level(&l));
    filter.start_time = query.since;
    filter.end_time = query.until;
    filter.pipeline_stage = query.stage;
    filter.search = query.q;
    filter.limit = query.limit.unwrap_or(100);
    filter.offset = query.offset.unwrap_or(0);
    filter.order = if query.order.as_deref() == Some("asc") { SortOrder::Asc } else { SortOrder::Desc };

    Json(state.logs.get_logs(&filter))
}

fn parse_level(s: &str) -> Option<ragcore_logging::LogLevel> {
    use ragcore_logging::LogLevel::*;
    Some(match s.to_lowercase().as_str() {
        "debug" => Debug,
        "info" => Info,
        "notice" => Notice,
        "warning" | "warn" => Warning,
        "error" => Error,
        "critical" => Critical,
        "alert" => Alert,
        "emergency" => Emergency,
        _ => return None,
    })
}

async fn log_stats(State(state): State<AppState>) -> Json<ragcore_logging::LogStorageStats> {
    Json(state.logs.get_stats())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_metadata_defaults_match_pipeline_defaults() {
        let config = ConfigMetadata {
            structured_output_enabled: None,
            format_type: None,
            include_reasoning: None,
            max_citations: None,
            min_confidence: None,
            validation_strict: None,
            max_context_per_doc: None,
            cot_requested: None,
        }
        .into_run_config();
        assert_eq!(config.max_citations, PipelineRunConfig::default().max_citations);
    }

    #[test]
    fn config_metadata_clamps_max_citations() {
        let config = ConfigMetadata {
            structured_output_enabled: None,
            format_type: None,
            include_reasoning: None,
            max_citations: Some(1000),
            min_confidence: None,
            validation_strict: None,
            max_context_per_doc: None,
            cot_requested: None,
        }
        .into_run_config();
        assert_eq!(config.max_citations, 20);
    }
}
