//! Shared application state across all handlers, built the way the
//! teacher's `AppState` composes optional subsystems behind builder
//! methods (`with_vector_store`, `with_audit_logger`, ...).

use std::sync::Arc;

use dashmap::DashMap;
use metrics_exporter_prometheus::PrometheusHandle;
use ragcore_conversation::ConversationManager;
use ragcore_logging::LogStorage;
use ragcore_persistence::{ScyllaSessionStore, ScyllaTokenWarningRepository};
use ragcore_pipeline::PipelineOrchestrator;
use ragcore_tokens::{TokenTracker, WarningStore};
use uuid::Uuid;

use ragcore_config::Settings;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub logs: Arc<LogStorage>,
    pub metrics_handle: PrometheusHandle,
    pub token_tracker: Arc<TokenTracker>,
    pub warnings: Arc<WarningStore>,
    /// session-id -> warning ids raised for that session, for `GET
    /// /sessions/{id}/warnings` (spec §4.7); the `WarningStore` itself is
    /// keyed by warning id only.
    pub warning_sessions: Arc<DashMap<Uuid, Vec<Uuid>>>,
    /// `None` when `persistence.enabled` is false: session/conversation
    /// endpoints degrade to 503 rather than panicking (teacher's
    /// `vector_store: Option<Arc<VectorStore>>` pattern).
    pub conversation: Option<Arc<ConversationManager>>,
    pub sessions: Option<Arc<ScyllaSessionStore>>,
    pub token_warning_repo: Option<Arc<ScyllaTokenWarningRepository>>,
    /// Per-user live WebSocket sender (spec §4.5: one active socket per
    /// user, new connect evicts the prior).
    pub ws_connections: Arc<DashMap<Uuid, tokio::sync::mpsc::UnboundedSender<axum::extract::ws::Message>>>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        orchestrator: PipelineOrchestrator,
        logs: LogStorage,
        metrics_handle: PrometheusHandle,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            orchestrator: Arc::new(orchestrator),
            logs: Arc::new(logs),
            metrics_handle,
            token_tracker: Arc::new(TokenTracker::new()),
            warnings: Arc::new(WarningStore::new()),
            warning_sessions: Arc::new(DashMap::new()),
            conversation: None,
            sessions: None,
            token_warning_repo: None,
            ws_connections: Arc::new(DashMap::new()),
        }
    }

    pub fn with_conversation(
        mut self,
        conversation: ConversationManager,
        sessions: ScyllaSessionStore,
        token_warning_repo: ScyllaTokenWarningRepository,
    ) -> Self {
        self.conversation = Some(Arc::new(conversation));
        self.sessions = Some(Arc::new(sessions));
        self.token_warning_repo = Some(Arc::new(token_warning_repo));
        self
    }

    pub fn persistence_enabled(&self) -> bool {
        self.conversation.is_some()
    }

    /// Records a token-usage warning for a session: in the hot in-memory
    /// store for immediate ack/list, and durably if persistence is wired.
    pub async fn record_warning(&self, user_id: Uuid, session_id: Uuid, warning: ragcore_tokens::TokenWarning) {
        let id = self.warnings.store(warning.clone());
        self.warning_sessions.entry(session_id).or_default().push(id);

        if let Some(repo) = &self.token_warning_repo {
            use ragcore_persistence::TokenWarningRepository;
            if let Err(err) = repo.store(user_id, Some(session_id), &warning).await {
                tracing::warn!(error = %err, "failed to persist token warning");
            }
        }
    }
}
