//! RAG query-time pipeline server entry point.

use std::sync::Arc;

use async_trait::async_trait;
use ragcore_config::{load_settings, Settings};
use ragcore_core::domain::{Pipeline, ProviderConfig, ProviderKind};
use ragcore_core::{PipelineRepository, ProviderRepository, Result as CoreResult};
use ragcore_server::{create_router, init_metrics, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env = std::env::var("RAGCORE_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Warning: failed to load config: {e}. Using defaults.");
            Settings::default()
        }
    };

    init_tracing(&settings);
    tracing::info!(environment = ?settings.environment, "starting ragcore-server v{}", env!("CARGO_PKG_VERSION"));

    let metrics_handle = init_metrics();
    tracing::info!("Prometheus metrics available at /metrics");

    let logs = ragcore_logging::LogStorage::new(settings.logging.buffer_size_mb * 1024 * 1024);

    let embedding_config = ragcore_llm::embeddings::resolve_embedding_backend(
        &settings.retrieval.embedding_model,
        &settings.retrieval.vector_store_endpoint,
        settings.retrieval.vector_dim,
    );
    let embedder = ragcore_llm::embeddings::create_embedding_provider(&embedding_config)?;

    let vector_store = ragcore_retrieval::QdrantVectorStore::new(ragcore_retrieval::VectorStoreConfig {
        endpoint: settings.retrieval.vector_store_endpoint.clone(),
        vector_dim: settings.retrieval.vector_dim,
        distance: ragcore_retrieval::VectorDistance::Cosine,
        api_key: None,
    })?;

    let retriever_config = ragcore_retrieval::RetrieverConfig {
        dense_top_k: settings.retrieval.dense_top_k,
        sparse_top_k: settings.retrieval.sparse_top_k,
        final_top_k: settings.retrieval.final_top_k,
        dense_weight: settings.retrieval.dense_weight,
        rrf_k: 60.0,
        // Reranking runs as its own pipeline stage (spec §4.1 stage 5); the
        // retriever itself only fuses dense/sparse hits.
        reranking_enabled: false,
    };
    let sparse_index = ragcore_retrieval::SparseIndex::new(ragcore_retrieval::SparseConfig { top_k: settings.retrieval.sparse_top_k })?;
    let retriever = Arc::new(
        ragcore_retrieval::HybridRetriever::new(retriever_config, embedder.clone(), Arc::new(vector_store)).with_sparse_index(Arc::new(sparse_index)),
    );

    let llm_config = llm_provider_config_from_env();
    let llm = ragcore_llm::create_provider(&llm_config)?;
    let cot = Arc::new(ragcore_cot::ChainOfThoughtEngine::new(llm.clone()));
    let attribution = Arc::new(ragcore_validation::CitationAttributionService::new(Some(embedder.clone())));
    let agents = Arc::new(ragcore_agents::AgentExecutor::new());

    let (pipelines, providers): (Arc<dyn PipelineRepository>, Arc<dyn ProviderRepository>) = if settings.persistence.enabled {
        tracing::info!(hosts = ?settings.persistence.scylla_hosts, keyspace = %settings.persistence.keyspace, "initializing ScyllaDB persistence");
        let scylla_config = ragcore_persistence::ScyllaConfig {
            hosts: settings.persistence.scylla_hosts.clone(),
            keyspace: settings.persistence.keyspace.clone(),
            replication_factor: 1,
        };
        let persistence = ragcore_persistence::init(scylla_config).await?;

        let sessions_for_state = persistence.sessions.clone();
        let sessions_for_conversation = Arc::new(persistence.sessions);
        let messages = Arc::new(persistence.messages);
        let token_warnings = persistence.token_warnings;
        let pipelines_repo = Arc::new(persistence.pipelines);
        let providers_repo = Arc::new(persistence.providers);

        let entities = ragcore_conversation::EntityExtractor::new(Some(llm.clone()));
        let conversation = ragcore_conversation::ConversationManager::new(sessions_for_conversation, messages, entities);

        let orchestrator = ragcore_pipeline::PipelineOrchestrator::new(
            pipelines_repo.clone(),
            providers_repo.clone(),
            llm_config.model.clone(),
            llm.clone(),
            retriever,
            cot,
            attribution,
            agents,
        );

        let state = AppState::new(settings, orchestrator, logs, metrics_handle).with_conversation(conversation, sessions_for_state, token_warnings);

        return serve(state).await;
    } else {
        tracing::info!("persistence disabled, running with an in-memory default pipeline/provider");
        (Arc::new(DefaultPipelines::default()), Arc::new(DefaultProviders))
    };

    let orchestrator = ragcore_pipeline::PipelineOrchestrator::new(pipelines, providers, llm_config.model.clone(), llm, retriever, cot, attribution, agents);
    let state = AppState::new(settings, orchestrator, logs, metrics_handle);
    serve(state).await
}

async fn serve(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::net::SocketAddr::new(state.settings.server.host.parse()?, state.settings.server.port);
    let app = create_router(state);

    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).expect("failed to install SIGTERM handler").recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

#[cfg(feature = "telemetry")]
fn init_tracing(settings: &Settings) {
    use opentelemetry_otlp::WithExportConfig;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("ragcore={},tower_http=info", settings.logging.default_level).into());
    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if std::env::var("RAGCORE_LOG_JSON").is_ok() {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    if let Ok(otlp_endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
        match opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic().with_endpoint(&otlp_endpoint))
            .with_trace_config(opentelemetry_sdk::trace::Config::default().with_resource(opentelemetry_sdk::Resource::new(vec![
                opentelemetry::KeyValue::new("service.name", "ragcore-server"),
                opentelemetry::KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)
        {
            Ok(tracer) => {
                let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
                subscriber.with(fmt_layer).with(otel_layer).init();
                tracing::info!(endpoint = %otlp_endpoint, "OpenTelemetry tracing enabled");
                return;
            }
            Err(e) => eprintln!("failed to initialize OpenTelemetry: {e}. Falling back to console logging."),
        }
    }
    subscriber.with(fmt_layer).init();
}

#[cfg(not(feature = "telemetry"))]
fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("ragcore={},tower_http=info", settings.logging.default_level).into());
    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if std::env::var("RAGCORE_LOG_JSON").is_ok() {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}

fn llm_provider_config_from_env() -> ragcore_llm::LlmProviderConfig {
    match std::env::var("RAGCORE_LLM_KIND").ok().as_deref() {
        Some("vendor") => ragcore_llm::LlmProviderConfig {
            kind: ragcore_llm::LlmProviderKind::Vendor,
            endpoint: std::env::var("RAGCORE_LLM_ENDPOINT").unwrap_or_default(),
            api_key: std::env::var("RAGCORE_LLM_API_KEY").ok(),
            model: std::env::var("RAGCORE_LLM_MODEL").unwrap_or_else(|_| "claude-3-5-sonnet-20241022".to_string()),
        },
        Some("http") => ragcore_llm::LlmProviderConfig {
            kind: ragcore_llm::LlmProviderKind::Http,
            endpoint: std::env::var("RAGCORE_LLM_ENDPOINT").unwrap_or_else(|_| "http://localhost:11434".to_string()),
            api_key: None,
            model: std::env::var("RAGCORE_LLM_MODEL").unwrap_or_else(|_| "llama3".to_string()),
        },
        _ => ragcore_llm::LlmProviderConfig::local_stub(),
    }
}

/// In-memory default-pipeline repository used when persistence is disabled:
/// a fresh default pipeline is created per process and reused across
/// requests for a given user, but nothing survives a restart.
#[derive(Default)]
struct DefaultPipelines {
    by_user: std::sync::Mutex<std::collections::HashMap<Uuid, Pipeline>>,
}

#[async_trait]
impl PipelineRepository for DefaultPipelines {
    async fn default_for_user(&self, user_id: Uuid) -> CoreResult<Option<Pipeline>> {
        Ok(self.by_user.lock().unwrap().get(&user_id).cloned())
    }

    async fn get(&self, user_id: Uuid, pipeline_id: Uuid) -> CoreResult<Option<Pipeline>> {
        Ok(self.by_user.lock().unwrap().get(&user_id).filter(|p| p.id == pipeline_id).cloned())
    }

    async fn upsert(&self, pipeline: &Pipeline) -> CoreResult<()> {
        self.by_user.lock().unwrap().insert(pipeline.user_id, pipeline.clone());
        Ok(())
    }
}

/// Always resolves to a local-stub provider when persistence (and thus
/// per-user provider registration) is disabled.
struct DefaultProviders;

#[async_trait]
impl ProviderRepository for DefaultProviders {
    async fn preferred_for_user(&self, user_id: Uuid) -> CoreResult<Option<ProviderConfig>> {
        Ok(Some(ProviderConfig {
            id: Uuid::new_v4(),
            user_id,
            kind: ProviderKind::LocalStub,
            api_key: None,
            endpoint: String::new(),
            is_default: true,
        }))
    }
}

