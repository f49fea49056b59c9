//! RAG query-time pipeline server.
//!
//! Exposes the orchestrator over HTTP (`/search`, `/sessions`, `/admin/logs`,
//! `/metrics`) and a chat WebSocket (`/ws`), per spec §6.

pub mod auth;
pub mod error;
pub mod http;
pub mod metrics;
pub mod state;
pub mod websocket;

pub use auth::{auth_middleware, AuthenticatedUser};
pub use error::ApiError;
pub use http::create_router;
pub use metrics::{init_metrics, metrics_middleware, record_error, record_pipeline_latency, record_request};
pub use state::AppState;
