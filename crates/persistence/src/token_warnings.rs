//! Durable token-warning history, keyed by user (spec §4.7's repository
//! layer — distinct from `ragcore-tokens`'s in-memory `WarningStore`, which
//! handles the hot acknowledge/list path within a single process).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ragcore_tokens::{Severity, TokenWarning, WarningKind};
use uuid::Uuid;

use crate::client::ScyllaClient;
use crate::error::PersistenceError;

#[async_trait]
pub trait TokenWarningRepository: Send + Sync {
    async fn store(&self, user_id: Uuid, session_id: Option<Uuid>, warning: &TokenWarning) -> Result<(), PersistenceError>;
    async fn list_for_user(&self, user_id: Uuid, limit: i32) -> Result<Vec<TokenWarning>, PersistenceError>;
}

#[derive(Clone)]
pub struct ScyllaTokenWarningRepository {
    client: ScyllaClient,
}

impl ScyllaTokenWarningRepository {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenWarningRepository for ScyllaTokenWarningRepository {
    async fn store(&self, user_id: Uuid, session_id: Option<Uuid>, warning: &TokenWarning) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.token_warnings (
                user_id, warning_id, session_id, kind, current_tokens, limit_tokens,
                percentage, severity, message, suggested_action, created_at, acknowledged_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    user_id,
                    warning.id,
                    session_id,
                    kind_as_str(warning.kind),
                    warning.current_tokens as i32,
                    warning.limit_tokens as i32,
                    warning.percentage,
                    severity_as_str(warning.severity),
                    warning.message.as_str(),
                    warning.suggested_action.as_deref(),
                    warning.created_at.timestamp_millis(),
                    warning.acknowledged_at.map(|t| t.timestamp_millis()),
                ),
            )
            .await
            .map_err(|e| PersistenceError::Database(e.to_string()))?;

        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid, limit: i32) -> Result<Vec<TokenWarning>, PersistenceError> {
        let query = format!(
            "SELECT warning_id, kind, current_tokens, limit_tokens, percentage, severity,
                    message, suggested_action, created_at, acknowledged_at
             FROM {}.token_warnings WHERE user_id = ? LIMIT ?",
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (user_id, limit))
            .await
            .map_err(|e| PersistenceError::Database(e.to_string()))?;

        let Some(rows) = result.rows else { return Ok(Vec::new()) };
        let mut warnings = Vec::with_capacity(rows.len());

        for row in rows {
            #[allow(clippy::type_complexity)]
            let (
                warning_id,
                kind,
                current_tokens,
                limit_tokens,
                percentage,
                severity,
                message,
                suggested_action,
                created_at,
                acknowledged_at,
            ): (Uuid, String, i32, i32, f64, String, String, Option<String>, i64, Option<i64>) =
                row.into_typed().map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

            warnings.push(TokenWarning {
                id: warning_id,
                kind: kind_from_str(&kind),
                current_tokens: current_tokens as u32,
                limit_tokens: limit_tokens as u32,
                percentage,
                severity: severity_from_str(&severity),
                message,
                suggested_action,
                created_at: from_millis(created_at),
                acknowledged_at: acknowledged_at.map(from_millis),
            });
        }

        Ok(warnings)
    }
}

fn kind_as_str(kind: WarningKind) -> &'static str {
    match kind {
        WarningKind::ApproachingLimit => "approaching_limit",
        WarningKind::AtLimit => "at_limit",
        WarningKind::ConversationTooLong => "conversation_too_long",
    }
}

fn kind_from_str(s: &str) -> WarningKind {
    match s {
        "at_limit" => WarningKind::AtLimit,
        "conversation_too_long" => WarningKind::ConversationTooLong,
        _ => WarningKind::ApproachingLimit,
    }
}

fn severity_as_str(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Warning => "warning",
        Severity::Critical => "critical",
    }
}

fn severity_from_str(s: &str) -> Severity {
    match s {
        "critical" => Severity::Critical,
        "warning" => Severity::Warning,
        _ => Severity::Info,
    }
}

fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}
