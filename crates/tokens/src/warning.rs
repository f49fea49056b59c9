//! `TokenWarning` shape (spec §3) and the store used for retrieval and
//! idempotent acknowledgment.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    ApproachingLimit,
    AtLimit,
    ConversationTooLong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenWarning {
    pub id: Uuid,
    pub kind: WarningKind,
    pub current_tokens: u32,
    pub limit_tokens: u32,
    pub percentage: f64,
    pub severity: Severity,
    pub message: String,
    pub suggested_action: Option<String>,
    pub created_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl TokenWarning {
    pub fn new(
        kind: WarningKind,
        current_tokens: u32,
        limit_tokens: u32,
        percentage: f64,
        severity: Severity,
        message: impl Into<String>,
        suggested_action: Option<&str>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            current_tokens,
            limit_tokens,
            percentage: percentage.min(100.0),
            severity,
            message: message.into(),
            suggested_action: suggested_action.map(str::to_string),
            created_at: Utc::now(),
            acknowledged_at: None,
        }
    }
}

/// Per-user/session storage of emitted warnings, queryable and
/// acknowledgeable. Acknowledging an already-acknowledged warning is a
/// no-op rather than an error.
#[derive(Default)]
pub struct WarningStore {
    warnings: Mutex<HashMap<Uuid, TokenWarning>>,
}

impl WarningStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, warning: TokenWarning) -> Uuid {
        let id = warning.id;
        self.warnings.lock().insert(id, warning);
        id
    }

    pub fn get(&self, id: Uuid) -> Option<TokenWarning> {
        self.warnings.lock().get(&id).cloned()
    }

    pub fn acknowledge(&self, id: Uuid) -> Result<(), crate::error::TokenError> {
        let mut warnings = self.warnings.lock();
        let warning = warnings.get_mut(&id).ok_or(crate::error::TokenError::NotFound(id))?;
        if warning.acknowledged_at.is_none() {
            warning.acknowledged_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn list(&self, acknowledged: Option<bool>) -> Vec<TokenWarning> {
        let mut out: Vec<TokenWarning> = self
            .warnings
            .lock()
            .values()
            .filter(|w| match acknowledged {
                Some(flag) => w.acknowledged_at.is_some() == flag,
                None => true,
            })
            .cloned()
            .collect();
        out.sort_by_key(|w| w.created_at);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acknowledge_is_idempotent() {
        let store = WarningStore::new();
        let id = store.store(TokenWarning::new(
            WarningKind::AtLimit,
            950,
            1000,
            95.0,
            Severity::Critical,
            "full",
            Some("start_new_session"),
        ));

        store.acknowledge(id).unwrap();
        let first_ack = store.get(id).unwrap().acknowledged_at.unwrap();
        store.acknowledge(id).unwrap();
        let second_ack = store.get(id).unwrap().acknowledged_at.unwrap();
        assert_eq!(first_ack, second_ack);
    }

    #[test]
    fn acknowledge_missing_warning_errors() {
        let store = WarningStore::new();
        assert!(store.acknowledge(Uuid::new_v4()).is_err());
    }

    #[test]
    fn list_filters_by_acknowledged_state() {
        let store = WarningStore::new();
        let id = store.store(TokenWarning::new(
            WarningKind::ApproachingLimit,
            700,
            1000,
            70.0,
            Severity::Info,
            "70% full",
            None,
        ));
        assert_eq!(store.list(Some(false)).len(), 1);
        assert_eq!(store.list(Some(true)).len(), 0);
        store.acknowledge(id).unwrap();
        assert_eq!(store.list(Some(true)).len(), 1);
    }
}
