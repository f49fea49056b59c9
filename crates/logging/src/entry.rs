//! Log entry shape and RFC 5424 severity ordering (spec §4.9).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl LogLevel {
    /// `self` meets or exceeds the severity of `min_level`.
    pub fn meets_threshold(&self, min_level: LogLevel) -> bool {
        *self >= min_level
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub entity_name: Option<String>,
    pub message: String,
    pub logger: Option<String>,
    pub data: Option<Value>,
    pub request_id: Option<String>,
    pub operation: Option<String>,
    pub pipeline_stage: Option<String>,
    pub execution_time_ms: Option<f64>,
}

#[derive(Debug, Default, Clone)]
pub struct NewLogEntry {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub entity_name: Option<String>,
    pub logger: Option<String>,
    pub data: Option<Value>,
    pub request_id: Option<String>,
    pub operation: Option<String>,
    pub pipeline_stage: Option<String>,
    pub execution_time_ms: Option<f64>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>, fields: NewLogEntry) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            level,
            entity_type: fields.entity_type,
            entity_id: fields.entity_id,
            entity_name: fields.entity_name,
            message: message.into(),
            logger: fields.logger,
            data: fields.data,
            request_id: fields.request_id,
            operation: fields.operation,
            pipeline_stage: fields.pipeline_stage,
            execution_time_ms: fields.execution_time_ms,
        }
    }

    /// Rough in-memory footprint in bytes, used by the ring buffer to enforce
    /// its byte-capacity limit rather than an entry count.
    pub fn approx_size_bytes(&self) -> usize {
        let mut size = std::mem::size_of::<Self>();
        size += self.message.len();
        size += self.entity_type.as_ref().map_or(0, String::len);
        size += self.entity_id.as_ref().map_or(0, String::len);
        size += self.entity_name.as_ref().map_or(0, String::len);
        size += self.logger.as_ref().map_or(0, String::len);
        size += self.request_id.as_ref().map_or(0, String::len);
        size += self.operation.as_ref().map_or(0, String::len);
        size += self.pipeline_stage.as_ref().map_or(0, String::len);
        if let Some(data) = &self.data {
            size += data.to_string().len();
        }
        size
    }

    pub fn entity_key(&self) -> Option<String> {
        let entity_id = self.entity_id.as_ref()?;
        Some(match &self.entity_type {
            Some(entity_type) => format!("{entity_type}:{entity_id}"),
            None => entity_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_ordering_follows_rfc_5424() {
        assert!(LogLevel::Emergency > LogLevel::Alert);
        assert!(LogLevel::Alert > LogLevel::Critical);
        assert!(LogLevel::Error.meets_threshold(LogLevel::Warning));
        assert!(!LogLevel::Debug.meets_threshold(LogLevel::Info));
    }

    #[test]
    fn entity_key_combines_type_and_id_when_present() {
        let entry = LogEntry::new(
            LogLevel::Info,
            "m",
            NewLogEntry { entity_type: Some("collection".into()), entity_id: Some("c1".into()), ..Default::default() },
        );
        assert_eq!(entry.entity_key().as_deref(), Some("collection:c1"));
    }

    #[test]
    fn entity_key_falls_back_to_bare_id_without_a_type() {
        let entry = LogEntry::new(LogLevel::Info, "m", NewLogEntry { entity_id: Some("c1".into()), ..Default::default() });
        assert_eq!(entry.entity_key().as_deref(), Some("c1"));
    }
}
