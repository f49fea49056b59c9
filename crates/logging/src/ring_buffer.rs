//! Bounded in-memory ring buffer of log entries with entity/request/stage
//! indices (spec §4.9).

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use uuid::Uuid;

use crate::entry::{LogEntry, LogLevel, NewLogEntry};
use crate::subscriber::SubscriberRegistry;

pub const DEFAULT_MAX_SIZE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Default, Clone)]
pub struct LogFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub level: Option<LogLevel>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub request_id: Option<String>,
    pub pipeline_stage: Option<String>,
    pub search: Option<String>,
    pub limit: usize,
    pub offset: usize,
    pub order: SortOrder,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Desc
    }
}

impl LogFilter {
    pub fn new() -> Self {
        Self { limit: 100, offset: 0, order: SortOrder::Desc, ..Default::default() }
    }
}

#[derive(Debug, Serialize)]
pub struct LogStorageStats {
    pub total_logs: usize,
    pub buffer_size_bytes: usize,
    pub buffer_size_mb: f64,
    pub max_size_mb: f64,
    pub usage_percent: f64,
    pub unique_entities: usize,
    pub unique_requests: usize,
    pub unique_pipeline_stages: usize,
    pub level_distribution: HashMap<String, usize>,
    pub entity_distribution: HashMap<String, usize>,
    pub pipeline_stage_distribution: HashMap<String, usize>,
}

struct Inner {
    buffer: VecDeque<LogEntry>,
    current_size_bytes: usize,
    entity_index: HashMap<String, Vec<Uuid>>,
    request_index: HashMap<String, Vec<Uuid>>,
    pipeline_stage_index: HashMap<String, Vec<Uuid>>,
}

pub struct LogStorage {
    max_size_bytes: usize,
    inner: Mutex<Inner>,
    subscribers: SubscriberRegistry,
}

impl LogStorage {
    pub fn new(max_size_bytes: usize) -> Self {
        Self {
            max_size_bytes,
            inner: Mutex::new(Inner {
                buffer: VecDeque::new(),
                current_size_bytes: 0,
                entity_index: HashMap::new(),
                request_index: HashMap::new(),
                pipeline_stage_index: HashMap::new(),
            }),
            subscribers: SubscriberRegistry::new(),
        }
    }

    pub fn subscribe(&self) -> crate::subscriber::Subscription {
        self.subscribers.subscribe()
    }

    pub fn add_log(&self, level: LogLevel, message: impl Into<String>, fields: NewLogEntry) -> LogEntry {
        let entry = LogEntry::new(level, message, fields);
        let size = entry.approx_size_bytes();

        {
            let mut inner = self.inner.lock();
            inner.buffer.push_back(entry.clone());
            inner.current_size_bytes += size;

            if let Some(key) = entry.entity_key() {
                inner.entity_index.entry(key).or_default().push(entry.id);
            }
            if let Some(request_id) = &entry.request_id {
                inner.request_index.entry(request_id.clone()).or_default().push(entry.id);
            }
            if let Some(stage) = &entry.pipeline_stage {
                inner.pipeline_stage_index.entry(stage.clone()).or_default().push(entry.id);
            }

            while inner.current_size_bytes > self.max_size_bytes {
                let Some(oldest) = inner.buffer.pop_front() else { break };
                inner.current_size_bytes = inner.current_size_bytes.saturating_sub(oldest.approx_size_bytes());
                remove_from_indices(&mut inner, &oldest);
            }
        }

        self.subscribers.publish(&entry);
        entry
    }

    pub fn get_logs(&self, filter: &LogFilter) -> Vec<LogEntry> {
        let inner = self.inner.lock();

        let candidates: Vec<&LogEntry> = if let Some(entity_id) = &filter.entity_id {
            let key = match &filter.entity_type {
                Some(entity_type) => format!("{entity_type}:{entity_id}"),
                None => entity_id.clone(),
            };
            let ids = inner.entity_index.get(&key).cloned().unwrap_or_default();
            inner.buffer.iter().filter(|e| ids.contains(&e.id)).collect()
        } else if let Some(request_id) = &filter.request_id {
            let ids = inner.request_index.get(request_id).cloned().unwrap_or_default();
            inner.buffer.iter().filter(|e| ids.contains(&e.id)).collect()
        } else if let Some(stage) = &filter.pipeline_stage {
            let ids = inner.pipeline_stage_index.get(stage).cloned().unwrap_or_default();
            inner.buffer.iter().filter(|e| ids.contains(&e.id)).collect()
        } else {
            inner.buffer.iter().collect()
        };

        let mut filtered: Vec<LogEntry> = candidates
            .into_iter()
            .filter(|log| filter.entity_type.as_deref().map_or(true, |t| log.entity_type.as_deref() == Some(t)))
            .filter(|log| filter.level.map_or(true, |min| log.level.meets_threshold(min)))
            .filter(|log| filter.start_time.map_or(true, |t| log.timestamp >= t))
            .filter(|log| filter.end_time.map_or(true, |t| log.timestamp <= t))
            .filter(|log| {
                filter.search.as_deref().map_or(true, |needle| log.message.to_lowercase().contains(&needle.to_lowercase()))
            })
            .cloned()
            .collect();

        filtered.sort_by_key(|e| e.timestamp);
        if filter.order == SortOrder::Desc {
            filtered.reverse();
        }

        filtered.into_iter().skip(filter.offset).take(filter.limit.max(1)).collect()
    }

    pub fn get_stats(&self) -> LogStorageStats {
        let inner = self.inner.lock();

        let mut level_distribution: HashMap<String, usize> = HashMap::new();
        let mut entity_distribution: HashMap<String, usize> = HashMap::new();
        let mut stage_distribution: HashMap<String, usize> = HashMap::new();

        for log in &inner.buffer {
            *level_distribution.entry(format!("{:?}", log.level).to_lowercase()).or_insert(0) += 1;
            if let Some(entity_type) = &log.entity_type {
                *entity_distribution.entry(entity_type.clone()).or_insert(0) += 1;
            }
            if let Some(stage) = &log.pipeline_stage {
                *stage_distribution.entry(stage.clone()).or_insert(0) += 1;
            }
        }

        let usage_percent = if self.max_size_bytes == 0 {
            0.0
        } else {
            (inner.current_size_bytes as f64 / self.max_size_bytes as f64) * 100.0
        };

        LogStorageStats {
            total_logs: inner.buffer.len(),
            buffer_size_bytes: inner.current_size_bytes,
            buffer_size_mb: round2(inner.current_size_bytes as f64 / (1024.0 * 1024.0)),
            max_size_mb: round2(self.max_size_bytes as f64 / (1024.0 * 1024.0)),
            usage_percent: round2(usage_percent),
            unique_entities: inner.entity_index.len(),
            unique_requests: inner.request_index.len(),
            unique_pipeline_stages: inner.pipeline_stage_index.len(),
            level_distribution,
            entity_distribution,
            pipeline_stage_distribution: stage_distribution,
        }
    }

    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let count = inner.buffer.len();
        inner.buffer.clear();
        inner.entity_index.clear();
        inner.request_index.clear();
        inner.pipeline_stage_index.clear();
        inner.current_size_bytes = 0;
        count
    }
}

fn remove_from_indices(inner: &mut Inner, entry: &LogEntry) {
    if let Some(key) = entry.entity_key() {
        if let Some(ids) = inner.entity_index.get_mut(&key) {
            ids.retain(|id| *id != entry.id);
            if ids.is_empty() {
                inner.entity_index.remove(&key);
            }
        }
    }
    if let Some(request_id) = &entry.request_id {
        if let Some(ids) = inner.request_index.get_mut(request_id) {
            ids.retain(|id| *id != entry.id);
            if ids.is_empty() {
                inner.request_index.remove(request_id);
            }
        }
    }
    if let Some(stage) = &entry.pipeline_stage {
        if let Some(ids) = inner.pipeline_stage_index.get_mut(stage) {
            ids.retain(|id| *id != entry.id);
            if ids.is_empty() {
                inner.pipeline_stage_index.remove(stage);
            }
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(entity_id: &str, request_id: &str, stage: &str) -> NewLogEntry {
        NewLogEntry {
            entity_type: Some("collection".into()),
            entity_id: Some(entity_id.into()),
            request_id: Some(request_id.into()),
            pipeline_stage: Some(stage.into()),
            ..Default::default()
        }
    }

    #[test]
    fn eviction_keeps_buffer_under_byte_limit() {
        let one_entry = LogEntry::new(LogLevel::Info, "message 0", NewLogEntry::default()).approx_size_bytes();
        let storage = LogStorage::new(one_entry * 3);

        for i in 0..50 {
            storage.add_log(LogLevel::Info, format!("message {i}"), NewLogEntry::default());
        }

        let stats = storage.get_stats();
        assert!(stats.total_logs < 50);
        assert!(stats.buffer_size_bytes <= storage.max_size_bytes);
    }

    #[test]
    fn filters_by_entity_and_level() {
        let storage = LogStorage::new(DEFAULT_MAX_SIZE_BYTES);
        storage.add_log(LogLevel::Info, "low severity", fields("c1", "r1", "retrieval"));
        storage.add_log(LogLevel::Error, "high severity", fields("c1", "r2", "generation"));
        storage.add_log(LogLevel::Error, "other entity", fields("c2", "r3", "generation"));

        let mut filter = LogFilter::new();
        filter.entity_type = Some("collection".into());
        filter.entity_id = Some("c1".into());
        filter.level = Some(LogLevel::Error);

        let results = storage.get_logs(&filter);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].message, "high severity");
    }

    #[test]
    fn search_filter_matches_case_insensitively() {
        let storage = LogStorage::new(DEFAULT_MAX_SIZE_BYTES);
        storage.add_log(LogLevel::Info, "Retrieval completed", NewLogEntry::default());
        storage.add_log(LogLevel::Info, "unrelated", NewLogEntry::default());

        let mut filter = LogFilter::new();
        filter.search = Some("retrieval".into());
        assert_eq!(storage.get_logs(&filter).len(), 1);
    }

    #[test]
    fn order_desc_returns_newest_first() {
        let storage = LogStorage::new(DEFAULT_MAX_SIZE_BYTES);
        storage.add_log(LogLevel::Info, "first", NewLogEntry::default());
        storage.add_log(LogLevel::Info, "second", NewLogEntry::default());

        let filter = LogFilter::new();
        let results = storage.get_logs(&filter);
        assert_eq!(results[0].message, "second");
    }

    #[test]
    fn clear_resets_buffer_and_indices() {
        let storage = LogStorage::new(DEFAULT_MAX_SIZE_BYTES);
        storage.add_log(LogLevel::Info, "m", fields("c1", "r1", "retrieval"));
        assert_eq!(storage.clear(), 1);
        assert_eq!(storage.get_stats().total_logs, 0);
        assert_eq!(storage.get_stats().unique_entities, 0);
    }
}
