//! Bounded in-memory log ring buffer with entity/request/stage indices and
//! live subscriber streaming (spec §4.9). Distinct from process-wide
//! `tracing` diagnostics: this is the queryable, streamable log surface the
//! admin log endpoints serve.

pub mod entry;
pub mod ring_buffer;
pub mod subscriber;

pub use entry::{LogEntry, LogLevel, NewLogEntry};
pub use ring_buffer::{LogFilter, LogStorage, LogStorageStats, SortOrder, DEFAULT_MAX_SIZE_BYTES};
pub use subscriber::{Subscription, SUBSCRIBER_QUEUE_CAPACITY};
