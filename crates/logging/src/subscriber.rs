//! Live log streaming fan-out (spec §4.9). Each subscriber gets a bounded
//! queue; publishing is non-blocking and never waits on a slow subscriber.

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::entry::LogEntry;

pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 100;

/// A live subscription to the log stream. Dropping it unsubscribes on the
/// next publish (the registry notices the closed channel).
pub struct Subscription {
    receiver: mpsc::Receiver<LogEntry>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<LogEntry> {
        self.receiver.recv().await
    }
}

#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: Mutex<Vec<mpsc::Sender<LogEntry>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        self.subscribers.lock().push(tx);
        Subscription { receiver: rx }
    }

    /// Non-blocking fan-out. A full queue silently drops the entry for that
    /// subscriber; a closed queue is removed.
    pub fn publish(&self, entry: &LogEntry) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| match tx.try_send(entry.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{LogLevel, NewLogEntry};

    fn entry() -> LogEntry {
        LogEntry::new(LogLevel::Info, "m", NewLogEntry::default())
    }

    #[tokio::test]
    async fn subscriber_receives_published_entries() {
        let registry = SubscriberRegistry::new();
        let mut sub = registry.subscribe();
        registry.publish(&entry());
        assert!(sub.recv().await.is_some());
    }

    #[tokio::test]
    async fn dropped_subscriber_is_removed_on_next_publish() {
        let registry = SubscriberRegistry::new();
        let sub = registry.subscribe();
        drop(sub);
        assert_eq!(registry.subscriber_count(), 1);
        registry.publish(&entry());
        assert_eq!(registry.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn full_queue_drops_message_instead_of_blocking() {
        let registry = SubscriberRegistry::new();
        let mut sub = registry.subscribe();
        for _ in 0..(SUBSCRIBER_QUEUE_CAPACITY + 10) {
            registry.publish(&entry());
        }
        assert_eq!(registry.subscriber_count(), 1);

        let mut drained = 0;
        while sub.recv().await.is_some() {
            drained += 1;
            if drained > SUBSCRIBER_QUEUE_CAPACITY + 5 {
                break;
            }
        }
        assert!(drained <= SUBSCRIBER_QUEUE_CAPACITY);
    }
}
