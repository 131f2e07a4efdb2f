//! Broadcast Message Bus
//!
//! Implements MessagePublisher with one tokio broadcast channel per topic.

use crate::domain::ports::{MessagePublisher, PublishError};
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 1024;

/// In-process publish/subscribe bus.
///
/// Messages published to a topic with no subscribers are dropped.
pub struct BroadcastMessageBus {
    topics: DashMap<String, broadcast::Sender<serde_json::Value>>,
    capacity: usize,
}

impl BroadcastMessageBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a bus whose per-topic buffers hold `capacity` messages.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to a topic. Only messages published after this call are received.
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<serde_json::Value> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of live subscribers on a topic.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for BroadcastMessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePublisher for BroadcastMessageBus {
    async fn publish(&self, topic: &str, message: serde_json::Value) -> Result<(), PublishError> {
        let Some(sender) = self.topics.get(topic) else {
            tracing::debug!("no subscribers for topic {}, message dropped", topic);
            return Ok(());
        };

        if sender.send(message).is_err() {
            tracing::debug!("all subscribers of topic {} are gone, message dropped", topic);
        }
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = BroadcastMessageBus::new();
        let mut rx1 = bus.subscribe("t");
        let mut rx2 = bus.subscribe("t");

        bus.publish("t", json!({ "n": 1 })).await.unwrap();

        assert_eq!(rx1.recv().await.unwrap(), json!({ "n": 1 }));
        assert_eq!(rx2.recv().await.unwrap(), json!({ "n": 1 }));
        assert_eq!(bus.subscriber_count("t"), 2);
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let bus = BroadcastMessageBus::new();
        let mut rx = bus.subscribe("a");

        bus.publish("b", json!("other")).await.unwrap();
        bus.publish("a", json!("mine")).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), json!("mine"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = BroadcastMessageBus::new();
        assert!(bus.publish("nobody", json!(1)).await.is_ok());
        assert_eq!(bus.subscriber_count("nobody"), 0);
    }

    #[tokio::test]
    async fn test_publish_after_subscribers_dropped_is_ok() {
        let bus = BroadcastMessageBus::new();
        drop(bus.subscribe("t"));

        assert!(bus.publish("t", json!(1)).await.is_ok());
    }
}
