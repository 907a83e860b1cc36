//! Append-only content log per topic

use std::collections::HashMap;
use tokio::sync::RwLock;

/// Generated content blocks, in the order they were produced.
///
/// Nothing is ever truncated, deduplicated or reordered, so memory grows with
/// the length of the session.
#[derive(Default)]
pub struct ContentAggregator {
    logs: RwLock<HashMap<String, Vec<String>>>,
}

impl ContentAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn append(&self, topic_id: &str, block: impl Into<String>) {
        let mut logs = self.logs.write().await;
        logs.entry(topic_id.to_string()).or_default().push(block.into());
    }

    /// All blocks for a topic concatenated in append order
    pub async fn render(&self, topic_id: &str) -> String {
        self.logs
            .read()
            .await
            .get(topic_id)
            .map(|blocks| blocks.concat())
            .unwrap_or_default()
    }

    pub async fn blocks(&self, topic_id: &str) -> Vec<String> {
        self.logs.read().await.get(topic_id).cloned().unwrap_or_default()
    }

    pub async fn len(&self, topic_id: &str) -> usize {
        self.logs.read().await.get(topic_id).map(Vec::len).unwrap_or(0)
    }
}
