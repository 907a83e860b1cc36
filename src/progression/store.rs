//! Per-topic progression state
//!
//! Entries are created lazily at level 0 with an empty queue and are never
//! removed. Each method is atomic per key; serializing whole selection events
//! is the engine's job (see `guard`).

use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::LadderError;
use crate::types::ProgressionState;

#[derive(Default)]
pub struct ProgressionStore {
    states: RwLock<HashMap<String, ProgressionState>>,
}

impl ProgressionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state, creating a zero entry on first access
    pub async fn get_state(&self, topic_id: &str) -> ProgressionState {
        if let Some(state) = self.states.read().await.get(topic_id) {
            return state.clone();
        }
        let mut states = self.states.write().await;
        states.entry(topic_id.to_string()).or_default().clone()
    }

    /// Move a topic to `level`. Levels never regress.
    pub async fn set_level(&self, topic_id: &str, level: u32) -> Result<(), LadderError> {
        let mut states = self.states.write().await;
        let state = states.entry(topic_id.to_string()).or_default();
        if level < state.current_level {
            return Err(LadderError::InvalidTransition {
                topic: topic_id.to_string(),
                current: state.current_level,
                requested: level,
            });
        }
        state.current_level = level;
        Ok(())
    }

    /// Replace the pending queue wholesale
    pub async fn set_queue(&self, topic_id: &str, queue: Vec<String>) {
        let mut states = self.states.write().await;
        let state = states.entry(topic_id.to_string()).or_default();
        debug!("Queue for {} replaced with {} subtopics", topic_id, queue.len());
        state.pending_queue = VecDeque::from(queue);
    }

    /// Remove and return the queue head
    pub async fn pop_queue(&self, topic_id: &str) -> Result<String, LadderError> {
        let mut states = self.states.write().await;
        states
            .get_mut(topic_id)
            .and_then(|state| state.pending_queue.pop_front())
            .ok_or_else(|| LadderError::QueueEmpty(topic_id.to_string()))
    }

    /// Record a subtopic whose content was served
    pub async fn mark_covered(&self, topic_id: &str, subtopic: &str) {
        let mut states = self.states.write().await;
        let state = states.entry(topic_id.to_string()).or_default();
        state.covered.push(subtopic.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lazy_zero_state() {
        let store = ProgressionStore::new();
        let state = store.get_state("pentesting").await;
        assert_eq!(state.current_level, 0);
        assert!(state.pending_queue.is_empty());
    }

    #[tokio::test]
    async fn test_set_level_rejects_regression() {
        let store = ProgressionStore::new();
        store.set_level("t", 2).await.unwrap();
        store.set_level("t", 2).await.unwrap();

        let err = store.set_level("t", 1).await.unwrap_err();
        assert!(matches!(err, LadderError::InvalidTransition { current: 2, requested: 1, .. }));
        assert_eq!(store.get_state("t").await.current_level, 2);
    }

    #[tokio::test]
    async fn test_queue_is_fifo() {
        let store = ProgressionStore::new();
        store.set_queue("t", vec!["a".into(), "b".into(), "a".into()]).await;

        assert_eq!(store.pop_queue("t").await.unwrap(), "a");
        assert_eq!(store.pop_queue("t").await.unwrap(), "b");
        assert_eq!(store.pop_queue("t").await.unwrap(), "a");
        assert!(matches!(store.pop_queue("t").await, Err(LadderError::QueueEmpty(_))));
    }

    #[tokio::test]
    async fn test_pop_unknown_topic_is_queue_empty() {
        let store = ProgressionStore::new();
        assert!(matches!(store.pop_queue("nope").await, Err(LadderError::QueueEmpty(_))));
    }

    #[tokio::test]
    async fn test_set_queue_replaces() {
        let store = ProgressionStore::new();
        store.set_queue("t", vec!["a".into(), "b".into()]).await;
        store.set_queue("t", vec!["c".into()]).await;
        let state = store.get_state("t").await;
        assert_eq!(state.pending_queue, VecDeque::from(vec!["c".to_string()]));
    }

    #[tokio::test]
    async fn test_mark_covered() {
        let store = ProgressionStore::new();
        store.mark_covered("t", "Nmap").await;
        store.mark_covered("t", "Burp").await;
        assert_eq!(store.get_state("t").await.covered, vec!["Nmap", "Burp"]);
    }
}
