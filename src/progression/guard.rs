//! Per-topic mutual exclusion for selection events
//!
//! A topic never has two selection events in flight. Different topics do not
//! contend with each other.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::error::LadderError;

/// What to do with a selection that arrives while the topic is busy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyPolicy {
    /// Wait for the running event, then run against the updated state
    #[default]
    Queue,
    /// Fail immediately with `TopicBusy`
    Reject,
}

impl std::fmt::Display for BusyPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BusyPolicy::Queue => write!(f, "queue"),
            BusyPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Held for the duration of one selection event; released on drop
pub struct TopicGuard {
    topic_id: String,
    _permit: OwnedMutexGuard<()>,
}

impl Drop for TopicGuard {
    fn drop(&mut self) {
        debug!("Released selection guard for {}", self.topic_id);
    }
}

#[derive(Default)]
pub struct TopicGuards {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TopicGuards {
    pub fn new() -> Self {
        Self::default()
    }

    async fn lock_for(&self, topic_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(topic_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn acquire(&self, topic_id: &str, policy: BusyPolicy) -> Result<TopicGuard, LadderError> {
        let lock = self.lock_for(topic_id).await;
        let permit = match policy {
            BusyPolicy::Queue => lock.lock_owned().await,
            BusyPolicy::Reject => lock
                .try_lock_owned()
                .map_err(|_| LadderError::TopicBusy(topic_id.to_string()))?,
        };
        debug!("Acquired selection guard for {}", topic_id);
        Ok(TopicGuard {
            topic_id: topic_id.to_string(),
            _permit: permit,
        })
    }
}
