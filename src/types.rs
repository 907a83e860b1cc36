//! Shared types used across modules
//!
//! Kept separate so the registry, the store and the engine can all refer to
//! them without depending on each other.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A subject area with its own independent progression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Stable identifier, unique within the registry
    pub id: String,
    /// Human-readable name, also used in oracle prompts
    pub title: String,
    /// Level titles, index = level number. Append-only.
    pub levels: Vec<String>,
}

impl Topic {
    pub fn new(id: impl Into<String>, title: impl Into<String>, base_level: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            levels: vec![base_level.into()],
        }
    }

    /// Highest named level
    pub fn top_level(&self) -> u32 {
        self.levels.len().saturating_sub(1) as u32
    }

    pub fn level_title(&self, level: u32) -> Option<&str> {
        self.levels.get(level as usize).map(|s| s.as_str())
    }
}

/// Mutable per-topic progression state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionState {
    pub current_level: u32,
    /// Subtopics still to be served for the current level, FIFO
    pub pending_queue: VecDeque<String>,
    /// Subtopics already served, in serving order
    pub covered: Vec<String>,
}

/// Which side of the state machine a selection event went through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Branch {
    /// Served the head of an existing queue
    Drained,
    /// Named a new level and refilled the queue first
    Advanced { level: u32, title: String },
}

/// Result of one successful selection event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionOutcome {
    pub topic_id: String,
    pub subtopic: String,
    pub branch: Branch,
    pub level: u32,
    pub content: String,
    /// Queue length after the served subtopic was removed
    pub remaining: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_topic_starts_at_base_level() {
        let topic = Topic::new("pentesting", "Pentesting", "Getting started");
        assert_eq!(topic.top_level(), 0);
        assert_eq!(topic.level_title(0), Some("Getting started"));
        assert_eq!(topic.level_title(1), None);
    }

    #[test]
    fn test_branch_serialization() {
        let json = serde_json::to_string(&Branch::Advanced { level: 2, title: "Recon".into() }).unwrap();
        assert_eq!(json, r#"{"kind":"advanced","level":2,"title":"Recon"}"#);
        let json = serde_json::to_string(&Branch::Drained).unwrap();
        assert_eq!(json, r#"{"kind":"drained"}"#);
    }
}
