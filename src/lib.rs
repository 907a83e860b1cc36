//! Topic Ladder - level-by-level security learning paths
//!
//! Each topic climbs an open-ended ladder of levels. Selecting a topic either
//! serves the next queued subtopic of the current level or, once the queue is
//! empty, asks the oracle to name the next level and suggest its subtopics.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use topic_ladder::{OracleClient, ProgressionEngine, TopicRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let oracle = Arc::new(OracleClient::new("http://127.0.0.1:5000"));
//!     let engine = ProgressionEngine::new(oracle, Arc::new(TopicRegistry::with_defaults()));
//!     let outcome = engine.select("pentesting").await?;
//!     println!("{}", outcome.content);
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod error;
pub mod oracle;
pub mod topics;
pub mod progression;
pub mod progress;
pub mod config;
pub mod session;
pub mod cli;

pub use types::{Branch, ProgressionState, SelectionOutcome, Topic};
pub use error::{CallPurpose, LadderError, SelectionError};
pub use oracle::{Oracle, OracleClient};
pub use topics::{TopicRegistry, TopicSeed};
pub use progression::{
    BusyPolicy,
    ContentAggregator,
    EngineSettings,
    ProgressionEngine,
    ProgressionStore,
};
pub use progress::{InMemoryProgressTracker, ProgressTracker, SqliteProgressTracker};
pub use config::Config;
pub use session::LearningSession;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Cut `s` to at most `max` bytes without splitting a character
pub fn truncate_safe(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_safe() {
        assert_eq!(truncate_safe("short", 10), "short");
        assert_eq!(truncate_safe("abcdef", 3), "abc...");
        // 'é' is two bytes; never split it
        assert_eq!(truncate_safe("éé", 3), "é...");
    }
}
