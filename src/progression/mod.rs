//! Progression core
//!
//! The store holds per-topic level and queue state, the aggregator holds the
//! generated content, and the engine drives both from selection events.

pub mod content;
pub mod engine;
pub mod guard;
pub mod store;

pub use content::ContentAggregator;
pub use engine::{EngineSettings, ProgressionEngine};
pub use guard::{BusyPolicy, TopicGuards};
pub use store::ProgressionStore;
