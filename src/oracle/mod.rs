//! Oracle boundary - the external text-generation service
//!
//! The engine only ever sees the [`Oracle`] trait. [`client::OracleClient`] is
//! the HTTP implementation; tests drive the engine with scripted oracles.

pub mod client;
pub mod prompts;

use async_trait::async_trait;

use crate::error::LadderError;

pub use client::OracleClient;
pub use prompts::parse_subtopic_list;

/// Sends one prompt and returns the raw answer text.
///
/// Implementations must not retry and must not touch shared state.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn ask(&self, prompt: &str) -> Result<String, LadderError>;

    /// Name used in logs
    fn name(&self) -> &str {
        "oracle"
    }
}
