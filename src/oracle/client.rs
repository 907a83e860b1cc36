//! HTTP client for the question/answer oracle endpoint

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::Oracle;
use crate::config::OracleConfig;
use crate::error::LadderError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
const QUESTION_PATH: &str = "/api/question";

#[derive(Debug, Serialize)]
struct QuestionRequest<'a> {
    question: &'a str,
}

/// Oracle reached over `POST /api/question`
#[derive(Clone)]
pub struct OracleClient {
    client: Arc<Client>,
    base_url: String,
}

impl OracleClient {
    /// Create a client without a request timeout
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Arc::new(Client::new()),
            base_url: base_url.into(),
        }
    }

    /// Create a client whose requests give up after `timeout`
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        Self::with_timeout(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), QUESTION_PATH)
    }
}

#[async_trait]
impl Oracle for OracleClient {
    async fn ask(&self, prompt: &str) -> Result<String, LadderError> {
        let endpoint = self.endpoint();
        debug!(endpoint = %endpoint, prompt_len = prompt.len(), "Sending question to oracle");

        let response = self.client
            .post(&endpoint)
            .json(&QuestionRequest { question: prompt })
            .send()
            .await
            .map_err(|e| {
                warn!("Oracle request to {} failed: {}", endpoint, e);
                LadderError::unavailable(format!("request to {} failed: {}", endpoint, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Oracle returned {}: {}", status, crate::truncate_safe(&body, 200));
            return Err(LadderError::bad_response(
                Some(status.as_u16()),
                crate::truncate_safe(&body, 500),
            ));
        }

        let body = response.text().await
            .map_err(|e| LadderError::unavailable(format!("failed to read response body: {}", e)))?;

        let raw: Value = serde_json::from_str(&body).map_err(|e| {
            LadderError::bad_response(
                Some(status.as_u16()),
                format!("failed to parse JSON response: {} (body: {})", e, crate::truncate_safe(&body, 500)),
            )
        })?;

        let answer = match raw.get("answer") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(LadderError::bad_response(
                    Some(status.as_u16()),
                    format!("answer is not a string: {}", crate::truncate_safe(&other.to_string(), 200)),
                ));
            }
            None => {
                return Err(LadderError::bad_response(
                    Some(status.as_u16()),
                    format!("response has no answer field (body: {})", crate::truncate_safe(&body, 500)),
                ));
            }
        };

        if answer.trim().is_empty() {
            return Err(LadderError::EmptyAnswer);
        }

        debug!(answer_len = answer.len(), "Oracle answered");
        Ok(answer)
    }

    fn name(&self) -> &str {
        &self.base_url
    }
}
