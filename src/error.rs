//! Error taxonomy for the progression core
//!
//! `LadderError` is what the individual components return. The engine wraps
//! whatever ended a selection event in a `SelectionError`, which knows which
//! call failed and how to phrase that for the learner.

use thiserror::Error;

/// Failures raised by the oracle, the registry, the store and the tracker
#[derive(Debug, Error)]
pub enum LadderError {
    /// Transport fault or timeout while talking to the oracle
    #[error("oracle unavailable: {message}")]
    OracleUnavailable { message: String },

    /// The oracle answered, but not with something usable
    #[error("oracle error{}: {message}", status_suffix(.status))]
    OracleError {
        status: Option<u16>,
        message: String,
    },

    /// The oracle answered successfully but the answer was blank
    #[error("oracle returned an empty answer")]
    EmptyAnswer,

    /// The related-topics answer parsed to zero entries
    #[error("malformed related-topics list: {answer:?}")]
    MalformedList { answer: String },

    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    /// Attempted level regression
    #[error("invalid transition for {topic}: level {requested} is below current level {current}")]
    InvalidTransition {
        topic: String,
        current: u32,
        requested: u32,
    },

    /// Popped with nothing queued. Callers check or advance first, so this
    /// indicates a bug rather than a user-facing condition.
    #[error("pending queue is empty for topic {0}")]
    QueueEmpty(String),

    #[error("topic {0} already has a selection in progress")]
    TopicBusy(String),

    #[error("progress {0} is outside 0-100")]
    InvalidProgress(u32),

    #[error("progress storage error: {0}")]
    Persistence(#[from] rusqlite::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl LadderError {
    /// Short classification used in user-facing messages and logs
    pub fn kind(&self) -> &'static str {
        match self {
            LadderError::OracleUnavailable { .. } => "OracleUnavailable",
            LadderError::OracleError { .. } | LadderError::EmptyAnswer => "OracleError",
            LadderError::MalformedList { .. } => "MalformedList",
            LadderError::UnknownTopic(_) => "UnknownTopic",
            LadderError::InvalidTransition { .. } => "InvalidTransition",
            LadderError::QueueEmpty(_) => "QueueEmpty",
            LadderError::TopicBusy(_) => "TopicBusy",
            LadderError::InvalidProgress(_) => "InvalidProgress",
            LadderError::Persistence(_) => "Persistence",
        }
    }

    /// Whether the failure came from the oracle boundary
    pub fn is_oracle_failure(&self) -> bool {
        matches!(
            self,
            LadderError::OracleUnavailable { .. }
                | LadderError::OracleError { .. }
                | LadderError::EmptyAnswer
                | LadderError::MalformedList { .. }
        )
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        LadderError::OracleUnavailable { message: message.into() }
    }

    pub fn bad_response(status: Option<u16>, message: impl Into<String>) -> Self {
        LadderError::OracleError { status, message: message.into() }
    }
}

/// The step of a selection event that was running when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPurpose {
    /// Resolving the topic or acquiring its guard
    Lookup,
    LevelTitle,
    RelatedTopics,
    Content,
    /// Writing results back into the registry or store
    Commit,
}

impl std::fmt::Display for CallPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallPurpose::Lookup => write!(f, "topic lookup"),
            CallPurpose::LevelTitle => write!(f, "level title request"),
            CallPurpose::RelatedTopics => write!(f, "related topics request"),
            CallPurpose::Content => write!(f, "content request"),
            CallPurpose::Commit => write!(f, "progress update"),
        }
    }
}

/// A failed selection event, as reported at the engine boundary
#[derive(Debug, Error)]
#[error("{purpose} failed for topic {topic}: {source}")]
pub struct SelectionError {
    pub topic: String,
    pub purpose: CallPurpose,
    #[source]
    pub source: LadderError,
}

impl SelectionError {
    pub fn new(topic: impl Into<String>, purpose: CallPurpose, source: LadderError) -> Self {
        Self {
            topic: topic.into(),
            purpose,
            source,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.source.kind()
    }

    /// Text shown in the content pane instead of generated content
    pub fn user_message(&self) -> String {
        let headline = match &self.source {
            LadderError::OracleUnavailable { .. } => "The content service could not be reached",
            LadderError::OracleError { .. } | LadderError::EmptyAnswer => {
                "The content service returned an unusable answer"
            }
            LadderError::MalformedList { .. } => "The content service did not suggest any subtopics",
            LadderError::UnknownTopic(_) => "That topic does not exist",
            LadderError::TopicBusy(_) => "This topic is still loading",
            _ => "Something went wrong while updating your progress",
        };

        format!(
            "{}. [{} during {} for '{}'] {}",
            headline,
            self.kind(),
            self.purpose,
            self.topic,
            self.source
        )
    }
}
