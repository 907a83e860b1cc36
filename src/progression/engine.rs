//! Progression engine - runs one selection event end to end
//!
//! ```text
//! Idle -> DrainingQueue  ----------------------------------> FetchingContent -> Idle
//!      -> AdvancingLevel -> level title -> related topics -> FetchingContent -> Idle
//! ```
//!
//! Every step that fails ends the event with a `SelectionError`. What was
//! committed before the failure stays committed: a named level survives a
//! failed related-topics or content call. The queue head is only consumed
//! once its content has arrived, so a failed content call leaves the subtopic
//! queued for the next selection.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::content::ContentAggregator;
use super::guard::{BusyPolicy, TopicGuards};
use super::store::ProgressionStore;
use crate::config::ProgressionConfig;
use crate::error::{CallPurpose, LadderError, SelectionError};
use crate::oracle::{parse_subtopic_list, prompts, Oracle};
use crate::progress::{progress_for_level, ProgressTracker};
use crate::topics::TopicRegistry;
use crate::types::{Branch, ProgressionState, SelectionOutcome, Topic};

/// Tunables for the engine
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Number of subtopics requested per level
    pub related_count: usize,
    /// Minimum content length asked for in the content prompt
    pub min_content_chars: usize,
    /// Upper bound for a single oracle call
    pub call_timeout: Duration,
    pub busy_policy: BusyPolicy,
    /// Level that counts as 100% progress
    pub mastery_levels: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            related_count: 5,
            min_content_chars: 300,
            call_timeout: Duration::from_secs(90),
            busy_policy: BusyPolicy::Queue,
            mastery_levels: 10,
        }
    }
}

impl From<&ProgressionConfig> for EngineSettings {
    fn from(config: &ProgressionConfig) -> Self {
        Self {
            related_count: config.related_count,
            min_content_chars: config.min_content_chars,
            call_timeout: Duration::from_secs(config.call_timeout_secs),
            busy_policy: config.busy_policy,
            mastery_levels: config.mastery_levels,
        }
    }
}

struct TrackerBinding {
    tracker: Arc<dyn ProgressTracker>,
    user_id: String,
}

pub struct ProgressionEngine {
    oracle: Arc<dyn Oracle>,
    registry: Arc<TopicRegistry>,
    store: Arc<ProgressionStore>,
    content: Arc<ContentAggregator>,
    guards: TopicGuards,
    tracker: Option<TrackerBinding>,
    settings: EngineSettings,
}

impl ProgressionEngine {
    pub fn new(oracle: Arc<dyn Oracle>, registry: Arc<TopicRegistry>) -> Self {
        Self {
            oracle,
            registry,
            store: Arc::new(ProgressionStore::new()),
            content: Arc::new(ContentAggregator::new()),
            guards: TopicGuards::new(),
            tracker: None,
            settings: EngineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Report level advances for `user_id` to a progress tracker
    pub fn with_tracker(mut self, tracker: Arc<dyn ProgressTracker>, user_id: impl Into<String>) -> Self {
        self.tracker = Some(TrackerBinding {
            tracker,
            user_id: user_id.into(),
        });
        self
    }

    pub fn registry(&self) -> &Arc<TopicRegistry> {
        &self.registry
    }

    pub fn content(&self) -> &Arc<ContentAggregator> {
        &self.content
    }

    pub async fn state(&self, topic_id: &str) -> ProgressionState {
        self.store.get_state(topic_id).await
    }

    pub async fn render(&self, topic_id: &str) -> String {
        self.content.render(topic_id).await
    }

    /// Topics to suggest next; the whole catalog when no tracker is wired
    pub async fn recommendations(&self) -> Result<Vec<String>, LadderError> {
        match &self.tracker {
            Some(binding) => binding.tracker.recommendations_for_user(&binding.user_id).await,
            None => Ok(self
                .registry
                .list_topics()
                .await
                .into_iter()
                .map(|t| t.title)
                .collect()),
        }
    }

    /// Run one selection event for `topic_id`
    pub async fn select(&self, topic_id: &str) -> Result<SelectionOutcome, SelectionError> {
        self.registry
            .get(topic_id)
            .await
            .map_err(|e| SelectionError::new(topic_id, CallPurpose::Lookup, e))?;

        let _guard = self
            .guards
            .acquire(topic_id, self.settings.busy_policy)
            .await
            .map_err(|e| SelectionError::new(topic_id, CallPurpose::Lookup, e))?;

        let result = self.run_selection(topic_id).await;
        match &result {
            Ok(outcome) => info!(
                "Served '{}' for {} (level {}, {} queued)",
                outcome.subtopic, topic_id, outcome.level, outcome.remaining
            ),
            Err(e) => warn!("Selection for {} failed: {}", topic_id, e),
        }
        result
    }

    async fn run_selection(&self, topic_id: &str) -> Result<SelectionOutcome, SelectionError> {
        let topic = self
            .registry
            .get(topic_id)
            .await
            .map_err(|e| SelectionError::new(topic_id, CallPurpose::Lookup, e))?;
        let state = self.store.get_state(topic_id).await;

        let (subtopic, branch) = match state.pending_queue.front() {
            Some(head) => {
                debug!("Draining queue for {}: {} pending", topic_id, state.pending_queue.len());
                (head.clone(), Branch::Drained)
            }
            None => self.advance(&topic, &state).await?,
        };

        let prompt = prompts::content_prompt(
            &subtopic,
            &topic.title,
            self.settings.min_content_chars,
            &state.covered,
        );
        let content = self.ask(topic_id, CallPurpose::Content, &prompt).await?;

        let popped = self
            .store
            .pop_queue(topic_id)
            .await
            .map_err(|e| SelectionError::new(topic_id, CallPurpose::Commit, e))?;
        debug_assert_eq!(popped, subtopic);
        self.store.mark_covered(topic_id, &subtopic).await;
        self.content.append(topic_id, content.clone()).await;

        let after = self.store.get_state(topic_id).await;
        Ok(SelectionOutcome {
            topic_id: topic_id.to_string(),
            subtopic,
            branch,
            level: after.current_level,
            content,
            remaining: after.pending_queue.len(),
        })
    }

    /// Name the next level and refill the queue. Returns the queue head.
    async fn advance(
        &self,
        topic: &Topic,
        state: &ProgressionState,
    ) -> Result<(String, Branch), SelectionError> {
        let new_level = state.current_level + 1;
        debug!("Advancing {} to level {}", topic.id, new_level);

        let prompt = prompts::level_title_prompt(&topic.title, new_level);
        let answer = self.ask(&topic.id, CallPurpose::LevelTitle, &prompt).await?;
        let level_title = clean_level_title(&answer);
        if level_title.is_empty() {
            return Err(SelectionError::new(&topic.id, CallPurpose::LevelTitle, LadderError::EmptyAnswer));
        }

        self.commit_level(&topic.id, new_level, &level_title).await?;
        self.report_progress(topic, new_level).await;

        let prompt = prompts::related_topics_prompt(
            &topic.title,
            new_level,
            &level_title,
            self.settings.related_count,
            &state.covered,
        );
        let answer = match self.ask(&topic.id, CallPurpose::RelatedTopics, &prompt).await {
            Ok(answer) => answer,
            Err(SelectionError { source: LadderError::EmptyAnswer, .. }) => String::new(),
            Err(e) => return Err(e),
        };
        let subtopics = parse_subtopic_list(&answer)
            .map_err(|e| SelectionError::new(&topic.id, CallPurpose::RelatedTopics, e))?;

        info!("Queued {} subtopics for {} level {}", subtopics.len(), topic.id, new_level);
        let head = subtopics[0].clone();
        self.store.set_queue(&topic.id, subtopics).await;

        Ok((head, Branch::Advanced { level: new_level, title: level_title }))
    }

    /// Append the level title and move the store in one step, or do neither
    async fn commit_level(&self, topic_id: &str, new_level: u32, title: &str) -> Result<(), SelectionError> {
        let commit_err = |e| SelectionError::new(topic_id, CallPurpose::Commit, e);

        let appended = self.registry.append_level(topic_id, title).await.map_err(commit_err)?;
        if appended != new_level {
            self.registry.retract_level(topic_id, appended).await;
            return Err(commit_err(LadderError::InvalidTransition {
                topic: topic_id.to_string(),
                current: appended.saturating_sub(1),
                requested: new_level,
            }));
        }

        if let Err(e) = self.store.set_level(topic_id, new_level).await {
            self.registry.retract_level(topic_id, appended).await;
            return Err(commit_err(e));
        }
        Ok(())
    }

    async fn report_progress(&self, topic: &Topic, level: u32) {
        let Some(binding) = &self.tracker else {
            return;
        };
        let progress = progress_for_level(level, self.settings.mastery_levels);
        if let Err(e) = binding
            .tracker
            .update_user_progress(&binding.user_id, &topic.title, progress)
            .await
        {
            warn!("Failed to record progress for {} on {}: {}", binding.user_id, topic.title, e);
        }
    }

    async fn ask(&self, topic_id: &str, purpose: CallPurpose, prompt: &str) -> Result<String, SelectionError> {
        debug!(topic = topic_id, purpose = %purpose, oracle = self.oracle.name(), "Asking oracle");

        let timeout = self.settings.call_timeout;
        let result = match tokio::time::timeout(timeout, self.oracle.ask(prompt)).await {
            Ok(result) => result,
            Err(_) => Err(LadderError::unavailable(format!("no answer within {:?}", timeout))),
        };
        result.map_err(|e| SelectionError::new(topic_id, purpose, e))
    }
}

/// Oracles like to wrap names in quotes or prefix them with "Level 2:"
fn clean_level_title(answer: &str) -> String {
    let first_line = answer.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let unquoted = first_line
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '`')
        .trim();
    strip_level_prefix(unquoted)
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '`')
        .trim()
        .to_string()
}

/// "Level 2: Recon" / "level 2 - Recon" -> "Recon"
fn strip_level_prefix(title: &str) -> &str {
    let Some(head) = title.get(..6) else {
        return title;
    };
    if !head.eq_ignore_ascii_case("level ") {
        return title;
    }
    let rest = &title[6..];
    let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return title;
    }
    let rest = rest[digits..].trim_start();
    match rest.strip_prefix(':').or_else(|| rest.strip_prefix('-')) {
        Some(name) if !name.trim().is_empty() => name.trim_start(),
        _ => title,
    }
}
