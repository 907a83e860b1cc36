//! Configuration management
//!
//! Oracle endpoint, progression tunables, the optional progress database and
//! the topic catalog. Stored as TOML in the platform config directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::oracle::client::DEFAULT_BASE_URL;
use crate::progression::BusyPolicy;
use crate::topics::{default_seeds, TopicSeed, DEFAULT_BASE_LEVEL_TITLE};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Oracle endpoint settings
    #[serde(default)]
    pub oracle: OracleConfig,
    /// Progression engine tunables
    #[serde(default)]
    pub progression: ProgressionConfig,
    /// Learner progress persistence
    #[serde(default)]
    pub progress: ProgressConfig,
    /// Topic catalog override; the built-in catalog is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<TopicSeed>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Base address of the question endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// HTTP request timeout (seconds)
    #[serde(default = "default_oracle_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_oracle_timeout() -> u64 {
    60
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_oracle_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionConfig {
    /// Subtopics requested per level
    #[serde(default = "default_related_count")]
    pub related_count: usize,
    /// Minimum content length asked of the oracle
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,
    /// Per-call bound enforced by the engine (seconds)
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
    /// What to do when a topic is selected while it is still loading
    #[serde(default)]
    pub busy_policy: BusyPolicy,
    /// Level treated as 100% progress
    #[serde(default = "default_mastery_levels")]
    pub mastery_levels: u32,
    /// Title of level 0 for every topic
    #[serde(default = "default_base_level_title")]
    pub base_level_title: String,
}

fn default_related_count() -> usize {
    5
}

fn default_min_content_chars() -> usize {
    300
}

fn default_call_timeout() -> u64 {
    90
}

fn default_mastery_levels() -> u32 {
    10
}

fn default_base_level_title() -> String {
    DEFAULT_BASE_LEVEL_TITLE.to_string()
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            related_count: default_related_count(),
            min_content_chars: default_min_content_chars(),
            call_timeout_secs: default_call_timeout(),
            busy_policy: BusyPolicy::default(),
            mastery_levels: default_mastery_levels(),
            base_level_title: default_base_level_title(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Record level advances in the progress database
    #[serde(default)]
    pub enabled: bool,
    /// Learner id; a fresh one is generated per session when unset
    #[serde(default)]
    pub user_id: Option<String>,
    /// Database location; defaults to `<data dir>/progress.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default location, writing defaults on first use
    pub fn load() -> Result<Self> {
        let config_path = config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every selection fail
    pub fn validate(&self) -> Result<()> {
        if self.oracle.timeout_secs == 0 {
            anyhow::bail!("oracle.timeout_secs must be at least 1");
        }
        if self.progression.related_count == 0 {
            anyhow::bail!("progression.related_count must be at least 1");
        }
        if self.progression.call_timeout_secs == 0 {
            anyhow::bail!("progression.call_timeout_secs must be at least 1");
        }
        Ok(())
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent().context("Config path has no parent")?;

        std::fs::create_dir_all(parent).context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Topic catalog to seed the registry with
    pub fn topic_seeds(&self) -> Vec<TopicSeed> {
        match &self.topics {
            Some(seeds) if !seeds.is_empty() => seeds.clone(),
            _ => default_seeds(),
        }
    }

    pub fn progress_db_path(&self) -> Result<PathBuf> {
        match &self.progress.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("progress.db")),
        }
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "topic-ladder", "topic-ladder")
        .context("Failed to get project directories")
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.toml"))
}

/// Get the data directory path
pub fn data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

/// Show current configuration
pub fn show_config(config: &Config) -> Result<()> {
    println!("Oracle:");
    println!("  base_url:          {}", config.oracle.base_url);
    println!("  timeout:           {}s", config.oracle.timeout_secs);
    println!("Progression:");
    println!("  related topics:    {}", config.progression.related_count);
    println!("  min content chars: {}", config.progression.min_content_chars);
    println!("  call timeout:      {}s", config.progression.call_timeout_secs);
    println!("  busy policy:       {}", config.progression.busy_policy);
    println!("  mastery levels:    {}", config.progression.mastery_levels);
    println!("Progress tracking:   {}", if config.progress.enabled { "enabled" } else { "disabled" });
    if config.progress.enabled {
        println!("  database:          {}", config.progress_db_path()?.display());
    }
    println!("Topics:");
    for seed in config.topic_seeds() {
        println!("  {:<20} {}", seed.id, seed.title);
    }
    Ok(())
}

/// Point the client at a different oracle, in `path` or the default config file
pub fn set_oracle_url(path: Option<&Path>, url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("Oracle URL must start with http:// or https://: {}", url);
    }
    let path = resolve_path(path)?;
    let mut config = if path.exists() {
        Config::load_from(&path)?
    } else {
        Config::default()
    };
    config.oracle.base_url = url.trim_end_matches('/').to_string();
    config.save_to(&path)?;
    println!("Oracle URL set to {} in {}", config.oracle.base_url, path.display());
    Ok(())
}

/// Reset configuration to defaults, in `path` or the default config file
pub fn reset_config(path: Option<&Path>) -> Result<()> {
    let path = resolve_path(path)?;
    Config::default().save_to(&path)?;
    println!("Configuration at {} reset to defaults.", path.display());
    Ok(())
}

fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => config_path(),
    }
}

/// Get default configuration as TOML string
pub fn default_config_toml() -> String {
    let config = Config::default();
    toml::to_string_pretty(&config).unwrap_or_else(|_| "# Default configuration\n".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.oracle.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.progression.related_count, 5);
        assert_eq!(config.progression.busy_policy, BusyPolicy::Queue);
        assert_eq!(config.topic_seeds().len(), 5);
    }

    #[test]
    fn test_partial_sections() {
        let toml = r#"
[oracle]
base_url = "http://oracle.local:8000"

[progression]
busy_policy = "reject"
mastery_levels = 4

[[topics]]
id = "web"
title = "Web Security"
"#;
        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.oracle.base_url, "http://oracle.local:8000");
        assert_eq!(config.oracle.timeout_secs, 60);
        assert_eq!(config.progression.busy_policy, BusyPolicy::Reject);
        assert_eq!(config.progression.mastery_levels, 4);
        assert_eq!(config.progression.min_content_chars, 300);
        assert_eq!(config.topic_seeds(), vec![TopicSeed::new("web", "Web Security")]);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        assert!(Config::from_toml_str("oracle = [").is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join("config.toml");

        let mut config = Config::default();
        config.progress.enabled = true;
        config.progress.user_id = Some("learner-1".into());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_default_toml_parses() {
        let toml = default_config_toml();
        assert!(toml.contains("[oracle]"));
        assert_eq!(Config::from_toml_str(&toml).unwrap(), Config::default());
    }

    #[test]
    fn test_zero_values_rejected() {
        for toml in [
            "[progression]\nrelated_count = 0",
            "[progression]\ncall_timeout_secs = 0",
            "[oracle]\ntimeout_secs = 0",
        ] {
            let err = Config::from_toml_str(toml).unwrap_err();
            assert!(err.to_string().contains("must be at least 1"), "{toml}: {err}");
        }
        assert!(Config::from_toml_str("[progression]\nrelated_count = 1").is_ok());
    }

    #[test]
    fn test_set_oracle_url_writes_given_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        let mut config = Config::default();
        config.progression.mastery_levels = 4;
        config.save_to(&path).unwrap();

        set_oracle_url(Some(&path), "http://oracle.lan:9000/").unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.oracle.base_url, "http://oracle.lan:9000");
        assert_eq!(loaded.progression.mastery_levels, 4);
    }

    #[test]
    fn test_set_oracle_url_rejects_bad_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        assert!(set_oracle_url(Some(&path), "oracle.lan:9000").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_reset_config_writes_given_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("custom.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[oracle]\nbase_url = \"http://elsewhere\"\n").unwrap();

        reset_config(Some(&path)).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_explicit_database_path() {
        let mut config = Config::default();
        config.progress.database_path = Some(PathBuf::from("/tmp/ladder.db"));
        assert_eq!(config.progress_db_path().unwrap(), PathBuf::from("/tmp/ladder.db"));
    }
}
