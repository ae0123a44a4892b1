//! Configuration management with YAML support

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::sync::{RetryPolicy, Schedule};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub reddit: RedditConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    /// Subreddit names seeded into the store before every sync pass
    #[serde(default)]
    pub subreddits: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: String,
}

/// Reddit API credentials and endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// Newest submissions fetched per subreddit and pass
    #[serde(default = "default_listing_limit")]
    pub listing_limit: usize,
}

/// Language model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_llm_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Retry and scheduling intervals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    #[serde(default = "default_run_interval_secs")]
    pub run_interval_secs: u64,

    #[serde(default = "default_rate_limit_cooldown_secs")]
    pub rate_limit_cooldown_secs: u64,
}

// Default value functions
fn default_database_path() -> String {
    "~/.local/share/threadsift/threadsift.db".to_string()
}

fn default_user_agent() -> String {
    "threadsift/0.1".to_string()
}

fn default_api_base() -> String {
    "https://oauth.reddit.com".to_string()
}

fn default_auth_url() -> String {
    "https://www.reddit.com/api/v1/access_token".to_string()
}

fn default_listing_limit() -> usize {
    100
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay_secs() -> u64 {
    15
}

fn default_run_interval_secs() -> u64 {
    20 * 60
}

fn default_rate_limit_cooldown_secs() -> u64 {
    10 * 60
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            username: String::new(),
            password: String::new(),
            user_agent: default_user_agent(),
            api_base: default_api_base(),
            auth_url: default_auth_url(),
            listing_limit: default_listing_limit(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_llm_base_url(),
            temperature: None,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay_secs(),
            run_interval_secs: default_run_interval_secs(),
            rate_limit_cooldown_secs: default_rate_limit_cooldown_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    /// Searches in order:
    /// 1. Provided path
    /// 2. ./threadsift.yaml (current directory)
    /// 3. ~/.config/threadsift/threadsift.yaml
    pub fn load(path: &str) -> Result<Self> {
        let search_paths = vec![
            shellexpand::tilde(path).to_string(),
            "threadsift.yaml".to_string(),
            shellexpand::tilde("~/.config/threadsift/threadsift.yaml").to_string(),
        ];

        for search_path in &search_paths {
            if std::path::Path::new(search_path).exists() {
                let content = std::fs::read_to_string(search_path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                return Ok(config);
            }
        }

        // No config file found, use defaults
        Ok(Config::default())
    }

    /// Apply `THREADSIFT_*` environment overrides for secrets and paths
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let targets: [(&str, &mut String); 6] = [
            ("THREADSIFT_DATABASE_PATH", &mut self.database.path),
            ("THREADSIFT_REDDIT_CLIENT_ID", &mut self.reddit.client_id),
            ("THREADSIFT_REDDIT_CLIENT_SECRET", &mut self.reddit.client_secret),
            ("THREADSIFT_REDDIT_USERNAME", &mut self.reddit.username),
            ("THREADSIFT_REDDIT_PASSWORD", &mut self.reddit.password),
            ("THREADSIFT_OPENAI_API_KEY", &mut self.llm.api_key),
        ];
        for (key, target) in targets {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *target = value;
            }
        }
        self
    }

    /// Get the database path, expanding ~ to home directory
    pub fn database_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.database.path).to_string();
        PathBuf::from(expanded)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.sync.max_retries,
            delay: Duration::from_secs(self.sync.retry_delay_secs),
        }
    }

    pub fn schedule(&self) -> Schedule {
        Schedule {
            run_interval: Duration::from_secs(self.sync.run_interval_secs),
            rate_limit_cooldown: Duration::from_secs(self.sync.rate_limit_cooldown_secs),
        }
    }

    /// Fail early when the Reddit credentials are missing
    pub fn require_reddit_credentials(&self) -> Result<()> {
        let r = &self.reddit;
        if r.client_id.is_empty() || r.client_secret.is_empty() || r.username.is_empty() {
            anyhow::bail!(
                "Reddit credentials missing: set reddit.client_id, reddit.client_secret, \
                 reddit.username and reddit.password (or THREADSIFT_REDDIT_* variables)"
            );
        }
        Ok(())
    }

    pub fn require_llm_credentials(&self) -> Result<()> {
        if self.llm.api_key.is_empty() {
            anyhow::bail!("LLM API key missing: set llm.api_key or THREADSIFT_OPENAI_API_KEY");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sync.max_retries, 5);
        assert_eq!(config.retry_policy().delay, Duration::from_secs(15));
        assert_eq!(config.schedule().run_interval, Duration::from_secs(1200));
        assert_eq!(config.schedule().rate_limit_cooldown, Duration::from_secs(600));
        assert_eq!(config.reddit.listing_limit, 100);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(config.subreddits.is_empty());
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
database:
  path: ~/.local/share/threadsift/test.db

reddit:
  client_id: abc
  client_secret: shh
  username: bot
  password: hunter2
  listing_limit: 25

llm:
  model: gpt-4o
  temperature: 0.2

sync:
  retry_delay_secs: 3

subreddits:
  - rust
  - LocalLLaMA
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.database.path, "~/.local/share/threadsift/test.db");
        assert_eq!(config.reddit.listing_limit, 25);
        assert_eq!(config.reddit.user_agent, "threadsift/0.1");
        assert_eq!(config.llm.temperature, Some(0.2));
        assert_eq!(config.retry_policy().delay, Duration::from_secs(3));
        assert_eq!(config.retry_policy().max_retries, 5);
        assert_eq!(config.subreddits, vec!["rust", "LocalLLaMA"]);
        assert!(config.require_reddit_credentials().is_ok());
        assert!(config.require_llm_credentials().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("THREADSIFT_REDDIT_CLIENT_ID", "from-env"),
            ("THREADSIFT_OPENAI_API_KEY", "sk-test"),
            ("THREADSIFT_REDDIT_USERNAME", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.reddit.username = "kept".to_string();
        let config = config.with_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.reddit.client_id, "from-env");
        assert_eq!(config.llm.api_key, "sk-test");
        assert_eq!(config.reddit.username, "kept");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.yaml");
        std::fs::write(&path, "subreddits: [rust]\n").unwrap();

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.subreddits, vec!["rust"]);
    }
}
