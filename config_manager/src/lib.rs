//! Centralized configuration for the discovery-and-scoring pipeline.
//!
//! Loads, in this precedence order (lowest to highest):
//! 1. Built-in defaults.
//! 2. Environment variables (credentials especially).
//! 3. The JSON config file at `~/.opportunity-copilot/config.json` (or an
//!    explicit path) — a config-file value wins over an environment
//!    variable when both are present.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use error_types::ConfigError;
use serde::{Deserialize, Serialize};

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Per-adapter credential bundle: id / secret / user-agent / api-token.
/// Not every adapter uses every field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterCredentials {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
}

impl AdapterCredentials {
    fn merge_present(&mut self, other: AdapterCredentials) {
        if other.client_id.is_some() {
            self.client_id = other.client_id;
        }
        if other.client_secret.is_some() {
            self.client_secret = other.client_secret;
        }
        if other.user_agent.is_some() {
            self.user_agent = other.user_agent;
        }
        if other.api_token.is_some() {
            self.api_token = other.api_token;
        }
    }
}

/// Merged application configuration, matching the `config.json` schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm_provider: String,
    pub llm_request_delay: f64,
    pub active_scrapers: Vec<String>,
    pub default_scraper: Option<String>,
    pub storage_provider: String,
    pub db_path: String,
    #[serde(default)]
    pub subreddits: Vec<String>,
    #[serde(default)]
    pub credentials: HashMap<String, AdapterCredentials>,
}

/// The subset of keys a JSON config file is allowed to set; every field is
/// optional so a config file can override only what it cares about.
#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    llm_provider: Option<String>,
    llm_request_delay: Option<f64>,
    active_scrapers: Option<Vec<String>>,
    default_scraper: Option<String>,
    storage_provider: Option<String>,
    db_path: Option<String>,
    subreddits: Option<Vec<String>>,
    #[serde(default)]
    credentials: HashMap<String, AdapterCredentials>,
}

impl AppConfig {
    fn defaults() -> Self {
        AppConfig {
            llm_provider: "hosted".to_string(),
            llm_request_delay: 2.0,
            active_scrapers: vec!["discussion-forum".to_string()],
            default_scraper: Some("discussion-forum".to_string()),
            storage_provider: "sqlite".to_string(),
            db_path: default_db_path(),
            subreddits: vec!["SaaS".to_string(), "startups".to_string()],
            credentials: HashMap::new(),
        }
    }

    /// Env vars may supply credentials for any adapter:
    /// `<ADAPTER>_CLIENT_ID`, `<ADAPTER>_CLIENT_SECRET`, `<ADAPTER>_USER_AGENT`,
    /// `<ADAPTER>_API_TOKEN`, with `<ADAPTER>` the adapter name upper-cased and
    /// `-` replaced by `_` (e.g. `DISCUSSION_FORUM_CLIENT_ID`).
    fn apply_env(&mut self, adapter_names: &[&str]) {
        if let Some(provider) = env_nonempty("LLM_PROVIDER") {
            self.llm_provider = provider;
        }
        if let Some(delay) = env_nonempty("LLM_REQUEST_DELAY").and_then(|s| s.parse().ok()) {
            self.llm_request_delay = delay;
        }
        if let Some(db_path) = env_nonempty("DB_PATH") {
            self.db_path = db_path;
        }
        for name in adapter_names {
            let prefix = name.to_uppercase().replace('-', "_");
            let creds = AdapterCredentials {
                client_id: env_nonempty(&format!("{prefix}_CLIENT_ID")),
                client_secret: env_nonempty(&format!("{prefix}_CLIENT_SECRET")),
                user_agent: env_nonempty(&format!("{prefix}_USER_AGENT")),
                api_token: env_nonempty(&format!("{prefix}_API_TOKEN")),
            };
            self.credentials
                .entry((*name).to_string())
                .or_default()
                .merge_present(creds);
        }
    }

    fn apply_file(&mut self, partial: PartialConfig) {
        if let Some(v) = partial.llm_provider {
            self.llm_provider = v;
        }
        if let Some(v) = partial.llm_request_delay {
            self.llm_request_delay = v;
        }
        if let Some(v) = partial.active_scrapers {
            self.active_scrapers = v;
        }
        if partial.default_scraper.is_some() {
            self.default_scraper = partial.default_scraper;
        }
        if let Some(v) = partial.storage_provider {
            self.storage_provider = v;
        }
        if let Some(v) = partial.db_path {
            self.db_path = v;
        }
        if let Some(v) = partial.subreddits {
            self.subreddits = v;
        }
        for (name, creds) in partial.credentials {
            self.credentials.entry(name).or_default().merge_present(creds);
        }
    }

    /// Load configuration: defaults, then env vars, then the JSON config
    /// file (which wins over env when both set a value). `path` defaults to
    /// `~/.opportunity-copilot/config.json`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        crate::load_dotenv_best_effort();

        const KNOWN_ADAPTERS: &[&str] = &[
            "discussion-forum",
            "news-aggregator",
            "review-platform-a",
            "review-platform-b",
            "product-launch",
        ];

        let mut config = Self::defaults();
        config.apply_env(KNOWN_ADAPTERS);

        let path = path.map(PathBuf::from).unwrap_or_else(default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::LoadFailed(format!("{}: {e}", path.display())))?;
            let partial: PartialConfig = serde_json::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            config.apply_file(partial);
        }

        Ok(config)
    }

    pub fn save(&self, path: Option<&Path>) -> Result<(), ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_config_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        std::fs::write(&path, json).map_err(|e| ConfigError::LoadFailed(e.to_string()))?;
        Ok(())
    }

    pub fn credentials_for(&self, adapter: &str) -> AdapterCredentials {
        self.credentials.get(adapter).cloned().unwrap_or_default()
    }
}

fn default_db_path() -> String {
    home_dir()
        .join(".opportunity-copilot")
        .join("opportunities.db")
        .to_string_lossy()
        .to_string()
}

fn default_config_path() -> PathBuf {
    home_dir().join(".opportunity-copilot").join("config.json")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Walk up from the current directory looking for a `.env` file, mirroring
/// how a workspace binary run from a subdirectory still picks up the root
/// `.env`. Best-effort: a missing `.env` anywhere is not an error.
pub fn load_dotenv_best_effort() {
    if dotenvy::dotenv().is_ok() {
        return;
    }
    if let Ok(mut dir) = std::env::current_dir() {
        loop {
            let candidate = dir.join(".env");
            if candidate.exists() && dotenvy::from_path(&candidate).is_ok() {
                return;
            }
            if !dir.pop() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_defaults() {
        std::env::set_var("LLM_PROVIDER", "local");
        std::env::set_var("DISCUSSION_FORUM_CLIENT_ID", "abc123");

        let mut config = AppConfig::defaults();
        config.apply_env(&["discussion-forum"]);

        assert_eq!(config.llm_provider, "local");
        assert_eq!(
            config.credentials_for("discussion-forum").client_id.as_deref(),
            Some("abc123")
        );

        std::env::remove_var("LLM_PROVIDER");
        std::env::remove_var("DISCUSSION_FORUM_CLIENT_ID");
    }

    #[test]
    fn config_file_wins_over_env() {
        std::env::set_var("LLM_PROVIDER", "local");
        let mut config = AppConfig::defaults();
        config.apply_env(&["discussion-forum"]);
        config.apply_file(PartialConfig {
            llm_provider: Some("mock".to_string()),
            ..Default::default()
        });
        assert_eq!(config.llm_provider, "mock");
        std::env::remove_var("LLM_PROVIDER");
    }
}
