use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::import::PollPolicy;
use crate::error::{AppError, AppResult};

const CONFIG_DIR_NAME: &str = "testsmith";
const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_ENV: &str = "TESTSMITH_CONFIG_DIR";
const ENV_PREFIX: &str = "TESTSMITH_";

pub const DEFAULT_XRAY_BASE_URL: &str = "https://xray.cloud.getxray.app/api/v1";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_WORKFLOW_FIELD: &str = "customfield_10059";
pub const DEFAULT_ACCEPTANCE_FIELD: &str = "customfield_10060";
const DEFAULT_RETRIEVAL_MAX_ITEMS: usize = 5;
const DEFAULT_RETRIEVAL_MIN_SCORE: f64 = 0.5;

/// Values persisted in the config file; every key may be overridden by
/// `TESTSMITH_<KEY>` in the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredConfig {
    pub jira_base_url: Option<String>,
    pub jira_email: Option<String>,
    pub jira_token: Option<String>,
    pub jira_workflow_field: Option<String>,
    pub jira_acceptance_field: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub retrieval_base_url: Option<String>,
    pub retrieval_max_items: Option<usize>,
    pub retrieval_min_score: Option<f64>,
    pub xray_base_url: Option<String>,
    pub xray_client_id: Option<String>,
    pub xray_client_secret: Option<String>,
    pub default_test_set: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub poll_max_attempts: Option<u32>,
}

impl StoredConfig {
    pub fn load() -> AppResult<Self> {
        Self::load_from(&config_file_path()?)
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(|err| {
                AppError::Configuration(format!("invalid config file {}: {err}", path.display()))
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(AppError::Io(err)),
        }
    }

    pub fn save(&self) -> AppResult<()> {
        self.save_to(&config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = toml::to_string_pretty(self)
            .map_err(|err| AppError::Configuration(format!("failed to write config: {err}")))?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Overlays values found through `lookup`, keyed by the upper-cased
    /// environment variable name.
    pub fn apply_env<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(&format!("{ENV_PREFIX}{}", key.to_uppercase()))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        override_text(&mut self.jira_base_url, var("jira_base_url"));
        override_text(&mut self.jira_email, var("jira_email"));
        override_text(&mut self.jira_token, var("jira_token"));
        override_text(&mut self.jira_workflow_field, var("jira_workflow_field"));
        override_text(&mut self.jira_acceptance_field, var("jira_acceptance_field"));
        override_text(&mut self.openai_api_key, var("openai_api_key"));
        override_text(&mut self.openai_model, var("openai_model"));
        override_text(&mut self.openai_base_url, var("openai_base_url"));
        override_text(&mut self.retrieval_base_url, var("retrieval_base_url"));
        override_parsed(
            &mut self.retrieval_max_items,
            "retrieval_max_items",
            var("retrieval_max_items"),
        )?;
        override_parsed(
            &mut self.retrieval_min_score,
            "retrieval_min_score",
            var("retrieval_min_score"),
        )?;
        override_text(&mut self.xray_base_url, var("xray_base_url"));
        override_text(&mut self.xray_client_id, var("xray_client_id"));
        override_text(&mut self.xray_client_secret, var("xray_client_secret"));
        override_text(&mut self.default_test_set, var("default_test_set"));
        override_parsed(
            &mut self.poll_interval_secs,
            "poll_interval_secs",
            var("poll_interval_secs"),
        )?;
        override_parsed(
            &mut self.poll_max_attempts,
            "poll_max_attempts",
            var("poll_max_attempts"),
        )?;
        Ok(())
    }
}

fn override_text(target: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *target = value;
    }
}

fn override_parsed<T: std::str::FromStr>(
    target: &mut Option<T>,
    key: &str,
    value: Option<String>,
) -> AppResult<()> {
    if let Some(raw) = value {
        let parsed = raw.parse::<T>().map_err(|_| {
            AppError::Configuration(format!(
                "{ENV_PREFIX}{} has an invalid value: {raw}",
                key.to_uppercase()
            ))
        })?;
        *target = Some(parsed);
    }
    Ok(())
}

pub fn config_directory() -> AppResult<PathBuf> {
    if let Some(dir) = env::var_os(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME))
        .ok_or_else(|| AppError::Configuration("cannot determine config directory".to_string()))
}

pub fn config_file_path() -> AppResult<PathBuf> {
    Ok(config_directory()?.join(CONFIG_FILE_NAME))
}

/// Resolved configuration with defaults applied.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub jira: JiraSettings,
    pub openai: OpenAiSettings,
    pub retrieval: RetrievalSettings,
    pub xray: XraySettings,
    pub poll: PollPolicy,
}

#[derive(Debug, Clone)]
pub struct JiraSettings {
    pub base_url: Option<String>,
    pub email: Option<String>,
    pub token: Option<String>,
    pub workflow_field: String,
    pub acceptance_field: String,
}

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    pub base_url: Option<String>,
    pub max_items: usize,
    pub min_score: f64,
}

#[derive(Debug, Clone)]
pub struct XraySettings {
    pub base_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub default_test_set: Option<String>,
}

impl AppConfig {
    pub fn load() -> AppResult<Self> {
        let mut stored = StoredConfig::load()?;
        stored.apply_env(|key| env::var(key).ok())?;
        Ok(Self::from_stored(stored))
    }

    pub fn from_stored(stored: StoredConfig) -> Self {
        let defaults = PollPolicy::default();
        let poll = PollPolicy {
            interval: stored
                .poll_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.interval),
            max_attempts: stored
                .poll_max_attempts
                .filter(|attempts| *attempts > 0)
                .unwrap_or(defaults.max_attempts),
            ..defaults
        };

        Self {
            jira: JiraSettings {
                base_url: stored.jira_base_url,
                email: stored.jira_email,
                token: stored.jira_token,
                workflow_field: stored
                    .jira_workflow_field
                    .unwrap_or_else(|| DEFAULT_WORKFLOW_FIELD.to_string()),
                acceptance_field: stored
                    .jira_acceptance_field
                    .unwrap_or_else(|| DEFAULT_ACCEPTANCE_FIELD.to_string()),
            },
            openai: OpenAiSettings {
                api_key: stored.openai_api_key,
                model: stored
                    .openai_model
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
                base_url: stored
                    .openai_base_url
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            },
            retrieval: RetrievalSettings {
                base_url: stored.retrieval_base_url,
                max_items: stored
                    .retrieval_max_items
                    .unwrap_or(DEFAULT_RETRIEVAL_MAX_ITEMS),
                min_score: stored
                    .retrieval_min_score
                    .unwrap_or(DEFAULT_RETRIEVAL_MIN_SCORE),
            },
            xray: XraySettings {
                base_url: stored
                    .xray_base_url
                    .unwrap_or_else(|| DEFAULT_XRAY_BASE_URL.to_string()),
                client_id: stored.xray_client_id,
                client_secret: stored.xray_client_secret,
                default_test_set: stored.default_test_set,
            },
            poll,
        }
    }
}
