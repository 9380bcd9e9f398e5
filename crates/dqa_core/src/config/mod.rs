use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, ErrorKind};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";
pub const MODEL_ENV: &str = "DOCQA_MODEL";

/// What to do when some documents in a batch fail to ingest.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IngestionPolicy {
    Ignore,
    #[default]
    Warn,
    Fail,
}

/// What happens to the previously created vector store when a new run replaces it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexLifecycle {
    Keep,
    #[default]
    DeleteOnReplace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// Observe runs through server-sent events instead of status polling.
    pub streaming: bool,
    pub poll_interval: Duration,
    /// `None` blocks until the vendor reports a terminal state.
    pub run_timeout: Option<Duration>,
    pub request_timeout: Duration,
    pub ingestion_policy: IngestionPolicy,
    pub index_lifecycle: IndexLifecycle,
}

impl OrchestratorConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            streaming: true,
            poll_interval: Duration::from_millis(1000),
            run_timeout: None,
            request_timeout: Duration::from_secs(60),
            ingestion_policy: IngestionPolicy::default(),
            index_lifecycle: IndexLifecycle::default(),
        }
    }

    /// Build a config from `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `DOCQA_MODEL`.
    pub fn from_env() -> Result<Self, AppError> {
        let api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
        let mut cfg = Self::new(api_key);
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                cfg.base_url = url;
            }
        }
        if let Ok(model) = std::env::var(MODEL_ENV) {
            if !model.trim().is_empty() {
                cfg.model = model;
            }
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.api_key.trim().is_empty() {
            return Err(config_error(
                "CONFIG_API_KEY_MISSING",
                "API key is required",
            )
            .with_details(format!("set {API_KEY_ENV}")));
        }
        let url = self.normalized_base_url();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(config_error(
                "CONFIG_BASE_URL_INVALID",
                "Base URL must be an http(s) URL",
            )
            .with_details(format!("base_url={}", self.base_url)));
        }
        if self.model.trim().is_empty() {
            return Err(config_error("CONFIG_MODEL_MISSING", "Model name is required"));
        }
        if self.poll_interval.is_zero() {
            return Err(config_error(
                "CONFIG_POLL_INTERVAL_INVALID",
                "Poll interval must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

fn config_error(code: &str, message: &str) -> AppError {
    AppError::new(code, message).with_kind(ErrorKind::Configuration)
}
