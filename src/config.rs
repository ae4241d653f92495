use std::time::Duration;

use crate::error::{Error, Result};

pub const API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";
pub const BASE_URL_ENV_VAR: &str = "LOGSEARCH_API_BASE";
pub const MODEL_ENV_VAR: &str = "LOGSEARCH_MODEL";

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "tngtech/deepseek-r1t2-chimera:free";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection settings for the classification service.
#[derive(Clone)]
pub struct CompletionSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl std::fmt::Debug for CompletionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CompletionSettings {
    /// Resolve settings from the process environment, after loading a `.env`
    /// file if one exists. The model is taken from, in order of priority:
    /// 1. `model_override` (from --model)
    /// 2. The LOGSEARCH_MODEL environment variable
    /// 3. [`DEFAULT_MODEL`]
    pub fn resolve(model_override: Option<&str>) -> Result<Self> {
        load_dotenv();
        Self::from_lookup(|name| std::env::var(name).ok(), model_override)
    }

    /// Resolve settings through an arbitrary variable lookup.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        model_override: Option<&str>,
    ) -> Result<Self> {
        let non_empty =
            |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = non_empty(API_KEY_ENV_VAR)
            .ok_or(Error::MissingApiKey(API_KEY_ENV_VAR))?;
        let base_url = non_empty(BASE_URL_ENV_VAR)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model = model_override
            .map(str::to_string)
            .or_else(|| non_empty(MODEL_ENV_VAR))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            api_key: api_key.trim().to_string(),
            base_url,
            model,
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }
}

/// Load `.env` from the working directory or one of its parents.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "ignoring unreadable .env file"),
    }
}
