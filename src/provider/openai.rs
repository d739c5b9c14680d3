use std::fmt::Debug;
use std::time::Duration;

use crate::core::{ChatError, HttpClientConfig};

use super::constants;

/// Where the API key comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum ApiKey {
    /// Read from the `OPENAI_API_KEY` environment variable.
    Default,
    Custom(String),
}

impl ApiKey {
    pub fn resolve(&self) -> Result<String, ChatError> {
        match self {
            ApiKey::Default => std::env::var(constants::API_KEY_ENV_VAR).map_err(|_| {
                ChatError::Configuration(format!("{} not set.", constants::API_KEY_ENV_VAR))
            }),
            ApiKey::Custom(key) => Ok(key.clone()),
        }
    }
}

impl Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiKey::Default => f.write_str("Default"),
            ApiKey::Custom(_) => f.write_str("Custom(<redacted>)"),
        }
    }
}

/// Session configuration with named defaults.
///
/// Everything except the key can be changed with the `with_*` methods; the
/// model, temperature and top-p can also be changed later on the session.
#[derive(Clone)]
pub struct OpenAiConfig {
    api_key: String,
    pub base_url: String,
    pub model: String,
    pub embedding_model: String,
    pub temperature: f64,
    pub top_p: f64,
    /// `user` tag sent when a turn does not supply one.
    pub default_user: String,
    pub user_agent: Option<String>,
    pub http_config: HttpClientConfig,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: constants::API_BASE.to_string(),
            model: constants::DEFAULT_MODEL.to_string(),
            embedding_model: constants::DEFAULT_EMBEDDING_MODEL.to_string(),
            temperature: constants::DEFAULT_TEMPERATURE,
            top_p: constants::DEFAULT_TOP_P,
            default_user: constants::DEFAULT_USER.to_string(),
            user_agent: None,
            http_config: HttpClientConfig::default(),
        }
    }

    pub fn from_api_key(api_key: ApiKey) -> Result<Self, ChatError> {
        Ok(Self::new(api_key.resolve()?))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = top_p;
        self
    }

    pub fn with_default_user(mut self, user: impl Into<String>) -> Self {
        self.default_user = user.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Overall request timeout. Streamed bodies must finish within it too.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_config.timeout = timeout;
        self
    }

    pub fn with_http_config(mut self, config: HttpClientConfig) -> Self {
        self.http_config = config;
        self
    }

    pub(crate) fn auth_header(&self) -> (String, String) {
        (
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        )
    }
}

impl Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("embedding_model", &self.embedding_model)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("default_user", &self.default_user)
            .field("http_config", &self.http_config)
            .finish()
    }
}
