use crate::agent::AgentError;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-0";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_MAX_CYCLES: usize = 25;
pub const DEFAULT_TOOL_TIMEOUT_MS: u64 = 60_000;

/// Runtime settings for the model client and the session
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    /// Upper bound on model requests per user turn
    pub max_cycles: usize,
    pub tool_timeout: Option<Duration>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_cycles: DEFAULT_MAX_CYCLES,
            tool_timeout: Some(Duration::from_millis(DEFAULT_TOOL_TIMEOUT_MS)),
        }
    }
}

impl AgentConfig {
    /// Read settings from the process environment.
    ///
    /// Recognized variables: ANTHROPIC_API_KEY, ANTHROPIC_BASE_URL,
    /// AMIE_MODEL, AMIE_MAX_TOKENS, AMIE_MAX_CYCLES, AMIE_TOOL_TIMEOUT_MS
    /// (0 disables the timeout).
    pub fn from_env() -> Result<Self, AgentError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AgentError> {
        let mut config = Self {
            api_key: lookup("ANTHROPIC_API_KEY").filter(|k| !k.trim().is_empty()),
            ..Self::default()
        };

        if let Some(url) = lookup("ANTHROPIC_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup("AMIE_MODEL") {
            config.model = model;
        }
        if let Some(raw) = lookup("AMIE_MAX_TOKENS") {
            config.max_tokens = parse_number("AMIE_MAX_TOKENS", &raw)?;
        }
        if let Some(raw) = lookup("AMIE_MAX_CYCLES") {
            config.max_cycles = parse_number("AMIE_MAX_CYCLES", &raw)?;
            if config.max_cycles == 0 {
                return Err(AgentError::Configuration("AMIE_MAX_CYCLES must be at least 1".to_string()));
            }
        }
        if let Some(raw) = lookup("AMIE_TOOL_TIMEOUT_MS") {
            let ms: u64 = parse_number("AMIE_TOOL_TIMEOUT_MS", &raw)?;
            config.tool_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }

        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_cycles(mut self, max_cycles: usize) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.tool_timeout = timeout;
        self
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, AgentError> {
    raw.trim()
        .parse()
        .map_err(|_| AgentError::Configuration(format!("{} must be a non-negative integer, got {:?}", key, raw)))
}
