use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Top-level application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Recipe database settings
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Completion API used to structure recipes
    pub llm: LlmConfig,
}

/// Configuration for the SQLite recipe store
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Path of the database file, created if missing
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Upper bound on pooled connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Configuration for the OpenAI-compatible completion API
#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// Model identifier (e.g., "openai/gpt-4o-mini")
    pub model: String,
    /// API key for authentication (can also be set via LLM_PROVIDER_API_KEY)
    pub api_key: Option<String>,
    /// Base URL including the API version; requests go to `{base_url}/chat/completions`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    /// Temperature for generation, provider default when unset
    pub temperature: Option<f32>,
    /// Maximum tokens to generate, provider default when unset
    pub max_tokens: Option<u32>,
}

impl LlmConfig {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: Some(api_key.into()),
            base_url: default_base_url(),
            timeout: default_timeout(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// API key from config first, then from the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|key| !key.is_empty())
            .or_else(|| std::env::var("LLM_PROVIDER_API_KEY").ok())
            .filter(|key| !key.is_empty())
    }
}

fn default_db_path() -> String {
    "./recipes.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_timeout() -> u64 {
    60
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables with SOURDOUGH__ prefix
    /// 2. config.toml file in current directory
    /// 3. Default values
    ///
    /// Environment variable format: SOURDOUGH__LLM__API_KEY
    pub fn load() -> Result<Self, ConfigError> {
        load_config()
    }
}

/// Load configuration from file and environment variables
///
/// See [`AppConfig::load`] for the precedence rules.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let settings = Config::builder()
        // Optional config file (can be missing)
        .add_source(File::with_name("config").required(false))
        // Use double underscore for nested: SOURDOUGH__DATABASE__PATH
        .add_source(
            Environment::with_prefix("SOURDOUGH")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize()
}
