use examiner_core::{agent::AgentSettings, llm_client::CompletionSettings};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub completion_api_base: String,
    pub chat_model: String,
    pub log_level: Level,
    pub prompts_path: PathBuf,
    /// Optional JSON file with `candidates` and `topics`; built-in data otherwise.
    pub exam_data_path: Option<PathBuf>,
    pub max_operation_rounds: usize,
    pub credential_prefix: String,
    pub max_completion_tokens: u32,
    pub temperature: f32,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let defaults = CompletionSettings::default();
        let completion_api_base =
            std::env::var("COMPLETION_API_BASE").unwrap_or(defaults.api_base);
        let chat_model = std::env::var("CHAT_MODEL").unwrap_or(defaults.model);

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        let exam_data_path = std::env::var("EXAM_DATA_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let agent_defaults = AgentSettings::default();
        let max_operation_rounds =
            parse_var("MAX_OPERATION_ROUNDS", agent_defaults.max_operation_rounds)?;
        if max_operation_rounds == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_OPERATION_ROUNDS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let credential_prefix =
            std::env::var("CREDENTIAL_PREFIX").unwrap_or(agent_defaults.credential_prefix);

        let max_completion_tokens =
            parse_var("MAX_COMPLETION_TOKENS", defaults.max_completion_tokens)?;
        let temperature = parse_var("TEMPERATURE", defaults.temperature)?;

        Ok(Self {
            bind_address,
            completion_api_base,
            chat_model,
            log_level,
            prompts_path,
            exam_data_path,
            max_operation_rounds,
            credential_prefix,
            max_completion_tokens,
            temperature,
        })
    }

    pub fn completion_settings(&self) -> CompletionSettings {
        CompletionSettings {
            api_base: self.completion_api_base.clone(),
            model: self.chat_model.clone(),
            max_completion_tokens: self.max_completion_tokens,
            temperature: self.temperature,
        }
    }

    pub fn agent_settings(&self) -> AgentSettings {
        AgentSettings {
            max_operation_rounds: self.max_operation_rounds,
            credential_prefix: self.credential_prefix.clone(),
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("'{raw}': {e}"))),
        Err(_) => Ok(default),
    }
}
