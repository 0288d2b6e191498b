// shared-types-rs/src/config.rs
// Configuration loader for the analyst pipeline.
//
// Loaded explicitly by the hosting binary and handed to the orchestrator;
// there is no process-wide instance.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::outcome::ExecutionMode;

pub const CONFIG_PATH_VAR: &str = "ANALYST_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "./config/analyst.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnalystConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub models: ModelsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub default_mode: ExecutionMode,
    pub generation_timeout_secs: u64,
    pub tool_timeout_secs: u64,
    pub max_examples: usize,
    pub fallback_enabled: bool,
    pub session_idle_ttl_secs: u64,
    /// "heuristic" or "model"
    pub summarizer: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_mode: ExecutionMode::Online,
            generation_timeout_secs: 60,
            tool_timeout_secs: 30,
            max_examples: 3,
            fallback_enabled: true,
            session_idle_ttl_secs: 1800,
            summarizer: "heuristic".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: String,
    pub log_collection: String,
    pub directory_collections: Vec<String>,
    pub known_programs: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            log_collection: "query_logs".to_string(),
            directory_collections: vec![
                "students".to_string(),
                "faculty".to_string(),
                "staff".to_string(),
                "schedules".to_string(),
                "grades".to_string(),
                "curriculum".to_string(),
            ],
            known_programs: vec![
                "BSCS".to_string(),
                "BSIT".to_string(),
                "BSIS".to_string(),
                "BSEMC".to_string(),
                "BSA".to_string(),
                "BSBA".to_string(),
                "BSED".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelEndpoint {
    pub api_url: String,
    pub planner_model: String,
    pub synth_model: String,
    /// Name of the environment variable holding the API key, if any.
    pub api_key_var: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub online: ModelEndpoint,
    pub offline: ModelEndpoint,
}

impl Default for ModelEndpoint {
    fn default() -> Self {
        Self {
            api_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            planner_model: "mistralai/mistral-7b-instruct".to_string(),
            synth_model: "mistralai/mistral-7b-instruct".to_string(),
            api_key_var: Some("LLM_API_KEY".to_string()),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            online: ModelEndpoint::default(),
            offline: ModelEndpoint {
                api_url: "http://localhost:11434/v1/chat/completions".to_string(),
                planner_model: "mistral:instruct".to_string(),
                synth_model: "mistral:instruct".to_string(),
                api_key_var: None,
            },
        }
    }
}

impl AnalystConfig {
    /// Load configuration from the file named by `ANALYST_CONFIG_PATH`.
    ///
    /// A missing file yields defaults; environment overrides are applied last.
    pub fn load() -> Result<AnalystConfig, ConfigError> {
        let config_path =
            env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let path = PathBuf::from(&config_path);

        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            tracing::info!(path = %config_path, "no configuration file, using defaults");
            AnalystConfig::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file without applying overrides.
    pub fn from_file(path: &Path) -> Result<AnalystConfig, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<AnalystConfig, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(mode) = config_rs::get_env_string("ANALYST_EXECUTION_MODE") {
            self.pipeline.default_mode = mode
                .parse()
                .map_err(|e: crate::outcome::ModeParseError| ConfigError::InvalidValue(e.to_string()))?;
        }
        if let Some(dir) = config_rs::get_env_string("ANALYST_DATA_DIR") {
            self.store.data_dir = dir;
        }
        self.pipeline.generation_timeout_secs = config_rs::get_env_var(
            "ANALYST_GENERATION_TIMEOUT_SECS",
            self.pipeline.generation_timeout_secs,
        );
        self.pipeline.max_examples =
            config_rs::get_env_var("ANALYST_MAX_EXAMPLES", self.pipeline.max_examples);
        self.pipeline.fallback_enabled =
            config_rs::get_env_bool("ANALYST_FALLBACK_ENABLED", self.pipeline.fallback_enabled);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.generation_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "pipeline.generation_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.pipeline.tool_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "pipeline.tool_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.store.log_collection.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "store.log_collection must not be empty".to_string(),
            ));
        }
        if !matches!(self.pipeline.summarizer.as_str(), "heuristic" | "model") {
            return Err(ConfigError::InvalidValue(format!(
                "pipeline.summarizer must be 'heuristic' or 'model', got '{}'",
                self.pipeline.summarizer
            )));
        }
        Ok(())
    }
}
