//! Configuration loading, validation, and management for Anvil.
//!
//! Loads configuration from `~/.anvil/config.toml` with environment
//! variable overrides. Validates all settings at startup; an unreadable or
//! invalid file aborts startup rather than falling back to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.anvil/config.toml`. Constructed once at startup and
/// handed by reference to every component constructor.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Model selection and request settings
    #[serde(default)]
    pub model: ModelConfig,

    /// Turn loop and sandbox settings
    #[serde(default)]
    pub agent: AgentSettings,

    /// Which tools are offered to the model
    #[serde(default)]
    pub tools: ToolActivation,

    /// Process executor settings
    #[serde(default)]
    pub shell: ShellConfig,

    /// Key-value store settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Wiki lookup settings
    #[serde(default)]
    pub wiki: WikiConfig,
}

fn default_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_true() -> bool {
    true
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("agent", &self.agent)
            .field("tools", &self.tools)
            .field("shell", &self.shell)
            .field("database", &self.database)
            .field("wiki", &self.wiki)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model used for the turn loop
    #[serde(default = "default_llm_model")]
    pub llm_model: String,

    /// Model used by the image analyzer
    #[serde(default = "default_image_model")]
    pub image_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Requests per minute per model; 0 disables the waiter
    #[serde(default)]
    pub requests_per_minute: u32,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_llm_model() -> String {
    "gpt-4o-mini".into()
}
fn default_image_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_request_timeout() -> u64 {
    120
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            llm_model: default_llm_model(),
            image_model: default_image_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            requests_per_minute: 0,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Sandbox base directory; every file operation and shell command is
    /// confined to it
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Turn budget per task
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    /// Print tool output after every turn
    #[serde(default = "default_true")]
    pub tool_outputs: bool,

    /// Print the model's full reply instead of just its invocations
    #[serde(default)]
    pub thoughts_in_terminal: bool,
}

fn default_base_dir() -> PathBuf {
    AppConfig::config_dir().join("workspace")
}
fn default_max_turns() -> u32 {
    40
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            max_turns: default_max_turns(),
            tool_outputs: true,
            thoughts_in_terminal: false,
        }
    }
}

/// Tool activation flags. A deactivated tool is neither advertised in the
/// prompt nor reachable through the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolActivation {
    #[serde(default = "default_true")]
    pub file_editor: bool,

    #[serde(default = "default_true")]
    pub shell_executor: bool,

    #[serde(default = "default_true")]
    pub ask_user: bool,

    #[serde(default)]
    pub wiki: bool,

    #[serde(default = "default_true")]
    pub image_analyzer: bool,

    #[serde(default = "default_true")]
    pub database: bool,
}

impl Default for ToolActivation {
    fn default() -> Self {
        Self {
            file_editor: true,
            shell_executor: true,
            ask_user: true,
            wiki: false,
            image_analyzer: true,
            database: true,
        }
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Commands whose trimmed text starts with any of these are refused
    #[serde(default = "default_forbidden_commands")]
    pub forbidden_commands: Vec<String>,

    #[serde(default = "default_shell_timeout")]
    pub timeout_secs: u64,
}

fn default_forbidden_commands() -> Vec<String> {
    vec![
        "rm -rf /".into(),
        "sudo".into(),
        "shutdown".into(),
        "reboot".into(),
        "mkfs".into(),
        "dd if=".into(),
        ":(){".into(),
    ]
}
fn default_shell_timeout() -> u64 {
    300
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            forbidden_commands: default_forbidden_commands(),
            timeout_secs: default_shell_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Location of the persisted key-value document
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

fn default_database_path() -> PathBuf {
    AppConfig::config_dir().join("database.json")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WikiConfig {
    #[serde(default = "default_wiki_url")]
    pub api_url: String,
}

fn default_wiki_url() -> String {
    "https://en.wikipedia.org/w/api.php".into()
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            api_url: default_wiki_url(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.anvil/config.toml).
    ///
    /// Also checks environment variables:
    /// - `ANVIL_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `ANVIL_API_URL`, `ANVIL_MODEL`, `ANVIL_BASE_DIR`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load a specific file, then apply environment overrides and validate.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// A missing file yields the defaults; an unreadable or unparsable file
    /// is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup function.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(key) = var("ANVIL_API_KEY").or_else(|| var("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(url) = var("ANVIL_API_URL") {
            self.api_url = url;
        }
        if let Some(model) = var("ANVIL_MODEL") {
            self.model.llm_model = model;
        }
        if let Some(dir) = var("ANVIL_BASE_DIR") {
            self.agent.base_dir = PathBuf::from(dir);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".anvil")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.temperature < 0.0 || self.model.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_turns == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_turns must be at least 1".into(),
            ));
        }

        if self.agent.base_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "agent.base_dir must not be empty".into(),
            ));
        }

        if self.shell.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "shell.timeout_secs must be at least 1".into(),
            ));
        }

        if self.shell.forbidden_commands.iter().any(|c| c.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "shell.forbidden_commands must not contain empty entries".into(),
            ));
        }

        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "database.path must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: ModelConfig::default(),
            agent: AgentSettings::default(),
            tools: ToolActivation::default(),
            shell: ShellConfig::default(),
            database: DatabaseConfig::default(),
            wiki: WikiConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
