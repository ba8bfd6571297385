//! Configuration management for tripmate.
//!
//! All credentials and collaborator endpoints live here and are passed
//! explicitly at construction time; nothing reads module-level globals.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub agent: AgentConfig,
    pub tools: ToolsConfig,
    #[serde(default)]
    pub host: ToolHostConfig,
}

/// Model endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    pub max_tokens: u32,
    /// Model used by the audio transcription helper, not the bridge.
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
}

fn default_base_url() -> String {
    "https://integrate.api.nvidia.com/v1".to_string()
}

fn default_api_key_env() -> String {
    "LLM_API_KEY".to_string()
}

fn default_transcription_model() -> String {
    "microsoft/phi-4-multimodal-instruct".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Cap on model rounds per user message. Exceeding it is a
    /// `DidNotConverge` failure, not a silent truncation.
    pub max_turns: u32,
    pub system_prompt: String,
}

/// Settings for the tool provider (weather / landmarks / static map).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_map_api_key_env")]
    pub api_key_env: String,
    /// Base URL of the weather/place/map collaborator.
    #[serde(default = "default_map_base_url")]
    pub base_url: String,
    /// Directory for the per-query landmark cache files.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    /// Where the rendered map image is written.
    #[serde(default = "default_map_file")]
    pub map_file: PathBuf,
    #[serde(default = "default_keyword")]
    pub default_keyword: String,
}

fn default_map_api_key_env() -> String {
    "AMAP_API_KEY".to_string()
}

fn default_map_base_url() -> String {
    "https://restapi.amap.com/v3".to_string()
}

fn default_map_file() -> PathBuf {
    PathBuf::from("landmarks_map.png")
}

fn default_keyword() -> String {
    "famous sights".to_string()
}

/// How the bridge spawns its tool host subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolHostConfig {
    /// Executable to spawn. Defaults to the current executable with the
    /// `serve-tools` subcommand.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default = "default_host_args")]
    pub args: Vec<String>,
    /// Per-request timeout for tool round trips.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_host_args() -> Vec<String> {
    vec!["serve-tools".to_string()]
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ToolHostConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: default_host_args(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                model: "nvidia/llama-3.1-nemotron-ultra-253b-v1".to_string(),
                base_url: default_base_url(),
                api_key: None,
                api_key_env: default_api_key_env(),
                max_tokens: 4096,
                transcription_model: default_transcription_model(),
            },
            agent: AgentConfig {
                max_turns: 6,
                system_prompt: "You are a helpful travel assistant. Given a city, \
                    use the available tools to look up the weather forecast and to \
                    generate a map of the main sights, then write a friendly \
                    day-by-day itinerary. Only recommend landmarks the tools \
                    returned, and finish with a note that the map has been \
                    generated."
                    .to_string(),
            },
            tools: ToolsConfig {
                api_key: None,
                api_key_env: default_map_api_key_env(),
                base_url: default_map_base_url(),
                cache_dir: None,
                map_file: default_map_file(),
                default_keyword: default_keyword(),
            },
            host: ToolHostConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".tripmate").join("config.toml"))
    }

    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;
            toml::from_str(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            Self::default()
        };

        if let Ok(model) = std::env::var("TRIPMATE_MODEL") {
            config.llm.model = model;
        }
        if let Ok(base_url) = std::env::var("TRIPMATE_BASE_URL") {
            config.llm.base_url = base_url;
        }

        Ok(config)
    }

    /// Bearer credential for the model endpoint.
    pub fn llm_api_key(&self) -> Result<String> {
        resolve_key(&self.llm.api_key, &self.llm.api_key_env)
    }

    pub fn save_default() -> Result<PathBuf> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let default = Self::default();
        let content = toml::to_string_pretty(&default).context("Failed to serialize config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        Ok(config_path)
    }
}

impl ToolsConfig {
    /// API key for the weather/place/map collaborator.
    pub fn api_key(&self) -> Result<String> {
        resolve_key(&self.api_key, &self.api_key_env)
    }

    /// Directory for landmark cache files, created if absent.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let dir = match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => dirs::home_dir()
                .context("Could not determine home directory")?
                .join(".tripmate")
                .join("cache"),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;
        Ok(dir)
    }
}

fn resolve_key(configured: &Option<String>, env_var: &str) -> Result<String> {
    if let Some(key) = configured {
        if !key.is_empty() {
            return Ok(key.clone());
        }
    }
    std::env::var(env_var).with_context(|| {
        format!(
            "API key not found. Either set api_key in {} or export {}=your-key",
            AppConfig::config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            env_var
        )
    })
}
