use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_CONFIG_PATH: &str = "config/agent.toml";
pub const API_KEY_VAR: &str = "GOOGLE_API_KEY";

pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"
You are a helpful assistant that handles time and scheduling questions.

{{custom_instruction}}

{{tool_guidance}}

Explain the actions you take and keep answers short and concrete.
"#;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: String,
    pub system_prompt: Option<String>,
    pub prompt_template: Option<String>,
    pub server: Option<ServerConfig>,
    pub require_tools: bool,
    pub telemetry: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServerConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub workdir: Option<PathBuf>,
    #[serde(default)]
    pub tools: Vec<ToolConfig>,
    #[serde(default)]
    pub load_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("required environment variable {name} is not set")]
    MissingCredential { name: String },
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    model: Option<String>,
    system_prompt: Option<String>,
    prompt_template: Option<String>,
    server: Option<ServerConfig>,
    #[serde(default)]
    require_tools: bool,
    #[serde(default)]
    telemetry: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawTool {
    Name(String),
    Detailed {
        name: String,
        description: Option<String>,
    },
}

impl<'de> Deserialize<'de> for ToolConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(RawTool::deserialize(deserializer)?.into())
    }
}

impl From<RawTool> for ToolConfig {
    fn from(value: RawTool) -> Self {
        match value {
            RawTool::Name(name) => Self {
                name,
                description: None,
            },
            RawTool::Detailed { name, description } => Self { name, description },
        }
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return read_config(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        match read_config(default_path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!("Configuration file not found; using defaults");
                Ok(Self::default())
            }
            Err(other) => Err(other),
        }
    }

    pub fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_prompt: None,
            prompt_template: Some(DEFAULT_PROMPT_TEMPLATE.to_string()),
            server: None,
            require_tools: false,
            telemetry: false,
        }
    }
}

/// API credentials resolved from the process environment.
///
/// Missing values fail here, before any tool server is spawned or any
/// request leaves the process.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = env::var(API_KEY_VAR)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingCredential {
                name: API_KEY_VAR.to_string(),
            })?;
        Ok(Self { api_key })
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    debug!(path = %path.display(), "Reading agent configuration file");
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(AppConfig {
        model: parsed.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        system_prompt: parsed.system_prompt,
        prompt_template: Some(
            parsed
                .prompt_template
                .unwrap_or_else(|| DEFAULT_PROMPT_TEMPLATE.to_string()),
        ),
        server: parsed.server,
        require_tools: parsed.require_tools,
        telemetry: parsed.telemetry,
    })
}
