//! Runtime configuration.
//!
//! Everything comes from environment variables (optionally seeded from a
//! `.env` file by the binary). Vendor keys are optional: a tool whose key is
//! missing stays registered and answers every action with a "not configured"
//! error instead.

use crate::errors::AppError;
use std::collections::HashMap;
use std::path::PathBuf;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_COMPOSIO_BASE_URL: &str = "https://backend.composio.dev/api";
pub const DEFAULT_VAPI_BASE_URL: &str = "https://api.vapi.ai";
pub const DEFAULT_COMPOSIO_ENTITY: &str = "default";

const DEFAULT_MAX_STEPS: usize = 50;
const DEFAULT_MAX_OBSERVE: usize = 10_000;
const DEFAULT_PYTHON_TIMEOUT_SECS: u64 = 5;
const CONNECTION_STORE_FILE: &str = ".composio_connections.json";

#[derive(Debug, Clone)]
pub struct ComposioConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub entity_id: String,
    /// app slug -> connected account id, from `COMPOSIO_<APP>_CONNECTION_ID`
    pub connection_ids: HashMap<String, String>,
    /// app slug -> auth config id, from `COMPOSIO_<APP>_AUTH_CONFIG_ID`
    pub auth_config_ids: HashMap<String, String>,
    pub connection_store: PathBuf,
}

#[derive(Debug, Clone)]
pub struct VapiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub phone_number_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub composio: ComposioConfig,
    pub vapi: VapiConfig,
    pub workspace_root: PathBuf,
    pub max_steps: usize,
    pub max_observe: usize,
    pub python_timeout_secs: u64,
    pub python_interpreter: String,
    pub log_level: String,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_vars(std::env::vars())
    }

    /// Build a configuration from an explicit set of variables.
    pub fn from_vars<I>(vars: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        let get = |key: &str| vars.get(key).cloned();

        let workspace_root = match get("DEPTHEON_WORKSPACE") {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir()?,
        };

        let connection_store = get("DEPTHEON_CONNECTION_STORE")
            .map(PathBuf::from)
            .unwrap_or_else(default_connection_store);

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            composio: ComposioConfig {
                api_key: get("COMPOSIO_API_KEY"),
                base_url: get("COMPOSIO_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_COMPOSIO_BASE_URL.to_string()),
                entity_id: get("COMPOSIO_ENTITY_ID")
                    .unwrap_or_else(|| DEFAULT_COMPOSIO_ENTITY.to_string()),
                connection_ids: collect_app_ids(&vars, "_CONNECTION_ID"),
                auth_config_ids: collect_app_ids(&vars, "_AUTH_CONFIG_ID"),
                connection_store,
            },
            vapi: VapiConfig {
                api_key: get("VAPI_API_KEY"),
                base_url: get("VAPI_BASE_URL").unwrap_or_else(|| DEFAULT_VAPI_BASE_URL.to_string()),
                phone_number_id: get("VAPI_PHONE_NUMBER_ID"),
            },
            workspace_root,
            max_steps: parse_or(&vars, "DEPTHEON_MAX_STEPS", DEFAULT_MAX_STEPS)?,
            max_observe: parse_or(&vars, "DEPTHEON_MAX_OBSERVE", DEFAULT_MAX_OBSERVE)?,
            python_timeout_secs: parse_or(
                &vars,
                "DEPTHEON_PYTHON_TIMEOUT",
                DEFAULT_PYTHON_TIMEOUT_SECS,
            )?,
            python_interpreter: get("DEPTHEON_PYTHON").unwrap_or_else(|| "python3".to_string()),
            log_level: get("DEPTHEON_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn default_connection_store() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONNECTION_STORE_FILE)
}

/// Collect `COMPOSIO_<APP><suffix>` variables into an `app -> value` map.
fn collect_app_ids(vars: &HashMap<String, String>, suffix: &str) -> HashMap<String, String> {
    vars.iter()
        .filter_map(|(key, value)| {
            let app = key.strip_prefix("COMPOSIO_")?.strip_suffix(suffix)?;
            if app.is_empty() {
                return None;
            }
            Some((app.to_lowercase(), value.clone()))
        })
        .collect()
}

fn parse_or<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, AppError> {
    match vars.get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::ConfigError(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(default),
    }
}
