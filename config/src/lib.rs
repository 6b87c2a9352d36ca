//! Load configuration from XDG `config.toml` and project `.env`, then apply to the process
//! environment with priority: **existing env > .env > XDG**.
//!
//! [`AppConfig::load`] then reads the typed `[llm]`, `[checkpoint]` and `[orchestrator]`
//! sections of the same file, with environment overrides on top. With feature
//! `tracing-init`, [`tracing_init`] sets up file and stderr logging for binaries.

mod app_config;
mod env_file;
mod xdg_toml;

#[cfg(feature = "tracing-init")]
pub mod tracing_init;

pub use app_config::{
    default_db_path, AppConfig, CheckpointBackend, CheckpointConfig, LlmConfig, LlmProvider,
    OrchestratorConfig, DEFAULT_AZURE_API_VERSION, DEFAULT_AZURE_DEPLOYMENT, DEFAULT_MAX_RETRIES,
    DEFAULT_OPENAI_MODEL, DEFAULT_RECURSION_LIMIT,
};
pub use xdg_toml::config_path;

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("xdg config path: {0}")]
    XdgPath(String),
    #[error("read xdg config: {0}")]
    XdgRead(std::io::Error),
    #[error("parse xdg toml: {0}")]
    XdgParse(#[from] toml::de::Error),
    #[error("read .env: {0}")]
    Dotenv(dotenv::Error),
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Loads `.env` and the XDG `[env]` table, then sets each key that is **not** already
/// present in the process environment.
///
/// Precedence for a missing key: project `.env` (current directory, or `override_dir`),
/// then `$XDG_CONFIG_HOME/<app_name>/config.toml` `[env]`.
pub fn load_and_apply(app_name: &str, override_dir: Option<&Path>) -> Result<(), LoadError> {
    let xdg_map = xdg_toml::load_env_map(app_name)?;
    let dotenv_map = env_file::load_env_map(override_dir)?;

    let keys: HashSet<&String> = xdg_map.keys().chain(dotenv_map.keys()).collect();
    for key in keys {
        if std::env::var_os(key).is_some() {
            continue;
        }
        if let Some(value) = dotenv_map.get(key).or_else(|| xdg_map.get(key)) {
            std::env::set_var(key, value);
        }
    }
    Ok(())
}
