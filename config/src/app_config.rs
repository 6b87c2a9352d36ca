//! Typed application config: `[llm]`, `[checkpoint]` and `[orchestrator]`
//! sections of `config.toml`, with environment overrides on top.
//!
//! | Key | Env override |
//! |-----|--------------|
//! | `llm.provider` (`openai` / `azure` / `mock`) | `TOLLGRAPH_LLM_PROVIDER` |
//! | `llm.model` (Azure: deployment name) | `TOLLGRAPH_MODEL`, `AZURE_OPENAI_DEPLOYMENT` |
//! | `llm.endpoint` | `OPENAI_BASE_URL`, `AZURE_OPENAI_ENDPOINT` |
//! | `llm.api_key` | `OPENAI_API_KEY`, `AZURE_OPENAI_API_KEY` |
//! | `llm.api_version` | `AZURE_OPENAI_API_VERSION` |
//! | `llm.temperature` | `TOLLGRAPH_TEMPERATURE` |
//! | `llm.max_retries` | `TOLLGRAPH_MAX_RETRIES` |
//! | `checkpoint.backend` (`memory` / `sqlite`) | `TOLLGRAPH_CHECKPOINT_BACKEND` |
//! | `checkpoint.path` | `TOLLGRAPH_CHECKPOINT_PATH` |
//! | `orchestrator.recursion_limit` | `TOLLGRAPH_RECURSION_LIMIT` |
//! | `orchestrator.system_prompt` | `TOLLGRAPH_SYSTEM_PROMPT` |
//!
//! Provider-specific variables only apply to their provider.

use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

use crate::{xdg_toml, LoadError};

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_AZURE_DEPLOYMENT: &str = "gpt-4.1";
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-12-01-preview";
pub const DEFAULT_RECURSION_LIMIT: usize = 25;
pub const DEFAULT_MAX_RETRIES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAi,
    Azure,
    /// Offline scripted gateway.
    Mock,
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "azure" => Ok(LlmProvider::Azure),
            "mock" => Ok(LlmProvider::Mock),
            other => Err(format!("unknown llm provider: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    #[default]
    Memory,
    Sqlite,
}

impl FromStr for CheckpointBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CheckpointBackend::Memory),
            "sqlite" => Ok(CheckpointBackend::Sqlite),
            other => Err(format!("unknown checkpoint backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// Model name; for Azure the deployment name. `None` picks the provider default.
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub api_version: Option<String>,
    pub temperature: Option<f32>,
    /// Extra attempts after a transient gateway failure.
    pub max_retries: Option<usize>,
}

impl LlmConfig {
    pub fn model_or_default(&self) -> &str {
        match (&self.model, self.provider) {
            (Some(m), _) => m.as_str(),
            (None, LlmProvider::Azure) => DEFAULT_AZURE_DEPLOYMENT,
            (None, _) => DEFAULT_OPENAI_MODEL,
        }
    }

    pub fn api_version_or_default(&self) -> &str {
        self.api_version.as_deref().unwrap_or(DEFAULT_AZURE_API_VERSION)
    }

    pub fn max_retries_or_default(&self) -> usize {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    pub backend: CheckpointBackend,
    /// SQLite file; `None` uses `default_db_path`.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub recursion_limit: usize,
    pub system_prompt: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub checkpoint: CheckpointConfig,
    pub orchestrator: OrchestratorConfig,
}

impl AppConfig {
    /// Reads `$XDG_CONFIG_HOME/<app_name>/config.toml` (defaults when absent),
    /// then applies environment overrides.
    pub fn load(app_name: &str) -> Result<Self, LoadError> {
        let mut config = match xdg_toml::read_config(app_name)? {
            Some(content) => Self::from_toml_str(&content)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parses the typed sections; unknown sections such as `[env]` are ignored.
    pub fn from_toml_str(content: &str) -> Result<Self, LoadError> {
        Ok(toml::from_str(content)?)
    }

    /// Applies overrides from `get` (normally the process env). Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, get: F) -> Result<(), LoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TOLLGRAPH_LLM_PROVIDER") {
            self.llm.provider = parse_var("TOLLGRAPH_LLM_PROVIDER", &v)?;
        }
        if let Some(v) = get("TOLLGRAPH_MODEL") {
            self.llm.model = Some(v);
        }
        if let Some(v) = get("TOLLGRAPH_TEMPERATURE") {
            self.llm.temperature = Some(parse_var("TOLLGRAPH_TEMPERATURE", &v)?);
        }
        if let Some(v) = get("TOLLGRAPH_MAX_RETRIES") {
            self.llm.max_retries = Some(parse_var("TOLLGRAPH_MAX_RETRIES", &v)?);
        }
        match self.llm.provider {
            LlmProvider::OpenAi => {
                if let Some(v) = get("OPENAI_API_KEY") {
                    self.llm.api_key = Some(v);
                }
                if let Some(v) = get("OPENAI_BASE_URL") {
                    self.llm.endpoint = Some(v);
                }
            }
            LlmProvider::Azure => {
                if let Some(v) = get("AZURE_OPENAI_API_KEY") {
                    self.llm.api_key = Some(v);
                }
                if let Some(v) = get("AZURE_OPENAI_ENDPOINT") {
                    self.llm.endpoint = Some(v);
                }
                if let Some(v) = get("AZURE_OPENAI_API_VERSION") {
                    self.llm.api_version = Some(v);
                }
                if let Some(v) = get("AZURE_OPENAI_DEPLOYMENT") {
                    self.llm.model = Some(v);
                }
            }
            LlmProvider::Mock => {}
        }

        if let Some(v) = get("TOLLGRAPH_CHECKPOINT_BACKEND") {
            self.checkpoint.backend = parse_var("TOLLGRAPH_CHECKPOINT_BACKEND", &v)?;
        }
        if let Some(v) = get("TOLLGRAPH_CHECKPOINT_PATH") {
            self.checkpoint.path = Some(PathBuf::from(v));
        }
        if let Some(v) = get("TOLLGRAPH_RECURSION_LIMIT") {
            self.orchestrator.recursion_limit = parse_var("TOLLGRAPH_RECURSION_LIMIT", &v)?;
        }
        if let Some(v) = get("TOLLGRAPH_SYSTEM_PROMPT") {
            self.orchestrator.system_prompt = Some(v);
        }
        Ok(())
    }

    /// SQLite path from config, or `<data dir>/<app_name>/checkpoints.db`.
    pub fn checkpoint_path(&self, app_name: &str) -> PathBuf {
        self.checkpoint
            .path
            .clone()
            .unwrap_or_else(|| default_db_path(app_name))
    }
}

/// `<data dir>/<app_name>/checkpoints.db`, falling back to the current directory.
pub fn default_db_path(app_name: &str) -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(app_name))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("checkpoints.db")
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, LoadError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| LoadError::InvalidValue {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    /// **Scenario**: Defaults: OpenAI, memory store, recursion limit 25.
    #[test]
    fn defaults_without_file_or_env() {
        let mut c = AppConfig::default();
        c.apply_env_overrides(vars(&[])).unwrap();
        assert_eq!(c.llm.provider, LlmProvider::OpenAi);
        assert_eq!(c.llm.model_or_default(), DEFAULT_OPENAI_MODEL);
        assert_eq!(c.llm.max_retries_or_default(), DEFAULT_MAX_RETRIES);
        assert_eq!(c.checkpoint.backend, CheckpointBackend::Memory);
        assert_eq!(c.orchestrator.recursion_limit, 25);
    }

    /// **Scenario**: All three typed sections parse; `[env]` is ignored.
    #[test]
    fn parses_typed_sections() {
        let c = AppConfig::from_toml_str(
            r#"
[env]
SOMETHING = "x"

[llm]
provider = "azure"
endpoint = "https://example.openai.azure.com/"
temperature = 0.2
max_retries = 4

[checkpoint]
backend = "sqlite"
path = "/tmp/tg.db"

[orchestrator]
recursion_limit = 10
system_prompt = "You trade stocks."
"#,
        )
        .unwrap();
        assert_eq!(c.llm.provider, LlmProvider::Azure);
        assert_eq!(c.llm.model_or_default(), DEFAULT_AZURE_DEPLOYMENT);
        assert_eq!(c.llm.api_version_or_default(), DEFAULT_AZURE_API_VERSION);
        assert_eq!(c.llm.temperature, Some(0.2));
        assert_eq!(c.llm.max_retries_or_default(), 4);
        assert_eq!(c.checkpoint.backend, CheckpointBackend::Sqlite);
        assert_eq!(c.checkpoint_path("tollgraph"), PathBuf::from("/tmp/tg.db"));
        assert_eq!(c.orchestrator.recursion_limit, 10);
        assert_eq!(c.orchestrator.system_prompt.as_deref(), Some("You trade stocks."));
    }

    /// **Scenario**: Azure variables fill the Azure settings and override the file.
    #[test]
    fn azure_env_overrides() {
        let mut c = AppConfig::from_toml_str("[llm]\nprovider = \"azure\"\nmodel = \"old\"\n").unwrap();
        c.apply_env_overrides(vars(&[
            ("AZURE_OPENAI_ENDPOINT", "https://res.openai.azure.com/"),
            ("AZURE_OPENAI_API_KEY", "k"),
            ("AZURE_OPENAI_DEPLOYMENT", "gpt-4.1"),
            ("OPENAI_API_KEY", "ignored"),
        ]))
        .unwrap();
        assert_eq!(c.llm.endpoint.as_deref(), Some("https://res.openai.azure.com/"));
        assert_eq!(c.llm.api_key.as_deref(), Some("k"));
        assert_eq!(c.llm.model.as_deref(), Some("gpt-4.1"));
    }

    /// **Scenario**: The provider override is applied before provider-specific keys.
    #[test]
    fn provider_override_selects_key_source() {
        let mut c = AppConfig::default();
        c.apply_env_overrides(vars(&[
            ("TOLLGRAPH_LLM_PROVIDER", "Azure"),
            ("AZURE_OPENAI_API_KEY", "az"),
            ("OPENAI_API_KEY", "oa"),
        ]))
        .unwrap();
        assert_eq!(c.llm.provider, LlmProvider::Azure);
        assert_eq!(c.llm.api_key.as_deref(), Some("az"));
    }

    /// **Scenario**: Store and orchestrator overrides; empty values are ignored.
    #[test]
    fn store_and_orchestrator_overrides() {
        let mut c = AppConfig::default();
        c.apply_env_overrides(vars(&[
            ("TOLLGRAPH_CHECKPOINT_BACKEND", "sqlite"),
            ("TOLLGRAPH_CHECKPOINT_PATH", "/var/tg.db"),
            ("TOLLGRAPH_RECURSION_LIMIT", "8"),
            ("TOLLGRAPH_SYSTEM_PROMPT", ""),
        ]))
        .unwrap();
        assert_eq!(c.checkpoint.backend, CheckpointBackend::Sqlite);
        assert_eq!(c.checkpoint.path, Some(PathBuf::from("/var/tg.db")));
        assert_eq!(c.orchestrator.recursion_limit, 8);
        assert_eq!(c.orchestrator.system_prompt, None);
    }

    /// **Scenario**: An unparsable override names the offending variable.
    #[test]
    fn invalid_override_is_reported() {
        let mut c = AppConfig::default();
        let err = c
            .apply_env_overrides(vars(&[("TOLLGRAPH_RECURSION_LIMIT", "lots")]))
            .unwrap_err();
        match err {
            LoadError::InvalidValue { key, .. } => assert_eq!(key, "TOLLGRAPH_RECURSION_LIMIT"),
            other => panic!("expected InvalidValue, got {other:?}"),
        }
        assert!(c
            .apply_env_overrides(vars(&[("TOLLGRAPH_CHECKPOINT_BACKEND", "redis")]))
            .is_err());
    }

    /// **Scenario**: `load` reads the XDG file.
    #[test]
    fn load_reads_xdg_file() {
        let c = crate::xdg_toml::tests::with_xdg_config(
            "tollgraph-appcfg-test",
            Some("[orchestrator]\nrecursion_limit = 7\n"),
            || AppConfig::load("tollgraph-appcfg-test"),
        )
        .unwrap();
        assert_eq!(c.orchestrator.recursion_limit, 7);
    }

    /// **Scenario**: The default SQLite path ends in `<app>/checkpoints.db`.
    #[test]
    fn default_db_path_is_under_app_dir() {
        let p = default_db_path("tollgraph");
        assert!(p.ends_with("checkpoints.db"));
    }
}
