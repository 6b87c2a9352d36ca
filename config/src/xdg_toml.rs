//! Locate and read `$XDG_CONFIG_HOME/<app>/config.toml`.
//!
//! The file carries an `[env]` table (applied to the process env by
//! `load_and_apply`) and the typed sections read by `AppConfig`.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::LoadError;

/// Config base dir: `$XDG_CONFIG_HOME` when set, else the platform config dir.
fn config_home() -> Result<PathBuf, LoadError> {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir().ok_or_else(|| LoadError::XdgPath("no config directory for this platform".into()))
}

/// Path of the app's `config.toml`, whether or not it exists.
pub fn config_path(app_name: &str) -> Result<PathBuf, LoadError> {
    Ok(config_home()?.join(app_name).join("config.toml"))
}

/// Contents of the app's `config.toml`; `None` when the file does not exist.
pub fn read_config(app_name: &str) -> Result<Option<String>, LoadError> {
    let path = config_path(app_name)?;
    if !path.is_file() {
        return Ok(None);
    }
    std::fs::read_to_string(&path)
        .map(Some)
        .map_err(LoadError::XdgRead)
}

#[derive(serde::Deserialize, Default)]
struct EnvSection {
    #[serde(default)]
    env: HashMap<String, String>,
}

/// `[env]` entries of the app's config file. Missing file or section gives an empty map.
pub fn load_env_map(app_name: &str) -> Result<HashMap<String, String>, LoadError> {
    let Some(content) = read_config(app_name)? else {
        return Ok(HashMap::new());
    };
    let parsed: EnvSection = toml::from_str(&content)?;
    Ok(parsed.env)
}
