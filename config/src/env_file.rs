//! Read the project `.env` into a key-value map without touching the process env.
//!
//! Parsing is delegated to the `dotenv` crate (`KEY=value`, quotes, `export`
//! prefixes, `${VAR}` substitution); applying values is done by `load_and_apply`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::LoadError;

/// `.env` inside `override_dir`, or the current directory when `None`.
fn dotenv_path(override_dir: Option<&Path>) -> Option<PathBuf> {
    let dir = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().ok()?,
    };
    let path = dir.join(".env");
    path.is_file().then_some(path)
}

/// Loads `.env` entries. A missing file yields an empty map; a malformed line is an error.
pub fn load_env_map(override_dir: Option<&Path>) -> Result<HashMap<String, String>, LoadError> {
    let Some(path) = dotenv_path(override_dir) else {
        return Ok(HashMap::new());
    };
    let iter = dotenv::from_path_iter(&path).map_err(LoadError::Dotenv)?;
    let mut out = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(LoadError::Dotenv)?;
        out.insert(key, value);
    }
    Ok(out)
}
