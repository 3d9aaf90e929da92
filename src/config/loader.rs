//! Manifest discovery and loading.

use crate::config::schema::ConvergeConfig;
use crate::error::{ConvergeError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Manifest file names, in lookup order.
pub const CONFIG_CANDIDATES: &[&str] = &["converge.yml", ".converge/config.yml"];

/// Find the manifest for a project root.
pub fn find_config(project_root: &Path) -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(|name| project_root.join(name))
        .find(|path| path.is_file())
}

/// Find the project root by walking up from `start`.
///
/// A directory qualifies when it contains a manifest.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if find_config(&current).is_some() {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load the manifest for a project.
///
/// An explicit `config_override` wins over discovery.
///
/// # Errors
///
/// Returns `ConfigNotFound` if no manifest exists.
/// Returns `ConfigParseError` if the YAML is invalid.
pub fn load_config(project_root: &Path, config_override: Option<&Path>) -> Result<ConvergeConfig> {
    let path = match config_override {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => project_root.join(path),
        None => find_config(project_root).ok_or_else(|| ConvergeError::ConfigNotFound {
            path: project_root.join(CONFIG_CANDIDATES[0]),
        })?,
    };

    tracing::debug!("Loading manifest from {}", path.display());
    load_config_file(&path)
}

/// Load a single manifest file.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid.
pub fn load_config_file(path: &Path) -> Result<ConvergeConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConvergeError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConvergeError::Io(e)
        }
    })?;

    parse_config(&content, path)
}

/// Parse YAML content into a [`ConvergeConfig`].
///
/// An empty document yields the default manifest.
pub fn parse_config(content: &str, source_path: &Path) -> Result<ConvergeConfig> {
    if content.trim().is_empty() {
        return Ok(ConvergeConfig::default());
    }

    serde_yaml::from_str(content).map_err(|e| ConvergeError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}
