use crate::config::Settings;
use crate::error::{ReleaseError, Result};
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Environment variable holding the release API token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Loads a YAML settings file (no secrets). Fields missing from the file keep
/// their defaults.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading settings from file");

    let content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read settings file");
            return Err(ReleaseError::FileAccess {
                path: path_ref.to_path_buf(),
                source: e,
            });
        }
    };

    // An empty document deserializes to unit, not to a mapping.
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }

    match serde_yaml::from_str::<Settings>(&content) {
        Ok(settings) => {
            info!(config_path = ?path_ref, "Parsed settings YAML successfully");
            Ok(settings)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse settings YAML");
            Err(ReleaseError::Settings {
                path: path_ref.to_path_buf(),
                message: format!("failed to parse YAML: {e}"),
            })
        }
    }
}

/// Settings from `path` when given, defaults otherwise.
pub fn load_or_default(path: Option<&Path>) -> Result<Settings> {
    match path {
        Some(path) => load_settings(path),
        None => {
            info!("No settings file given, using defaults");
            Ok(Settings::default())
        }
    }
}

/// Token from the environment, ignoring empty values.
pub fn token_from_env() -> Option<String> {
    match std::env::var(TOKEN_ENV) {
        Ok(token) if !token.trim().is_empty() => {
            info!("{TOKEN_ENV} found in env");
            Some(token)
        }
        _ => None,
    }
}
