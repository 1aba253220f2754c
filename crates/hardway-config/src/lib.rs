pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{ImageSettings, Settings, TierSettings};

use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "HARDWAY_CONFIG_PATH";
pub const REGION_ENV: &str = "HARDWAY_REGION";
pub const WORKSTATION_ENV: &str = "HARDWAY_WORKSTATION";
pub const SSH_KEY_PAIR_ENV: &str = "HARDWAY_SSH_KEY_PAIR";
pub const IMAGE_ID_ENV: &str = "HARDWAY_IMAGE_ID";

const CANDIDATES: [&str; 4] = [
    "hardway.local.yaml",
    ".hardway.local.yaml",
    "hardway.yaml",
    ".hardway.yaml",
];

/// Locate the settings file
///
/// Search order:
/// 1. `HARDWAY_CONFIG_PATH` (must exist when set)
/// 2. current directory: hardway.local.yaml, .hardway.local.yaml, hardway.yaml, .hardway.yaml
/// 3. `./.hardway/` with the same names
/// 4. `~/.config/hardway/hardway.yaml`
///
/// Returns `Ok(None)` when nothing is found; built-in defaults apply then.
pub fn find_config_file() -> Result<Option<PathBuf>> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::ConfigFileNotFound(path));
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    let project_dir = current_dir.join(".hardway");
    if project_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = project_dir.join(filename);
            if path.exists() {
                return Ok(Some(path));
            }
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("hardway").join("hardway.yaml");
        if global_config.exists() {
            return Ok(Some(global_config));
        }
    }

    Ok(None)
}

/// Read settings from a YAML file
pub fn load_settings_file(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path)?;
    Settings::from_yaml(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Apply `HARDWAY_*` environment overrides on top of loaded settings
pub fn apply_env_overrides(settings: &mut Settings) -> Result<()> {
    if let Some(region) = env_override(REGION_ENV)? {
        settings.region = region;
    }
    if let Some(workstation) = env_override(WORKSTATION_ENV)? {
        settings.workstation = Some(workstation);
    }
    if let Some(key_pair) = env_override(SSH_KEY_PAIR_ENV)? {
        settings.ssh_key_pair = key_pair;
    }
    if let Some(ami_id) = env_override(IMAGE_ID_ENV)? {
        settings.image.ami_id = Some(ami_id);
    }
    Ok(())
}

fn env_override(key: &str) -> Result<Option<String>> {
    match std::env::var(key) {
        Ok(value) if value.trim().is_empty() => Err(ConfigError::InvalidOverride {
            key: key.to_string(),
            value,
        }),
        Ok(value) => Ok(Some(value.trim().to_string())),
        Err(_) => Ok(None),
    }
}

/// Load settings once: explicit path, else discovery, else defaults; then env
///
/// Returns the settings together with the file they came from, if any.
pub fn load_settings(explicit: Option<&Path>) -> Result<(Settings, Option<PathBuf>)> {
    let source = match explicit {
        Some(path) if path.exists() => Some(path.to_path_buf()),
        Some(path) => return Err(ConfigError::ConfigFileNotFound(path.to_path_buf())),
        None => find_config_file()?,
    };

    let mut settings = match &source {
        Some(path) => {
            tracing::debug!("Loading settings from {}", path.display());
            load_settings_file(path)?
        }
        None => {
            tracing::debug!("No settings file found, using built-in defaults");
            Settings::default()
        }
    };

    apply_env_overrides(&mut settings)?;
    Ok((settings, source))
}
