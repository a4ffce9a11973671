//! CLI configuration handling.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Defaults applied when the corresponding flag is not given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Key store path, or `NONE` for a provider-managed store.
    pub keystore: Option<PathBuf>,

    /// Store type, e.g. `PKCS12`.
    pub storetype: Option<String>,

    /// Store provider name.
    pub provider: Option<String>,

    /// Trust store used in strict mode.
    pub truststore: Option<PathBuf>,

    /// Validate certification paths by default.
    pub strict: bool,

    /// Logging filter used when `RUST_LOG` is unset.
    pub log_level: Option<String>,

    /// Path to the configuration file that was loaded.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}

/// Load configuration from the default location, or defaults if absent.
pub fn load_config() -> Result<CliConfig> {
    match project_dirs() {
        Some(dirs) => load_from_path(&dirs.config_dir().join("config.toml")),
        None => Ok(CliConfig::default()),
    }
}

/// Load configuration from `path`. A missing file yields defaults.
pub fn load_from_path(path: &Path) -> Result<CliConfig> {
    if !path.exists() {
        return Ok(CliConfig::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {:?}", path))?;
    let mut config: CliConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config from {:?}", path))?;
    config.config_path = Some(path.to_path_buf());
    Ok(config)
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "raibid-labs", "sigilseal")
}
