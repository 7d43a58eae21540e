//! Configuration loading and management.

use std::path::{Path, PathBuf};

use ct_core::detection::DetectionConfig;
use ct_core::parsing::{DeviceInfo, ParserConfig};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Device the log was acquired from.
    #[serde(default)]
    pub device: DeviceInfo,
    /// Section markers, line patterns and parsing policy.
    #[serde(default)]
    pub parser: ParserConfig,
    /// Strategy weights, windows and validation constants.
    #[serde(default)]
    pub detection: DetectionConfig,
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: built-in defaults, `<config dir>/ct/config.toml`,
    /// the given file, then `CT_*` environment variables (nested keys
    /// separated by `__`, e.g. `CT_DEVICE__TIMEZONE`).
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("CT_").split("__"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for ct.
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("ct"))
}
