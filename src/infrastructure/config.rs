use std::path::PathBuf;

use config::ConfigError;
use serde::Deserialize;

use crate::utils;

const CONFIG: &str = include_str!("../../.config/config.json5");

#[derive(Clone, Debug, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub _data_dir: PathBuf,
    #[serde(default)]
    pub _config_dir: PathBuf,
}

/// Realtime sync tuning.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// Follow new messages while the viewport is at the bottom. The scroll
    /// controller also uses this for the initial jump on mount.
    #[serde(default = "default_auto_scroll")]
    pub auto_scroll: bool,
    /// Messages requested per backward-pagination fetch.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_auto_scroll() -> bool {
    true
}

fn default_page_size() -> usize {
    50
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            auto_scroll: default_auto_scroll(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default, flatten)]
    pub config: AppConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        let default_config: Config = json5::from_str(CONFIG)
            .map_err(|e| ConfigError::Message(format!("Failed to load default config: {e}")))?;
        let data_dir = utils::get_data_dir();
        let config_dir = utils::get_config_dir();
        // Embedded defaults seed the builder; user files override per key.
        let mut builder = config::Config::builder()
            .set_default("_data_dir", data_dir.to_string_lossy().as_ref())?
            .set_default("_config_dir", config_dir.to_string_lossy().as_ref())?
            .set_default("sync.auto_scroll", default_config.sync.auto_scroll)?
            .set_default("sync.page_size", default_config.sync.page_size as u64)?;

        let config_files = [
            ("config.json5", config::FileFormat::Json5),
            ("config.json", config::FileFormat::Json),
            ("config.yaml", config::FileFormat::Yaml),
            ("config.toml", config::FileFormat::Toml),
            ("config.ini", config::FileFormat::Ini),
        ];
        let mut found_config = false;
        for (file, format) in &config_files {
            builder = builder.add_source(
                config::File::from(config_dir.join(file))
                    .format(*format)
                    .required(false),
            );
            if config_dir.join(file).exists() {
                found_config = true
            }
        }
        if !found_config {
            log::error!("No configuration file found");
            return Err(ConfigError::Message(String::from(
                "No configuration file found",
            )));
        }

        let cfg: Self = builder.build()?.try_deserialize()?;

        Ok(cfg)
    }
}
