use crate::error::ConfigError;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const APP_DIR: &str = "crm-tui";

/// Values read from `config.toml`; every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct FileConfig {
    pub api_url: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    /// Holds the stored token and its mirror.
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl Config {
    pub fn token_path(&self) -> PathBuf {
        self.data_dir.join("token")
    }

    pub fn cookie_path(&self) -> PathBuf {
        self.data_dir.join("cookie")
    }

    /// Layers defaults, the config file and then the environment.
    pub fn resolve(
        file: FileConfig,
        env_lookup: impl Fn(&str) -> Option<String>,
        default_data_dir: PathBuf,
    ) -> Config {
        let api_url = env_lookup("CRM_API_URL")
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let data_dir = env_lookup("CRM_DATA_DIR")
            .map(PathBuf::from)
            .or(file.data_dir)
            .unwrap_or(default_data_dir);
        let log_dir = env_lookup("CRM_LOG_DIR")
            .map(PathBuf::from)
            .or(file.log_dir)
            .unwrap_or_else(|| data_dir.join("logs"));

        Config {
            api_url,
            data_dir,
            log_dir,
        }
    }
}

pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

pub fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let contents = fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}

/// Loads `.env`, the optional config file and environment overrides.
pub fn load() -> Result<Config, ConfigError> {
    dotenv::dotenv().ok();

    let file = match config_file_path() {
        Some(path) => read_file_config(&path)?,
        None => FileConfig::default(),
    };
    let default_data_dir = dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or(ConfigError::MissingDir("data"))?;

    Ok(Config::resolve(
        file,
        |key| env::var(key).ok().filter(|v| !v.is_empty()),
        default_data_dir,
    ))
}
