use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub completion: CompletionConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    pub schemes_path: PathBuf,
    pub farmer_csv_path: PathBuf,
    pub static_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            schemes_path: PathBuf::from("schemes_data.json"),
            farmer_csv_path: PathBuf::from("enriched_soil.csv"),
            static_dir: PathBuf::from("static"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CompletionConfig {
    pub model: String,
    /// Name of the environment variable holding the Gemini API key.
    pub api_key_env: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash-exp".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

/// Load configuration from a TOML file, falling back to defaults when the
/// file does not exist. Every key is optional.
pub fn load_config(path: &Path) -> Result<Config> {
    let config: Config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    if config.server.bind.is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if config.completion.model.is_empty() {
        anyhow::bail!("completion.model must not be empty");
    }

    Ok(config)
}
