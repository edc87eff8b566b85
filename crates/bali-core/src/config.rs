use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};

use crate::ai::DEFAULT_OLLAMA_URL;
use crate::assistant::{DEFAULT_MODEL, FALLBACK_MODEL};
use crate::state::Tone;
use crate::store::DATA_FILE_NAME;

const APP_DIR: &str = "bali-ai";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub tone: Option<String>,
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub fallback_model: Option<String>,
    #[serde(default)]
    pub ollama_url: Option<String>,
    #[serde(default)]
    pub data_file: Option<PathBuf>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("Config file {} is not valid JSON", config_path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Record `model` as the default and write the config to `config_path`
    pub fn save_default_model(&mut self, model: &str, config_path: &Path) -> Result<()> {
        self.default_model = Some(model.to_string());
        self.save_to(config_path)
    }

    pub fn model(&self) -> &str {
        self.default_model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn fallback_model(&self) -> &str {
        self.fallback_model.as_deref().unwrap_or(FALLBACK_MODEL)
    }

    pub fn ollama_url(&self) -> &str {
        self.ollama_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL)
    }

    /// Configured tone, falling back to the default for unknown values
    pub fn tone(&self) -> Tone {
        self.tone
            .as_deref()
            .and_then(Tone::from_str)
            .unwrap_or_default()
    }

    /// Data file location: configured path, then a file in the working
    /// directory if one exists, then the per-user data directory
    pub fn data_file_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.data_file {
            return Ok(path.clone());
        }

        let local = PathBuf::from(DATA_FILE_NAME);
        if local.exists() {
            return Ok(local);
        }

        Ok(Self::data_dir()?.join(DATA_FILE_NAME))
    }

    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(data_dir.join(APP_DIR))
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join(APP_DIR).join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.model(), "gemma3:1b");
        assert_eq!(config.fallback_model(), "gemma2:2b");
        assert_eq!(config.ollama_url(), "http://localhost:11434");
        assert_eq!(config.tone(), Tone::Friendly);
    }

    #[test]
    fn test_missing_config_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            user_name: Some("Ana".to_string()),
            tone: Some("casual".to_string()),
            default_model: Some("llama3.2:latest".to_string()),
            data_file: Some(dir.path().join("data.json")),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.tone(), Tone::Casual);
        assert_eq!(loaded.model(), "llama3.2:latest");
        assert_eq!(loaded.data_file_path().unwrap(), dir.path().join("data.json"));
    }

    #[test]
    fn test_save_default_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::new();
        config.save_default_model("mistral:7b", &path).unwrap();

        assert_eq!(config.model(), "mistral:7b");
        assert_eq!(Config::load_from(&path).unwrap().model(), "mistral:7b");
    }

    #[test]
    fn test_invalid_config_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{oops").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"tone": "sarcastic"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.tone(), Tone::Friendly);
        assert_eq!(config.model(), "gemma3:1b");
    }
}
