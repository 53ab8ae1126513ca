use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sys_locale::get_locale;

const CONFIG_FILE: &str = "settings.json";
const SCHEMA_VERSION: u32 = 1;

pub const ENV_BASE_URL: &str = "TODOEASE_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "TODOEASE_TIMEOUT_SECS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// `auto`, `zh` or `en`.
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            language: default_language(),
            log_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn language(&self) -> Language {
        resolve_language(&self.language)
    }

    /// Applies `TODOEASE_*` overrides read through `lookup`; blank or unparsable values are
    /// ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS).and_then(|v| v.trim().parse::<u64>().ok()) {
            self.request_timeout_secs = secs;
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_language() -> String {
    "auto".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Zh,
    En,
}

pub fn resolve_language(language: &str) -> Language {
    match language.trim().to_lowercase().as_str() {
        "zh" => Language::Zh,
        "en" => Language::En,
        _ => detect_system_language(),
    }
}

fn detect_system_language() -> Language {
    let locale = get_locale().unwrap_or_default().to_lowercase();
    if locale.starts_with("zh") {
        Language::Zh
    } else {
        Language::En
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConfigFile {
    pub schema_version: u32,
    pub config: ClientConfig,
}

pub struct ConfigStore {
    root: PathBuf,
}

impl ConfigStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Reads `settings.json`; a missing file yields the defaults.
    pub fn load_config(&self) -> Result<ClientConfig, ConfigError> {
        let mut file = match File::open(self.path()) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(ClientConfig::default()),
            Err(err) => return Err(err.into()),
        };
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        let data: ConfigFile = serde_json::from_str(&buf)?;
        Ok(data.config)
    }

    pub fn save_config(&self, config: &ClientConfig) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.root)?;
        let data = ConfigFile {
            schema_version: SCHEMA_VERSION,
            config: config.clone(),
        };
        write_atomic(&self.path(), &data)
    }
}

fn write_atomic<T: Serialize>(path: &Path, data: &T) -> Result<(), ConfigError> {
    let temp_path = path.with_extension("tmp");
    let json = serde_json::to_vec_pretty(data)?;
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(&json)?;
        file.sync_all()?;
    }
    fs::rename(temp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_point_at_local_backend() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://127.0.0.1:8000");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.language, "auto");
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn serde_fills_missing_fields() {
        let config: ClientConfig =
            serde_json::from_str(r#"{ "base_url": "http://localhost:9000" }"#).unwrap();
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.language, "auto");
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let config = ClientConfig {
            request_timeout_secs: 0,
            ..ClientConfig::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn overrides_replace_only_valid_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_BASE_URL, " http://10.0.0.2:8000 "),
            (ENV_TIMEOUT_SECS, "not-a-number"),
        ]);
        let mut config = ClientConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.base_url, "http://10.0.0.2:8000");
        assert_eq!(config.request_timeout_secs, 10);

        let env: HashMap<&str, &str> = HashMap::from([(ENV_BASE_URL, "  "), (ENV_TIMEOUT_SECS, "3")]);
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.base_url, "http://10.0.0.2:8000");
        assert_eq!(config.request_timeout_secs, 3);
    }

    #[test]
    fn explicit_languages_resolve_without_locale() {
        assert_eq!(resolve_language("zh"), Language::Zh);
        assert_eq!(resolve_language(" EN "), Language::En);
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        assert_eq!(store.load_config().unwrap(), ClientConfig::default());
    }

    #[test]
    fn save_then_load_preserves_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested"));
        let config = ClientConfig {
            base_url: "http://127.0.0.1:8123".to_string(),
            request_timeout_secs: 4,
            language: "zh".to_string(),
            log_dir: Some(dir.path().join("logs")),
        };
        store.save_config(&config).unwrap();
        assert!(store.path().is_file());
        assert!(!store.path().with_extension("tmp").exists());
        assert_eq!(store.load_config().unwrap(), config);
    }

    #[test]
    fn corrupt_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().to_path_buf());
        fs::write(store.path(), "{ not json").unwrap();
        assert!(matches!(store.load_config(), Err(ConfigError::Json(_))));
    }
}
