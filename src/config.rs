//! Layered configuration: defaults, then an optional YAML file, then
//! `MEALBASKET_*` environment overrides.
//!
//! Backend selection is an explicit config value; nothing else in the crate
//! inspects the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Which persistence backend the composition layer builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Hosted document store only.
    Hosted,
    /// In-memory only (tests, local mode).
    Memory,
    /// Hosted with an in-process mirror fallback.
    #[default]
    Failover,
}

impl BackendKind {
    fn from_code(code: &str) -> Option<Self> {
        match code {
            "hosted" => Some(BackendKind::Hosted),
            "memory" => Some(BackendKind::Memory),
            "failover" => Some(BackendKind::Failover),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoSettings {
    pub uri: String,
    pub database: String,
}

impl Default for MongoSettings {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".into(),
            database: "mealbasket".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudinarySettings {
    pub cloud_name: String,
    /// Unsigned upload preset created in the vendor dashboard.
    pub upload_preset: String,
}

impl Default for CloudinarySettings {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            upload_preset: "food_images".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PixabaySettings {
    pub api_key: String,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub backend: BackendKind,
    /// Replace the vendor image collaborators with the local/mock ones.
    pub use_mock_collaborators: bool,
    pub mongo: MongoSettings,
    pub cloudinary: CloudinarySettings,
    pub pixabay: PixabaySettings,
    /// Config file actually loaded, if any.
    pub config_file: Option<PathBuf>,
}

/// File shape; every field optional so partial configs work.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    backend: Option<BackendKind>,
    use_mock_collaborators: Option<bool>,
    mongo: Option<MongoSettings>,
    cloudinary: Option<CloudinarySettings>,
    pixabay: Option<PixabaySettings>,
}

impl Config {
    /// Loads configuration with priority: env vars > config file > defaults.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::Read(path.clone(), e))?;
            let file: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::Parse(path.clone(), e))?;

            config.config_file = Some(path);
            if let Some(backend) = file.backend {
                config.backend = backend;
            }
            if let Some(use_mocks) = file.use_mock_collaborators {
                config.use_mock_collaborators = use_mocks;
            }
            if let Some(mongo) = file.mongo {
                config.mongo = mongo;
            }
            if let Some(cloudinary) = file.cloudinary {
                config.cloudinary = cloudinary;
            }
            if let Some(pixabay) = file.pixabay {
                config.pixabay = pixabay;
            }
        }

        if let Ok(backend) = std::env::var("MEALBASKET_BACKEND") {
            config.backend = BackendKind::from_code(&backend)
                .ok_or(ConfigError::InvalidBackend(backend))?;
        }
        if let Ok(value) = std::env::var("MEALBASKET_USE_MOCKS") {
            config.use_mock_collaborators = value == "1" || value.eq_ignore_ascii_case("true");
        }
        if let Ok(uri) = std::env::var("MEALBASKET_MONGO_URI") {
            config.mongo.uri = uri;
        }
        if let Ok(database) = std::env::var("MEALBASKET_MONGO_DATABASE") {
            config.mongo.database = database;
        }
        if let Ok(cloud_name) = std::env::var("MEALBASKET_CLOUDINARY_CLOUD") {
            config.cloudinary.cloud_name = cloud_name;
        }
        if let Ok(preset) = std::env::var("MEALBASKET_CLOUDINARY_PRESET") {
            config.cloudinary.upload_preset = preset;
        }
        if let Ok(api_key) = std::env::var("MEALBASKET_PIXABAY_KEY") {
            config.pixabay.api_key = api_key;
        }

        Ok(config)
    }

    /// Platform config directory, e.g. `~/.config/mealbasket/` on Linux.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mealbasket")
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {1}", .0.display())]
    Read(PathBuf, #[source] std::io::Error),
    #[error("failed to parse config file '{}': {1}", .0.display())]
    Parse(PathBuf, #[source] serde_yaml::Error),
    #[error("unknown backend '{0}' (expected hosted, memory, or failover)")]
    InvalidBackend(String),
}
