
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::embeddings::ollama::DEFAULT_EMBEDDING_DIMENSION;
use crate::recommend::RecommendConfig;
use crate::synthetic::{MAX_READERS_PER_BOOK, SyntheticConfig};

/// Environment variable that overrides the MongoDB connection string
pub const MONGO_URI_ENV: &str = "MONGO_URI";
/// Environment variable that overrides the MongoDB database name
pub const DATABASE_ENV: &str = "DATABASE";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub mongo: MongoConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub synthetic: SyntheticConfig,
    #[serde(default)]
    pub recommend: RecommendConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub batch_size: u32,
    pub embedding_dimension: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "all-minilm:latest".to_string(),
            batch_size: 64,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub ratings_collection: String,
    pub catalog_collection: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "RecommendationSystem".to_string(),
            ratings_collection: "books_data".to_string(),
            catalog_collection: "all_books".to_string(),
        }
    }
}

/// Settings for the LibreTranslate-compatible service used while cleaning the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranslationConfig {
    pub enabled: bool,
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub target_language: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 5000,
            target_language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7860,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid MongoDB URI: {0} (must start with mongodb:// or mongodb+srv://)")]
    InvalidMongoUri(String),
    #[error("Invalid MongoDB name: {0:?} (cannot be empty or contain '$', '.' or spaces)")]
    InvalidMongoName(String),
    #[error("Invalid language code: {0:?} (expected a two or three letter code)")]
    InvalidLanguage(String),
    #[error("Invalid user count: {0} (must be between 1 and 1000000)")]
    InvalidUserCount(u32),
    #[error("Invalid readers per book: mean {0}, std {1} (mean must be in (0, 10000] and std in [0, 10000])")]
    InvalidReaderDistribution(f64, f64),
    #[error("Invalid train fraction: {0} (must be strictly between 0 and 1)")]
    InvalidTrainFraction(f64),
    #[error("Invalid neighbour count: {0} (must be between 1 and 100)")]
    InvalidNeighbors(usize),
    #[error("Invalid recommendation count: {0} (must be between 1 and 50)")]
    InvalidRecommendationCount(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default data directory, `~/.book-recs`
    #[inline]
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".book-recs"))
            .or_else(|| dirs::data_dir().map(|data| data.join("book-recs")))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        Self::load_with_env(config_dir, |key| std::env::var(key).ok())
    }

    /// Load the configuration, resolving environment overrides through `lookup`
    #[inline]
    pub fn load_with_env<P, F>(config_dir: P, lookup: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let config_path = config_dir.as_ref().join("config.toml");

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;

            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?
        } else {
            Self::default()
        };
        config.base_dir = config_dir.as_ref().to_path_buf();
        config.mongo.apply_env_overrides(lookup);

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.mongo.validate()?;
        self.translation.validate()?;
        self.validate_synthetic_config()?;
        self.validate_recommend_config()?;

        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort(self.server.port));
        }

        Ok(())
    }

    fn validate_synthetic_config(&self) -> Result<(), ConfigError> {
        let config = &self.synthetic;

        if !(1..=1_000_000).contains(&config.num_users) {
            return Err(ConfigError::InvalidUserCount(config.num_users));
        }

        if !(config.mean_readers > 0.0 && config.mean_readers <= MAX_READERS_PER_BOOK)
            || !(config.std_readers >= 0.0 && config.std_readers <= MAX_READERS_PER_BOOK)
        {
            return Err(ConfigError::InvalidReaderDistribution(
                config.mean_readers,
                config.std_readers,
            ));
        }

        if !(config.train_fraction > 0.0 && config.train_fraction < 1.0) {
            return Err(ConfigError::InvalidTrainFraction(config.train_fraction));
        }

        Ok(())
    }

    fn validate_recommend_config(&self) -> Result<(), ConfigError> {
        let config = &self.recommend;

        for neighbors in [config.collab_neighbors, config.content_neighbors] {
            if !(1..=100).contains(&neighbors) {
                return Err(ConfigError::InvalidNeighbors(neighbors));
            }
        }

        if !(1..=50).contains(&config.count) {
            return Err(ConfigError::InvalidRecommendationCount(config.count));
        }

        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Directory of the collaborative (user history) vector store
    #[inline]
    pub fn collab_store_path(&self) -> PathBuf {
        self.get_base_dir().join("collab-store")
    }

    /// Directory of the content (book description) vector store
    #[inline]
    pub fn content_store_path(&self) -> PathBuf {
        self.get_base_dir().join("content-store")
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        self.ollama.ollama_url()
    }

    #[inline]
    pub fn translation_url(&self) -> Result<Url, ConfigError> {
        self.translation.service_url()
    }
}

fn service_url(protocol: &str, host: &str, port: u16) -> Result<Url, ConfigError> {
    if protocol != "http" && protocol != "https" {
        return Err(ConfigError::InvalidProtocol(protocol.to_string()));
    }

    let url_str = format!("{}://{}:{}", protocol, host, port);
    Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama_url()?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        Ok(())
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        service_url(&self.protocol, &self.host, self.port)
    }

    pub fn set_protocol(&mut self, protocol: String) -> Result<(), ConfigError> {
        if protocol != "http" && protocol != "https" {
            return Err(ConfigError::InvalidProtocol(protocol));
        }
        self.protocol = protocol;
        Ok(())
    }

    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        let temp_config = OllamaConfig {
            host: host.clone(),
            ..self.clone()
        };
        temp_config.validate()?;
        self.host = host;
        Ok(())
    }

    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        self.port = port;
        Ok(())
    }

    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    pub fn set_batch_size(&mut self, batch_size: u32) -> Result<(), ConfigError> {
        if batch_size == 0 || batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }

    pub fn set_embedding_dimension(&mut self, dimension: u32) -> Result<(), ConfigError> {
        if !(64..=4096).contains(&dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(dimension));
        }
        self.embedding_dimension = dimension;
        Ok(())
    }
}

impl MongoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.uri.starts_with("mongodb://") && !self.uri.starts_with("mongodb+srv://") {
            return Err(ConfigError::InvalidMongoUri(self.uri.clone()));
        }

        for name in [
            &self.database,
            &self.ratings_collection,
            &self.catalog_collection,
        ] {
            if !is_valid_mongo_name(name) {
                return Err(ConfigError::InvalidMongoName(name.clone()));
            }
        }

        Ok(())
    }

    /// Apply `MONGO_URI` / `DATABASE` overrides, ignoring empty values
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup(MONGO_URI_ENV).filter(|v| !v.trim().is_empty()) {
            self.uri = uri;
        }
        if let Some(database) = lookup(DATABASE_ENV).filter(|v| !v.trim().is_empty()) {
            self.database = database;
        }
    }

    pub fn set_uri(&mut self, uri: String) -> Result<(), ConfigError> {
        if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
            return Err(ConfigError::InvalidMongoUri(uri));
        }
        self.uri = uri;
        Ok(())
    }

    pub fn set_database(&mut self, database: String) -> Result<(), ConfigError> {
        if !is_valid_mongo_name(&database) {
            return Err(ConfigError::InvalidMongoName(database));
        }
        self.database = database;
        Ok(())
    }
}

fn is_valid_mongo_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains(['$', '.', ' ', '\0'])
}

impl TranslationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.service_url()?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        let code = &self.target_language;
        if !(2..=3).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_lowercase()) {
            return Err(ConfigError::InvalidLanguage(code.clone()));
        }

        Ok(())
    }

    pub fn service_url(&self) -> Result<Url, ConfigError> {
        service_url(&self.protocol, &self.host, self.port)
    }
}
