// Translation and language detection
// Talks to a LibreTranslate-compatible HTTP service; callers never see its failures


use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::TranslationConfig;

/// Language code recorded when detection fails
pub const UNKNOWN_LANGUAGE: &str = "unknown";

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// A translation backend
pub trait Translate: Send {
    fn detect_language(&self, text: &str) -> Result<String>;

    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String>;

    /// Backends that always decline skip detection and translation entirely
    #[inline]
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Backend used when translation is switched off
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledTranslator;

impl Translate for DisabledTranslator {
    #[inline]
    fn detect_language(&self, _text: &str) -> Result<String> {
        Err(anyhow::anyhow!("Translation is disabled"))
    }

    #[inline]
    fn translate(&self, _text: &str, _source: &str, _target: &str) -> Result<String> {
        Err(anyhow::anyhow!("Translation is disabled"))
    }

    #[inline]
    fn is_enabled(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
pub struct TranslationClient {
    base_url: Url,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    q: &'a str,
}

#[derive(Debug, Deserialize)]
struct Detection {
    language: String,
    #[serde(default)]
    confidence: f64,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

impl TranslationClient {
    #[inline]
    pub fn new(config: &TranslationConfig) -> Result<Self> {
        let base_url = config
            .service_url()
            .context("Failed to generate translation service URL from config")?;
        Ok(Self::with_base_url(base_url))
    }

    #[inline]
    pub fn with_base_url(base_url: Url) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();
        Self { base_url, agent }
    }

    fn post<T: Serialize>(&self, endpoint: &str, body: &T) -> Result<String> {
        let url = self
            .base_url
            .join(endpoint)
            .with_context(|| format!("Failed to build {} URL", endpoint))?;
        let body = serde_json::to_string(body).context("Failed to serialize request")?;

        self.agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&body)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .with_context(|| format!("Request to {} failed", url))
    }
}

impl Translate for TranslationClient {
    #[inline]
    fn detect_language(&self, text: &str) -> Result<String> {
        let response = self.post("/detect", &DetectRequest { q: text })?;
        let detections: Vec<Detection> =
            serde_json::from_str(&response).context("Failed to parse detection response")?;

        detections
            .into_iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .map(|d| d.language)
            .ok_or_else(|| anyhow::anyhow!("No language detected"))
    }

    #[inline]
    fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let request = TranslateRequest {
            q: text,
            source,
            target,
            format: "text",
        };
        let response = self.post("/translate", &request)?;
        let translated: TranslateResponse =
            serde_json::from_str(&response).context("Failed to parse translation response")?;
        Ok(translated.translated_text)
    }
}

/// Memoising front end that swallows backend failures
pub struct CachedTranslator {
    backend: Box<dyn Translate>,
    target_language: String,
    cache: HashMap<String, String>,
}

impl CachedTranslator {
    #[inline]
    pub fn new(backend: Box<dyn Translate>, target_language: impl Into<String>) -> Self {
        Self {
            backend,
            target_language: target_language.into(),
            cache: HashMap::new(),
        }
    }

    /// Build the translator the configuration asks for
    #[inline]
    pub fn from_config(config: &TranslationConfig) -> anyhow::Result<Self> {
        let backend: Box<dyn Translate> = if config.enabled {
            Box::new(TranslationClient::new(config)?)
        } else {
            Box::new(DisabledTranslator)
        };
        Ok(Self::new(backend, config.target_language.clone()))
    }

    /// Number of cached translations
    #[inline]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// `text` in the target language, or `text` itself when it already is or anything fails
    #[inline]
    pub fn to_target(&mut self, text: &str) -> String {
        if text.is_empty() || !self.backend.is_enabled() {
            return text.to_string();
        }
        if let Some(cached) = self.cache.get(text) {
            return cached.clone();
        }

        let language = match self.backend.detect_language(text) {
            Ok(language) => language,
            Err(e) => {
                warn!("Language detection failed: {:#}", e);
                return text.to_string();
            }
        };
        if language == self.target_language {
            return text.to_string();
        }

        match self
            .backend
            .translate(text, &language, &self.target_language)
        {
            Ok(translation) => {
                debug!("Translated text from {}", language);
                self.cache.insert(text.to_string(), translation.clone());
                translation
            }
            Err(e) => {
                warn!("Translation failed: {:#}", e);
                text.to_string()
            }
        }
    }

    /// Detected language code, or [`UNKNOWN_LANGUAGE`]
    #[inline]
    pub fn detect_language(&self, text: &str) -> String {
        if text.is_empty() || !self.backend.is_enabled() {
            return UNKNOWN_LANGUAGE.to_string();
        }
        self.backend.detect_language(text).unwrap_or_else(|e| {
            debug!("Language detection failed: {:#}", e);
            UNKNOWN_LANGUAGE.to_string()
        })
    }
}
