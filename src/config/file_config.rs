use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub audio_dir: Option<String>,

    // Integrations
    pub oidc: Option<OidcConfig>,
    pub spotify: Option<SpotifyConfig>,
    pub beatoven: Option<BeatovenConfig>,
    pub classifier: Option<ClassifierConfig>,
    pub session: Option<SessionConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct OidcConfig {
    pub provider_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub scopes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub accounts_url: Option<String>,
    pub api_url: Option<String>,
    pub page_size: Option<usize>,
    pub timeout_sec: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct BeatovenConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub poll_interval_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub format: Option<String>,
    pub timeout_sec: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ClassifierConfig {
    /// JSON weights file for the built-in linear model.
    pub model_path: Option<String>,
    /// Model-serving endpoint, used instead of `model_path`.
    pub model_url: Option<String>,
    pub timeout_sec: Option<u64>,
    /// "fallback" (default) or "strict".
    pub on_error: Option<String>,
    pub fallback_genre: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub ttl_hours: Option<u64>,
    pub prune_interval_minutes: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
