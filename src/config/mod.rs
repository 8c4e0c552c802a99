mod file_config;

pub use file_config::{
    BeatovenConfig, ClassifierConfig, FileConfig, OidcConfig, SessionConfig, SpotifyConfig,
};

use crate::compose::{DEFAULT_BEATOVEN_BASE_URL, DEFAULT_MAX_ATTEMPTS, DEFAULT_TRACK_FORMAT};
use crate::genre::{Genre, PredictionPolicy};
use crate::playlist::{DEFAULT_PAGE_SIZE, DEFAULT_SPOTIFY_ACCOUNTS_URL, DEFAULT_SPOTIFY_API_URL};
use crate::server::RequestsLoggingLevel;
use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT_SEC: u64 = 30;
const DEFAULT_SESSION_TTL_HOURS: u64 = 72;
const DEFAULT_SESSION_PRUNE_INTERVAL_MINUTES: u64 = 60;
const MAX_SESSION_TTL_HOURS: u64 = 24 * 365;
const MAX_SESSION_PRUNE_INTERVAL_MINUTES: u64 = 24 * 60;
const DEFAULT_OIDC_SCOPES: &[&str] = &["openid", "email", "profile"];

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub audio_dir: Option<PathBuf>,
    pub genre_model_path: Option<PathBuf>,
    pub genre_model_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    /// Where composed tracks are saved; delivery is off when unset.
    pub audio_dir: Option<PathBuf>,

    // Integrations. `None` disables the feature.
    pub oidc: Option<OidcSettings>,
    pub spotify: Option<SpotifySettings>,
    pub beatoven: Option<BeatovenSettings>,

    pub classifier: ClassifierSettings,
    pub session: SessionSettings,
}

#[derive(Debug, Clone)]
pub struct OidcSettings {
    pub provider_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SpotifySettings {
    pub client_id: String,
    pub client_secret: String,
    pub accounts_url: String,
    pub api_url: String,
    pub page_size: usize,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct BeatovenSettings {
    pub api_key: String,
    pub base_url: String,
    pub poll_interval: Duration,
    pub max_attempts: u32,
    pub format: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenreModelSource {
    LinearFile(PathBuf),
    Http { url: String, timeout: Duration },
}

#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    pub model: Option<GenreModelSource>,
    pub policy: PredictionPolicy,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub ttl: Duration,
    pub prune_interval: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_SESSION_TTL_HOURS * 3600),
            prune_interval: Duration::from_secs(DEFAULT_SESSION_PRUNE_INTERVAL_MINUTES * 60),
        }
    }
}

fn required(section: &str, key: &str, value: Option<String>) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow!("[{}] section is missing `{}`", section, key))
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| anyhow!("db_dir must be specified via --db-dir or in config file"))?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let audio_dir = file
            .audio_dir
            .map(PathBuf::from)
            .or_else(|| cli.audio_dir.clone());

        let oidc = file.oidc.map(resolve_oidc).transpose()?;
        let spotify = file.spotify.map(resolve_spotify).transpose()?;
        let beatoven = file.beatoven.map(resolve_beatoven).transpose()?;
        let classifier = resolve_classifier(cli, file.classifier.unwrap_or_default())?;

        let session_file = file.session.unwrap_or_default();
        let session = SessionSettings {
            ttl: Duration::from_secs(
                session_file
                    .ttl_hours
                    .unwrap_or(DEFAULT_SESSION_TTL_HOURS)
                    .min(MAX_SESSION_TTL_HOURS)
                    * 3600,
            ),
            prune_interval: Duration::from_secs(
                session_file
                    .prune_interval_minutes
                    .unwrap_or(DEFAULT_SESSION_PRUNE_INTERVAL_MINUTES)
                    .clamp(1, MAX_SESSION_PRUNE_INTERVAL_MINUTES)
                    * 60,
            ),
        };

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            audio_dir,
            oidc,
            spotify,
            beatoven,
            classifier,
            session,
        })
    }

    pub fn profile_db_path(&self) -> PathBuf {
        self.db_dir.join("profile.db")
    }
}

fn resolve_oidc(file: OidcConfig) -> Result<OidcSettings> {
    Ok(OidcSettings {
        provider_url: required("oidc", "provider_url", file.provider_url)?,
        client_id: required("oidc", "client_id", file.client_id)?,
        client_secret: required("oidc", "client_secret", file.client_secret)?,
        redirect_uri: required("oidc", "redirect_uri", file.redirect_uri)?,
        scopes: file
            .scopes
            .unwrap_or_else(|| DEFAULT_OIDC_SCOPES.iter().map(|s| s.to_string()).collect()),
    })
}

fn resolve_spotify(file: SpotifyConfig) -> Result<SpotifySettings> {
    let page_size = file.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if page_size == 0 || page_size > 50 {
        bail!("[spotify] page_size must be between 1 and 50, got {}", page_size);
    }
    Ok(SpotifySettings {
        client_id: required("spotify", "client_id", file.client_id)?,
        client_secret: required("spotify", "client_secret", file.client_secret)?,
        accounts_url: file
            .accounts_url
            .unwrap_or_else(|| DEFAULT_SPOTIFY_ACCOUNTS_URL.to_string()),
        api_url: file
            .api_url
            .unwrap_or_else(|| DEFAULT_SPOTIFY_API_URL.to_string()),
        page_size,
        timeout: Duration::from_secs(file.timeout_sec.unwrap_or(DEFAULT_HTTP_TIMEOUT_SEC)),
    })
}

fn resolve_beatoven(file: BeatovenConfig) -> Result<BeatovenSettings> {
    let max_attempts = file.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
    if max_attempts == 0 {
        bail!("[beatoven] max_attempts must be at least 1");
    }
    Ok(BeatovenSettings {
        api_key: required("beatoven", "api_key", file.api_key)?,
        base_url: file
            .base_url
            .unwrap_or_else(|| DEFAULT_BEATOVEN_BASE_URL.to_string()),
        poll_interval: Duration::from_secs(file.poll_interval_secs.unwrap_or(10)),
        max_attempts,
        format: file
            .format
            .unwrap_or_else(|| DEFAULT_TRACK_FORMAT.to_string()),
        timeout: Duration::from_secs(file.timeout_sec.unwrap_or(DEFAULT_HTTP_TIMEOUT_SEC)),
    })
}

fn resolve_classifier(cli: &CliConfig, file: ClassifierConfig) -> Result<ClassifierSettings> {
    let model_path = file
        .model_path
        .map(PathBuf::from)
        .or_else(|| cli.genre_model_path.clone());
    let model_url = file.model_url.or_else(|| cli.genre_model_url.clone());
    let timeout = Duration::from_secs(file.timeout_sec.unwrap_or(DEFAULT_HTTP_TIMEOUT_SEC));

    let model = match (model_path, model_url) {
        (Some(_), Some(_)) => {
            bail!("[classifier] model_path and model_url are mutually exclusive")
        }
        (Some(path), None) => {
            if !path.is_file() {
                bail!("Genre model file not found: {:?}", path);
            }
            Some(GenreModelSource::LinearFile(path))
        }
        (None, Some(url)) => Some(GenreModelSource::Http { url, timeout }),
        (None, None) => None,
    };

    let fallback_genre = match file.fallback_genre {
        Some(label) => label.parse::<Genre>().map_err(|e| anyhow!("[classifier] {}", e))?,
        None => Genre::Pop,
    };
    let policy = match file.on_error.as_deref().map(str::to_lowercase).as_deref() {
        None | Some("fallback") => PredictionPolicy::Fallback(fallback_genre),
        Some("strict") => PredictionPolicy::Strict,
        Some(other) => bail!(
            "[classifier] on_error must be \"fallback\" or \"strict\", got \"{}\"",
            other
        ),
    };

    Ok(ClassifierSettings { model, policy })
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
