use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::LkError;
use crate::normalize::DEFAULT_NEAREST_TOLERANCE_ARCSEC;

pub const CONFIG_FILE: &str = "lksearch.json";
pub const DEFAULT_MAST_BASE_URL: &str = "https://mast.stsci.edu";
pub const DEFAULT_TESSCUT_BASE_URL: &str = "https://mast.stsci.edu/tesscut/api/v0.4";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub mast_base_url: Option<String>,
    #[serde(default)]
    pub tesscut_base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<usize>,
    #[serde(default)]
    pub download_dir: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<String>,
    #[serde(default)]
    pub max_workers: Option<usize>,
    #[serde(default)]
    pub query_radius_arcsec: Option<f64>,
    #[serde(default)]
    pub nearest_tolerance_arcsec: Option<f64>,
    #[serde(default)]
    pub tesscut_size: Option<u32>,
    #[serde(default)]
    pub hlsp: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub mast_base_url: String,
    pub tesscut_base_url: String,
    pub timeout: Duration,
    pub max_retries: usize,
    pub download_dir: Utf8PathBuf,
    pub cache_dir: Utf8PathBuf,
    pub max_workers: usize,
    /// Cone used for the archive query when the caller sets no search radius.
    pub query_radius_arcsec: f64,
    pub nearest_tolerance_arcsec: f64,
    pub tesscut_size: u32,
    pub hlsp: bool,
    /// From `MAST_API_TOKEN`.
    pub api_token: Option<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            mast_base_url: DEFAULT_MAST_BASE_URL.to_string(),
            tesscut_base_url: DEFAULT_TESSCUT_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 3,
            download_dir: Utf8PathBuf::from("lksearch-data"),
            cache_dir: default_cache_dir(),
            max_workers: 4,
            query_radius_arcsec: 2.0,
            nearest_tolerance_arcsec: DEFAULT_NEAREST_TOLERANCE_ARCSEC,
            tesscut_size: 10,
            hlsp: true,
            api_token: None,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, LkError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Err(LkError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| LkError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| LkError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    /// Like `resolve`, but a missing `lksearch.json` yields the defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<ResolvedConfig, LkError> {
        match Self::resolve(path) {
            Err(LkError::MissingConfig) => Self::resolve_config(Config::default()),
            other => other,
        }
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, LkError> {
        let defaults = ResolvedConfig::default();

        let max_workers = config.max_workers.unwrap_or(defaults.max_workers);
        if max_workers == 0 {
            return Err(LkError::Configuration(
                "max_workers must be at least 1".to_string(),
            ));
        }
        let timeout_secs = config.timeout_secs.unwrap_or(defaults.timeout.as_secs());
        if timeout_secs == 0 {
            return Err(LkError::Configuration(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        let query_radius_arcsec = positive(
            "query_radius_arcsec",
            config.query_radius_arcsec,
            defaults.query_radius_arcsec,
        )?;
        let nearest_tolerance_arcsec = positive(
            "nearest_tolerance_arcsec",
            config.nearest_tolerance_arcsec,
            defaults.nearest_tolerance_arcsec,
        )?;
        let tesscut_size = config.tesscut_size.unwrap_or(defaults.tesscut_size);
        if tesscut_size == 0 {
            return Err(LkError::Configuration(
                "tesscut_size must be at least 1 pixel".to_string(),
            ));
        }

        let api_token = std::env::var("MAST_API_TOKEN")
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            mast_base_url: trim_url(config.mast_base_url).unwrap_or(defaults.mast_base_url),
            tesscut_base_url: trim_url(config.tesscut_base_url)
                .unwrap_or(defaults.tesscut_base_url),
            timeout: Duration::from_secs(timeout_secs),
            max_retries: config.max_retries.unwrap_or(defaults.max_retries),
            download_dir: config
                .download_dir
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.download_dir),
            cache_dir: config
                .cache_dir
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            max_workers,
            query_radius_arcsec,
            nearest_tolerance_arcsec,
            tesscut_size,
            hlsp: config.hlsp.unwrap_or(defaults.hlsp),
            api_token,
        })
    }
}

pub fn default_cache_dir() -> Utf8PathBuf {
    BaseDirs::new()
        .and_then(|dirs| {
            Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("lksearch")).ok()
        })
        .unwrap_or_else(|| Utf8PathBuf::from(".lksearch-cache"))
}

fn positive(name: &str, value: Option<f64>, default: f64) -> Result<f64, LkError> {
    let value = value.unwrap_or(default);
    if !value.is_finite() || value <= 0.0 {
        return Err(LkError::Configuration(format!(
            "{name} must be a positive number, got {value}"
        )));
    }
    Ok(value)
}

fn trim_url(value: Option<String>) -> Option<String> {
    value
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
}
