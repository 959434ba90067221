//! Shared configuration for netlens services.
//!
//! TOML settings file + `NETLENS_`-prefixed environment overrides,
//! translated into `netlens_core` runtime config types. The API layer
//! (and any other embedder) loads a [`Config`] here and hands the
//! resulting [`EngineConfig`] / [`VerifyOptions`] into core.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use netlens_core::{EngineConfig, TlsVerification, VerifyOptions};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Analysis engine connection settings.
    #[serde(default)]
    pub engine: EngineSection,

    /// Verification orchestrator tuning.
    #[serde(default)]
    pub verify: VerifySection,
}

/// `[engine]` section.
#[derive(Debug, Deserialize, Serialize)]
pub struct EngineSection {
    /// Engine base URL.
    #[serde(default = "default_engine_url")]
    pub url: String,

    /// Per-call timeout in seconds.
    #[serde(default = "default_engine_timeout")]
    pub timeout: u64,

    /// Path to a custom CA certificate (engines behind a TLS proxy).
    pub ca_cert: Option<PathBuf>,

    /// Skip certificate verification (self-signed proxies).
    #[serde(default)]
    pub insecure: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            timeout: default_engine_timeout(),
            ca_cert: None,
            insecure: false,
        }
    }
}

fn default_engine_url() -> String {
    "http://localhost:9996".into()
}
fn default_engine_timeout() -> u64 {
    60
}

/// `[verify]` section.
#[derive(Debug, Deserialize, Serialize)]
pub struct VerifySection {
    /// Per-query timeout in seconds.
    #[serde(default = "default_verify_timeout")]
    pub timeout: u64,

    /// Retry bound for transient engine failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base retry backoff in milliseconds (doubles per attempt).
    #[serde(default = "default_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Cap on concurrent in-flight engine verification calls.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for VerifySection {
    fn default() -> Self {
        Self {
            timeout: default_verify_timeout(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_backoff_ms(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_verify_timeout() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    2
}
fn default_backoff_ms() -> u64 {
    250
}
fn default_max_concurrent() -> usize {
    8
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "netlens", "netlens").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("netlens");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
///
/// Environment variables use the `NETLENS_` prefix with `__` as the
/// section separator (e.g. `NETLENS_ENGINE__URL`,
/// `NETLENS_VERIFY__MAX_RETRIES`).
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load a Config from an explicit file path + environment.
pub fn load_config_from(path: &std::path::Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NETLENS_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning the defaults if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    let path = config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(&path, toml_str)?;
    Ok(())
}

// ── Translation to core runtime config ──────────────────────────────

impl EngineSection {
    /// Build the core [`EngineConfig`] from this section.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let url: url::Url = self.url.parse().map_err(|_| ConfigError::Validation {
            field: "engine.url".into(),
            reason: format!("invalid URL: {}", self.url),
        })?;

        let tls = if self.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        Ok(EngineConfig {
            url,
            tls,
            timeout: Duration::from_secs(self.timeout),
        })
    }
}

impl VerifySection {
    /// Build the core [`VerifyOptions`] from this section.
    pub fn to_verify_options(&self) -> VerifyOptions {
        VerifyOptions {
            query_timeout: Duration::from_secs(self.timeout),
            max_retries: self.max_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            max_concurrent: self.max_concurrent.max(1),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let cfg = Config::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();

        assert_eq!(parsed.engine.url, "http://localhost:9996");
        assert_eq!(parsed.verify.timeout, 30);
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [engine]
            url = "http://engine.internal:9996"

            [verify]
            max_retries = 5
            "#,
        )
        .unwrap();

        assert_eq!(parsed.engine.url, "http://engine.internal:9996");
        assert_eq!(parsed.engine.timeout, 60);
        assert_eq!(parsed.verify.max_retries, 5);
        assert_eq!(parsed.verify.max_concurrent, 8);
    }

    #[test]
    fn engine_section_translates_to_core_config() {
        let section = EngineSection {
            url: "http://localhost:9996".into(),
            timeout: 45,
            ca_cert: None,
            insecure: true,
        };

        let config = section.to_engine_config().unwrap();
        assert_eq!(config.timeout, Duration::from_secs(45));
        assert_eq!(config.tls, TlsVerification::DangerAcceptInvalid);
    }

    #[test]
    fn bad_engine_url_is_rejected() {
        let section = EngineSection {
            url: "not a url".into(),
            ..EngineSection::default()
        };
        assert!(matches!(
            section.to_engine_config(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn verify_section_translates_to_options() {
        let section = VerifySection {
            timeout: 10,
            max_retries: 1,
            retry_backoff_ms: 50,
            max_concurrent: 0,
        };

        let options = section.to_verify_options();
        assert_eq!(options.query_timeout, Duration::from_secs(10));
        // A zero concurrency cap would deadlock every query.
        assert_eq!(options.max_concurrent, 1);
    }

    #[test]
    fn load_config_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[engine]\nurl = \"http://10.1.2.3:9996\"\n").unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.engine.url, "http://10.1.2.3:9996");
    }
}
