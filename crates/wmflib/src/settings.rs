//! Settings of the `wmflib` command line tool, from `~/.config/wmflib/config.toml`.

use crate::http::{HttpError, HttpSession};
use crate::phabricator::DEFAULT_SECTION;
use crate::prometheus::{PROMETHEUS_API, THANOS_API};
use crate::retry::{
    BackoffMode, InvalidParams, RetryPolicy, RetryPolicyBuilder, DEFAULT_DELAY, DEFAULT_TRIES,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Unable to locate the config directory")]
    Xdg(#[from] xdg::BaseDirectoriesError),

    #[error("Unable to access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unable to serialize the default config")]
    Serialize(#[from] toml::ser::Error),
}

fn secs(value: f64, what: &str) -> Result<Duration, InvalidParams> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| InvalidParams(format!("{what} must be a non-negative number of seconds, got {value}")))
}

/// Retry policy used by commands that retry (optional `[retry]` section).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included.
    pub tries: u32,
    /// Base delay in seconds.
    pub delay_secs: f64,
    pub backoff_mode: BackoffMode,
    /// Upper bound of any single delay, in seconds.
    pub max_delay_secs: Option<f64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            tries: DEFAULT_TRIES,
            delay_secs: DEFAULT_DELAY.as_secs_f64(),
            backoff_mode: BackoffMode::default(),
            max_delay_secs: None,
        }
    }
}

impl RetryConfig {
    /// A policy builder preset with these values, to add a predicate or callbacks to.
    pub fn builder<E>(&self) -> Result<RetryPolicyBuilder<E>, InvalidParams> {
        let mut builder = RetryPolicy::builder()
            .tries(self.tries)
            .delay(secs(self.delay_secs, "delay_secs")?)
            .backoff_mode(self.backoff_mode);
        if let Some(max) = self.max_delay_secs {
            builder = builder.max_delay(secs(max, "max_delay_secs")?);
        }
        Ok(builder)
    }

    /// Build a policy retrying every error of type `E`.
    pub fn policy<E>(&self) -> Result<RetryPolicy<E>, InvalidParams> {
        self.builder()?.build()
    }
}

/// Timeout and retries of HTTP sessions (`[http]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: f64,
    pub tries: u32,
    pub backoff_secs: f64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5.0,
            tries: 3,
            backoff_secs: 1.0,
        }
    }
}

impl HttpConfig {
    pub fn session(&self, name: &str) -> Result<HttpSession, HttpError> {
        HttpSession::builder(name)
            .timeout(secs(self.timeout_secs, "timeout_secs")?)
            .tries(self.tries)
            .backoff(secs(self.backoff_secs, "backoff_secs")?)
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrometheusConfig {
    /// Query URL, `{site}` and `{instance}` are substituted.
    pub url_template: String,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            url_template: PROMETHEUS_API.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThanosConfig {
    pub endpoint: String,
}

impl Default for ThanosConfig {
    fn default() -> Self {
        Self {
            endpoint: THANOS_API.to_string(),
        }
    }
}

/// tcpircbot address (`[irc]`). IRC relaying is off while `host` is unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrcConfig {
    pub host: Option<String>,
    pub port: u16,
}

impl Default for IrcConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 9200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhabricatorConfig {
    /// INI file holding the bot credentials.
    pub bot_config_file: PathBuf,
    pub section: String,
}

impl Default for PhabricatorConfig {
    fn default() -> Self {
        Self {
            bot_config_file: PathBuf::from("/etc/phabricator_bot.conf"),
            section: DEFAULT_SECTION.to_string(),
        }
    }
}

/// Whole settings file. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WmflibConfig {
    /// If missing, built-in retry defaults are used.
    pub retry: Option<RetryConfig>,
    pub http: HttpConfig,
    pub prometheus: PrometheusConfig,
    pub thanos: ThanosConfig,
    pub irc: IrcConfig,
    pub phabricator: PhabricatorConfig,
}

impl WmflibConfig {
    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf, SettingsError> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("wmflib")?;
    Ok(xdg_dirs.get_config_home().join("config.toml"))
}

/// Load the settings, creating a default file if none exists.
pub fn load_or_init() -> Result<WmflibConfig, SettingsError> {
    load_or_init_at(&config_path()?)
}

/// Like [`load_or_init`] for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<WmflibConfig, SettingsError> {
    let io_err = |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };
    if !path.exists() {
        let default_cfg = WmflibConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, toml).map_err(io_err)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from(path)
}

/// Load the settings from `path`, which must exist.
pub fn load_from(path: &Path) -> Result<WmflibConfig, SettingsError> {
    let data = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&data).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
