//! Configuration management for the re-share bot
//!
//! Secrets come from the environment and nothing else. Everything that is
//! not a secret has a compiled-in default and may be overridden by an
//! optional TOML file:
//!
//! ```toml
//! [watch]
//! hashtags = ["#rails", "#ruby", "#RubyOnRails"]
//! max_hashtags = 10
//!
//! [supervisor]
//! retry_delay = 60  # seconds to wait before resubscribing
//!
//! [twitter]
//! api_base = "https://api.twitter.com"
//! stream_base = "https://stream.twitter.com"
//! ```

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::filter::{WatchList, DEFAULT_HASHTAGS, MAX_HASHTAG_COUNT};

pub const CONSUMER_KEY: &str = "CONSUMER_KEY";
pub const CONSUMER_SECRET: &str = "CONSUMER_SECRET";
pub const ACCESS_TOKEN: &str = "ACCESS_TOKEN";
pub const ACCESS_TOKEN_SECRET: &str = "ACCESS_TOKEN_SECRET";

pub const DEFAULT_RETRY_DELAY_SECS: u64 = 60;
pub const DEFAULT_API_BASE: &str = "https://api.twitter.com";
pub const DEFAULT_STREAM_BASE: &str = "https://stream.twitter.com";

/// OAuth 1.0a credentials, read once at startup
///
/// Debug output never includes the secret values.
#[derive(Debug)]
pub struct Credentials {
    pub consumer_key: SecretString,
    pub consumer_secret: SecretString,
    pub access_token: SecretString,
    pub access_token_secret: SecretString,
}

impl Credentials {
    pub fn new(
        consumer_key: &str,
        consumer_secret: &str,
        access_token: &str,
        access_token_secret: &str,
    ) -> Self {
        Self {
            consumer_key: SecretString::from(consumer_key.to_string()),
            consumer_secret: SecretString::from(consumer_secret.to_string()),
            access_token: SecretString::from(access_token.to_string()),
            access_token_secret: SecretString::from(access_token_secret.to_string()),
        }
    }

    /// Read all four credentials from the process environment
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingCredential` naming the first variable that
    /// is unset or blank.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary lookup function
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| -> Result<SecretString> {
            match lookup(name) {
                Some(value) if !value.trim().is_empty() => {
                    Ok(SecretString::from(value.trim().to_string()))
                }
                _ => Err(ConfigError::MissingCredential(name.to_string()).into()),
            }
        };

        Ok(Self {
            consumer_key: read(CONSUMER_KEY)?,
            consumer_secret: read(CONSUMER_SECRET)?,
            access_token: read(ACCESS_TOKEN)?,
            access_token_secret: read(ACCESS_TOKEN_SECRET)?,
        })
    }

    pub(crate) fn consumer_key(&self) -> &str {
        self.consumer_key.expose_secret()
    }

    pub(crate) fn consumer_secret(&self) -> &str {
        self.consumer_secret.expose_secret()
    }

    pub(crate) fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }

    pub(crate) fn access_token_secret(&self) -> &str {
        self.access_token_secret.expose_secret()
    }
}

/// On-disk configuration file; every field is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub watch: WatchConfig,
    pub supervisor: SupervisorConfig,
    pub twitter: TwitterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub hashtags: Vec<String>,
    pub max_hashtags: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            hashtags: DEFAULT_HASHTAGS.iter().map(|s| s.to_string()).collect(),
            max_hashtags: MAX_HASHTAG_COUNT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Seconds to wait after a stream failure before resubscribing
    pub retry_delay: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            retry_delay: DEFAULT_RETRY_DELAY_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitterConfig {
    pub api_base: String,
    pub stream_base: String,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            stream_base: DEFAULT_STREAM_BASE.to_string(),
        }
    }
}

impl FileConfig {
    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: FileConfig = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Load the configuration file if one is found, defaults otherwise
    ///
    /// An explicitly requested path must exist. The default location is
    /// optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        match resolve_config_path()? {
            Some(path) if path.exists() => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::load_from_path(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}

/// Immutable runtime configuration, built once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Arc<Credentials>,
    pub watch_list: WatchList,
    pub max_hashtags: usize,
    pub retry_delay: Duration,
    pub twitter: TwitterConfig,
}

impl Config {
    /// Combine credentials with the file configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when the watch list is empty or
    /// malformed, when the retry delay is zero, or when an API base URL is
    /// not http(s).
    pub fn build(credentials: Credentials, file: FileConfig) -> Result<Self> {
        let watch_list = WatchList::new(file.watch.hashtags)?;

        if file.supervisor.retry_delay == 0 {
            return Err(ConfigError::Invalid(
                "supervisor.retry_delay must be at least 1 second".to_string(),
            )
            .into());
        }

        for (field, url) in [
            ("twitter.api_base", &file.twitter.api_base),
            ("twitter.stream_base", &file.twitter.stream_base),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be an http(s) URL, got '{}'",
                    field, url
                ))
                .into());
            }
        }

        Ok(Self {
            credentials: Arc::new(credentials),
            watch_list,
            max_hashtags: file.watch.max_hashtags,
            retry_delay: Duration::from_secs(file.supervisor.retry_delay),
            twitter: TwitterConfig {
                api_base: file.twitter.api_base.trim_end_matches('/').to_string(),
                stream_base: file.twitter.stream_base.trim_end_matches('/').to_string(),
            },
        })
    }

    /// Load credentials from the environment and the optional config file
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let credentials = Credentials::from_env()?;
        let file = FileConfig::load(explicit_path)?;
        Self::build(credentials, file)
    }
}

/// Resolve the configuration file path following the XDG Base Directory layout
///
/// `RESHARE_CONFIG` wins over the platform config directory. Returns `None`
/// when no config directory can be determined.
pub fn resolve_config_path() -> Result<Option<PathBuf>> {
    if let Ok(path) = std::env::var("RESHARE_CONFIG") {
        return Ok(Some(PathBuf::from(shellexpand::tilde(&path).to_string())));
    }

    Ok(dirs::config_dir().map(|dir| dir.join("reshare-bot").join("config.toml")))
}
