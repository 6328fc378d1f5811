//! Error types for the re-share bot

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReshareError>;

#[derive(Error, Debug)]
pub enum ReshareError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),
}

impl ReshareError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ReshareError::Config(_) => 2,
            ReshareError::Platform(_) => 1,
            ReshareError::Stream(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required credential: environment variable {0} is not set or empty")]
    MissingCredential(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Failures reported by the request-based API
#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Post already re-shared: {0}")]
    AlreadyReshared(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),
}

/// Failures that end a live subscription
#[derive(Error, Debug, Clone)]
pub enum StreamError {
    #[error("Stream disconnected by server (code {code}): {reason}")]
    Disconnected { code: u32, reason: String },

    #[error("Stream ended")]
    Ended,

    #[error("Failed to decode stream message: {0}")]
    Decode(String),

    #[error("Stream network error: {0}")]
    Network(String),
}
