use std::path::PathBuf;

/// Errors surfaced by the game-service client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The service answered with an `error` field in its body.
    #[error("{0}")]
    Server(String),

    #[error("server returned HTTP {status}")]
    Status { status: u16 },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid server url '{0}'")]
    BadUrl(String),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Errors raised by the event-loop driver.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("event loop stalled: no timer armed and no request in flight")]
    Stalled,

    #[error("response channel closed")]
    ChannelClosed,
}
