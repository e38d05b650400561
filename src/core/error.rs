use thiserror::Error;

/// Rejection of a single feed item. Recoverable: the rest of the batch is still parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("feed item has no token object")]
    MissingToken,

    #[error("required field missing: {0}")]
    MissingField(&'static str),

    #[error("token id is not an integer: {0}")]
    InvalidId(String),
}

/// Failure to obtain a batch from a feed source
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed returned HTTP status {0}")]
    Status(u16),

    #[error("failed to read feed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode feed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("all feed sources failed")]
    Exhausted,
}

/// Push notification delivery failure
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("bark endpoint not configured")]
    Disabled,

    #[error("bark request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("bark returned HTTP status {0}")]
    Status(u16),

    #[error("invalid bark endpoint: {0}")]
    InvalidEndpoint(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
