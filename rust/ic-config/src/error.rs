//! ic-config: error types

use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("config validation failed: {0}")]
    Validation(String),

    #[error("unknown field pointer: {0}")]
    UnknownField(String),

    #[error("duplicate client_id: {0}")]
    DuplicateClient(String),

    #[error("unknown client_id: {0}")]
    UnknownClient(String),
}
