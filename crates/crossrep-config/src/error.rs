use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "configuration file not found. Looked in:\n\
        - $CROSSREP_CONFIG_PATH\n\
        - current directory: appsettings.local.json, appsettings.json\n\
        - ./.crossrep/ directory\n\
        - <config dir>/crossrep/appsettings.json\n\
        Pass --config or set CROSSREP_CONFIG_PATH to point at a file directly"
    )]
    ConfigFileNotFound,

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
