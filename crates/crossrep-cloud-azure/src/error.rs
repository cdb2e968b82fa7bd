//! Azure gateway error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("environment variable {0} is not set")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Gateway error: {0}")]
    Gateway(#[from] crossrep_cloud::GatewayError),
}

pub type Result<T> = std::result::Result<T, AzureError>;
