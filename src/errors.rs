//! Errors for fleet tracker
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FleetError {
    #[error("HTTP request failed")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error")]
    SerdeError(#[from] serde_json::Error),

    #[error("Configuration error")]
    ConfigError(#[from] config::ConfigError),

    #[error("IO error")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration: {message}")]
    ConfigurationError { message: String },

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Backend returned status {status}: {body}")]
    BackendStatus { status: u16, body: String },

    #[error("Malformed {category} response: {origin}")]
    MalformedResponse { category: String, origin: String },

    #[error("Rejected by backend: {message}")]
    Rejected { message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid vessel id")]
    InvalidVesselId(String),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },
}
