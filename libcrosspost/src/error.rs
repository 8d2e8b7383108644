//! Error types for Crosspost

use thiserror::Error;

use crate::types::ErrorKind;

pub type Result<T> = std::result::Result<T, CrosspostError>;

#[derive(Error, Debug)]
pub enum CrosspostError {
    #[error("Authentication required: {0}")]
    Authentication(String),

    #[error("Not allowed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

/// Failures raised by the delivery layer.
///
/// Each variant maps onto a typed [`ErrorKind`], so retry classification
/// never has to parse message text for outcomes produced here.
#[derive(Error, Debug, Clone)]
pub enum DeliveryError {
    #[error("platform not configured: {0}")]
    Unconfigured(String),

    #[error("platform not yet supported: {0}")]
    Unsupported(String),

    #[error("monthly limit reached: {0}")]
    QuotaExhausted(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Delivery rejected: {0}")]
    Rejected(String),

    #[error("Delivery timed out after {0}s")]
    Timeout(u64),
}

impl DeliveryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unconfigured(_) => ErrorKind::Unconfigured,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::QuotaExhausted(_) => ErrorKind::QuotaExhausted,
            Self::Network(_) | Self::Rejected(_) | Self::Timeout(_) => ErrorKind::Transient,
        }
    }
}
