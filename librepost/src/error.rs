//! Error types for Repost

use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RepostError>;

#[derive(Error, Debug)]
pub enum RepostError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Content transform failed: {0}")]
    ContentTransform(String),

    #[error("Source fetch failed: {0}")]
    Source(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RepostError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            RepostError::InvalidInput(_) => 3,
            RepostError::Authentication(_) => 2,
            RepostError::Platform(_) => 1,
            RepostError::Config(_) => 1,
            RepostError::Database(_) => 1,
            RepostError::ContentTransform(_) => 1,
            RepostError::Source(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Corrupt row in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },

    #[error("{0} not found")]
    NotFound(String),
}

/// Failure scoped to a single account's publish attempt.
///
/// These never escape the dispatcher; they are rendered into the
/// `error_message` of a [`crate::types::PublishResult`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlatformError {
    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Platform API error {code}: {message}")]
    Upstream { code: i64, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Content validation failed: {0}")]
    Validation(String),

    #[error("Timed out after {}", humantime::format_duration(*.0))]
    Timeout(Duration),
}

impl PlatformError {
    /// Short machine-friendly category, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            PlatformError::Credential(_) => "credential",
            PlatformError::Upstream { .. } => "upstream",
            PlatformError::Network(_) => "network",
            PlatformError::Validation(_) => "validation",
            PlatformError::Timeout(_) => "timeout",
        }
    }
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        // Strip the URL: Telegram embeds the bot token in the request path.
        PlatformError::Network(err.without_url().to_string())
    }
}
