//! Error types for telemirror.

/// Top-level error type for the mirror.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}

/// Errors raised by a messaging transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Authorization failed on {name}: {reason}")]
    AuthFailed { name: String, reason: String },

    #[error("{method} rejected by the platform: {description}")]
    Api { method: String, description: String },

    #[error("Failed to resolve entity {id}: {reason}")]
    ResolveFailed { id: i64, reason: String },

    #[error("Unsupported payload: {0}")]
    Unsupported(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Pipeline-related errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Malformed event: {0}")]
    InvalidEvent(String),
}
