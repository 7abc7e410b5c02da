//! Error types for rollcall-core

use thiserror::Error;

/// Core error type for rollcall
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Configuration file not found
    #[error("[C001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// C002: Invalid configuration value
    #[error("[C002] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// C003: Migrations directory not found
    #[error("[C003] Migrations directory not found: {path}")]
    MigrationsDirNotFound { path: String },

    /// C004: Migration file name does not produce a usable unit name
    #[error("[C004] Invalid migration file name '{file}': {reason}")]
    InvalidUnitFile { file: String, reason: String },

    /// C005: IO error
    #[error("[C005] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// C006: IO error with file path context
    #[error("[C006] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C007: YAML parse error
    #[error("[C007] Config parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
