//! Error types for nextver-core configuration.
//!
//! Subsystems carry their own enums next to the code that raises them:
//! [`EngineError`](crate::engine::EngineError),
//! [`GitError`](crate::git::GitError),
//! [`VersionError`](crate::version::VersionError) and
//! [`ExprError`](crate::version::expr::ExprError).

use thiserror::Error;

/// Errors that can occur when working with configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error("invalid configuration: {0}")]
    Deserialize(#[from] Box<figment::Error>),
}

/// Result type alias using [`ConfigError`].
pub type ConfigResult<T> = Result<T, ConfigError>;
