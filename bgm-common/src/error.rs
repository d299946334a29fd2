//! Common error types for BGM

use thiserror::Error;

/// Common result type for BGM operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across BGM services
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
