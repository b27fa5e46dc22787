//! Error types for dsud

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// dsud error types
///
/// Steady-state network errors are absorbed where they occur (UDP is
/// best-effort); these variants cover configuration and process setup, the
/// only places a hard failure is ever surfaced.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration load/parse failure
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
