//! Error type shared across the pagewatch crates.

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PagewatchError>;

/// One variant per subsystem; payloads are human-readable because every
/// failure in the watch pipeline ends up in a log line, never in a
/// user-facing response.
#[derive(Debug, thiserror::Error)]
pub enum PagewatchError {
    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("channel error: {0}")]
    Channel(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
