use thiserror::Error;

/// Errors that surface out of the tracker.
///
/// Steady-state failures (camera or network disconnects, malformed control
/// messages, out-of-range routes, full channels) are recovered where they
/// happen and never reach this type; what remains is startup configuration
/// and I/O plumbing.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("logging setup error: {0}")]
    Logging(#[from] log::SetLoggerError),
}

impl TrackerError {
    pub fn config(msg: impl Into<String>) -> Self {
        TrackerError::Config(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
