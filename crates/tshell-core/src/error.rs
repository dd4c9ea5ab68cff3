//! Application error types

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Backend Process Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Backend executable not found: {path}")]
    BackendMissing { path: PathBuf },

    #[error("Failed to spawn backend process: {reason}")]
    ProcessSpawn { reason: String },

    #[error("Failed to mark backend executable {path}: {reason}")]
    Chmod { path: PathBuf, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel send error: {message}")]
    ChannelSend { message: String },

    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn spawn(reason: impl Into<String>) -> Self {
        Self::ProcessSpawn {
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn channel_send(message: impl Into<String>) -> Self {
        Self::ChannelSend {
            message: message.into(),
        }
    }

    /// Spawn-failure class errors never trigger the automatic restart
    /// path; they are reported once and wait for a manual restart.
    pub fn is_spawn_failure(&self) -> bool {
        matches!(
            self,
            Error::BackendMissing { .. } | Error::ProcessSpawn { .. } | Error::Chmod { .. }
        )
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::spawn("permission denied");
        assert_eq!(
            err.to_string(),
            "Failed to spawn backend process: permission denied"
        );

        let err = Error::BackendMissing {
            path: PathBuf::from("/opt/app/resources/twitter_alert_tool"),
        };
        assert!(err.to_string().contains("twitter_alert_tool"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_spawn_failure_classification() {
        assert!(Error::spawn("boom").is_spawn_failure());
        assert!(Error::BackendMissing {
            path: PathBuf::from("/missing")
        }
        .is_spawn_failure());
        assert!(Error::Chmod {
            path: PathBuf::from("/ro"),
            reason: "read-only".to_string()
        }
        .is_spawn_failure());
        assert!(!Error::config("bad toml").is_spawn_failure());
        assert!(!Error::ChannelClosed.is_spawn_failure());
    }

    #[test]
    fn test_error_constructors() {
        let _ = Error::spawn("test");
        let _ = Error::config("test");
        let _ = Error::channel_send("test");
    }
}
