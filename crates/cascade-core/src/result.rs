//! Result type alias for configuration resolution

use crate::error::CascadeError;

/// Standard Result type for configuration resolution
pub type Result<T> = std::result::Result<T, CascadeError>;

/// Per-file errors are reported and skipped; graph errors propagate
pub trait ResultExt<T> {
    /// Convert a recoverable error into `None` after logging it
    fn recoverable(self) -> Result<Option<T>>;
}

impl<T> ResultExt<T> for Result<T> {
    fn recoverable(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_recoverable() => {
                tracing::warn!("Skipping after recoverable error: {}", err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
