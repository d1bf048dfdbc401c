//! Result and error types for Paseo.

use thiserror::Error;

/// Result type for Paseo operations
pub type PaseoResult<T> = Result<T, PaseoError>;

/// Errors that can occur while driving a page
#[derive(Debug, Error)]
pub enum PaseoError {
    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// No element matched the locator within its wait budget
    #[error("Element not found: {locator}")]
    ElementNotFound {
        /// Locator that matched nothing
        locator: String,
    },

    /// Element handle was invalidated by a re-render or navigation
    #[error("Stale element reference: {locator}")]
    StaleElement {
        /// Locator the handle was acquired from
        locator: String,
    },

    /// Another element covered the target at click time
    #[error("Click intercepted on {locator}")]
    ClickIntercepted {
        /// Locator of the intended click target
        locator: String,
    },

    /// Explicit postcondition violated; fatal to the running scenario
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Human-readable message with actual vs expected values
        message: String,
    },

    /// Low-level driver failure (protocol error, browser crash)
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Screenshot capture failure
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Script evaluation failure
    #[error("Script evaluation failed: {message}")]
    Script {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PaseoError {
    /// Whether this error is a transient element-level condition.
    ///
    /// Recoverable errors are converted into soft-skips or candidate
    /// retries at the point of use; everything else propagates.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::ElementNotFound { .. }
                | Self::StaleElement { .. }
                | Self::ClickIntercepted { .. }
        )
    }

    /// Create an assertion failure with the given message
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }
}
