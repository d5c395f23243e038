//! Result and error types for agentprobe.

use thiserror::Error;

/// Result type for agentprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Message fragments a driver emits when the page or its execution context
/// went away underneath an in-flight action.
const TEARDOWN_SIGNATURES: &[&str] = &[
    "target closed",
    "has been closed",
    "context was destroyed",
    "detached",
];

/// Errors that can occur while driving the application under test
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Browser executable not found
    #[error("Browser not found. Install Chromium or set CHROMIUM_PATH")]
    BrowserNotFound,

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Timed out after {ms}ms waiting for {waited_for}")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
        /// What was being waited for
        waited_for: String,
    },

    /// No element matched a locator
    #[error("No element matches {locator}")]
    ElementNotFound {
        /// Locator description
        locator: String,
    },

    /// A browser action (click, fill, press) failed
    #[error("{action} failed: {message}")]
    ActionFailed {
        /// Action name
        action: String,
        /// Error message
        message: String,
    },

    /// The page or browsing context was closed during an action
    #[error("Target closed: {message}")]
    TargetClosed {
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    ScreenshotError {
        /// Error message
        message: String,
    },

    /// Assertion failed
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Fixture error (setup/teardown failed)
    #[error("Fixture error: {message}")]
    Fixture {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Create an action failure
    #[must_use]
    pub fn action(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ActionFailed {
            action: action.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(timeout: std::time::Duration, waited_for: impl Into<String>) -> Self {
        Self::Timeout {
            ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            waited_for: waited_for.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error means the page was torn down under the action.
    ///
    /// A fast redirect can close or detach the page before a click returns;
    /// callers of redirect-aware flows treat this as a successful navigation.
    #[must_use]
    pub fn is_context_teardown(&self) -> bool {
        match self {
            Self::TargetClosed { .. } => true,
            Self::ActionFailed { message, .. }
            | Self::PageError { message }
            | Self::NavigationError { message, .. } => is_teardown_message(message),
            _ => false,
        }
    }
}

/// Check a raw driver message for a context-teardown signature
#[must_use]
pub fn is_teardown_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    TEARDOWN_SIGNATURES.iter().any(|sig| lower.contains(sig))
}

/// Fail with an assertion error unless `condition` holds
pub fn ensure(condition: bool, message: impl Into<String>) -> ProbeResult<()> {
    if condition {
        Ok(())
    } else {
        Err(ProbeError::assertion(message))
    }
}
