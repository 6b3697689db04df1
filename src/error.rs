use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to the calling (test) thread.
///
/// Each variant is a distinct failure category so callers can tell "the action
/// could not be attempted" apart from "the assertion did not hold" apart from
/// "the UI thread did not answer in time".
#[derive(Error, Debug)]
pub enum RobotError {
    /// A task or query body failed (or panicked) while running on the UI thread.
    ///
    /// The original error is kept as the source so it can be downcast by the caller.
    #[error("Unexpected error while executing on the UI thread: {source}")]
    UnexpectedExecution {
        #[source]
        source: anyhow::Error,
    },

    /// A driver precondition did not hold, so the action was not attempted.
    #[error("Action failed: {0}")]
    ActionFailed(String),

    /// A driver postcondition did not hold after the action was performed.
    #[error("[{property}] expected: <{expected}> but was: <{actual}>")]
    AssertionFailed {
        property: String,
        expected: String,
        actual: String,
    },

    /// The UI thread did not complete the operation within the bounded wait.
    #[error("Timed out after {after:?} waiting for {operation}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The UI thread has shut down or refused the posted work.
    #[error("UI thread is not available")]
    UiThreadUnavailable,

    /// A blocking wait was requested from the UI thread itself.
    #[error("Cannot wait for the UI thread from the UI thread ({0})")]
    WaitOnUiThread(&'static str),

    /// A widget was mutated from a thread other than the UI thread.
    #[error("Widget '{widget}' property '{property}' mutated off the UI thread (thread: {thread})")]
    ThreadViolation {
        widget: String,
        property: &'static str,
        thread: String,
    },

    /// Component lookup found zero or several matches.
    #[error("Component lookup failed: {0}")]
    ComponentLookup(String),
}

impl RobotError {
    /// Build an [`RobotError::ActionFailed`] from any displayable message.
    pub fn action_failed(message: impl Into<String>) -> Self {
        Self::ActionFailed(message.into())
    }

    /// Build an [`RobotError::AssertionFailed`] for a named property.
    pub fn assertion_failed(
        property: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self::AssertionFailed {
            property: property.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Whether this error is a timeout from a bridge or idle wait.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result alias used across the library.
pub type RobotResult<T> = std::result::Result<T, RobotError>;
