//! Error types for the protocol.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failure delivered into, or raised out of, a computation.
///
/// Lookup and handler failures reach the computation as an exceptional
/// resumption ([`crate::Resume::Throw`]); whether that is recoverable is
/// the business logic's decision. A computation failure is a terminal
/// outcome. Failures are plain data so they can be injected by a test
/// script, carried in telemetry and compared.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Failure {
    /// No handler is registered for the command's type.
    #[error("no handler registered for command type `{0}`")]
    Lookup(String),

    /// A handler signaled failure.
    #[error("handler failed: {0}")]
    Handler(String),

    /// The business computation raised a failure it did not recover from.
    #[error("computation failed: {0}")]
    Computation(String),

    /// A handler task panicked before settling.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// The run was halted by the effect layer without resuming the
    /// computation (e.g. a protocol violation under test).
    #[error("run aborted: {0}")]
    Aborted(String),
}

impl Failure {
    /// A handler failure with the given message.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }

    /// A computation failure with the given message.
    pub fn computation(message: impl Into<String>) -> Self {
        Self::Computation(message.into())
    }
}

/// Errors building a [`crate::Command`] from arbitrary data.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CommandError {
    /// Commands are objects.
    #[error("command must be an object, got {0}")]
    NotAnObject(serde_json::Value),

    /// The object has no `type` field.
    #[error("command is missing its `type` field")]
    MissingType,

    /// The `type` field is not a string.
    #[error("command `type` must be a string, got {0}")]
    InvalidType(serde_json::Value),

    /// The typed command could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Misuse of a computation's resumption protocol.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// `Start` was sent to a computation that already started.
    #[error("computation already started")]
    AlreadyStarted,

    /// A value or failure was injected before `Start`.
    #[error("computation has not started")]
    NotStarted,

    /// The computation completed or failed; it accepts no more resumptions.
    #[error("computation already finished after {steps} step(s)")]
    Finished {
        /// Resumptions accepted before the computation settled.
        steps: u64,
    },
}

/// Hook errors. These are logged but never affect the run.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook execution failed.
    #[error("hook failed: {0}")]
    Failed(String),

    /// Catch-all.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
