//! Protocol violations.

use crate::diff::Mismatch;
use serde_json::Value;
use stepfx::Failure;
use thiserror::Error;

/// A deviation of a procedure from its declared script.
///
/// Distinct from [`Failure`]: a violation is never injected into the
/// computation and never recoverable. It means the implementation under
/// test broke its contract (or the script is wrong).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolViolation {
    /// The script declaration itself is incomplete or inconsistent.
    #[error("malformed script: {0}")]
    MalformedScript(String),

    /// The computation suspended on something other than the expected
    /// command or batch.
    #[error("step {step}: actual suspension does not match the expected command {mismatch}")]
    CommandMismatch {
        /// Script position (and step number) of the mismatch.
        step: usize,
        /// Where the suspension first differs.
        mismatch: Mismatch,
    },

    /// The computation suspended after every expectation was consumed.
    #[error("step {step}: computation suspended on {actual} but the script has no more expectations")]
    Overrun {
        /// Step number of the unexpected suspension.
        step: usize,
        /// What it suspended on.
        actual: Value,
    },

    /// The computation settled before reaching every expectation.
    #[error(
        "computation settled after {consumed} step(s) but {remaining} expectation(s) were never reached; next expected {next}"
    )]
    Unconsumed {
        /// Expectations consumed.
        consumed: usize,
        /// Expectations left over.
        remaining: usize,
        /// The first expectation never reached.
        next: Value,
    },

    /// The computation returned a different value.
    #[error("return value does not match {mismatch}")]
    ReturnMismatch {
        /// Where the return value first differs.
        mismatch: Mismatch,
    },

    /// A return was expected but the computation failed.
    #[error("expected return {expected} but the computation failed: {actual}")]
    UnexpectedFailure {
        /// The declared return value.
        expected: Value,
        /// The actual failure.
        actual: Failure,
    },

    /// A failure was expected but the computation returned.
    #[error("expected failure `{expected}` but the computation returned {actual}")]
    UnexpectedReturn {
        /// The declared failure.
        expected: Failure,
        /// The actual return value.
        actual: Value,
    },

    /// The computation failed with a different failure.
    #[error("expected failure `{expected}` but the computation failed with `{actual}`")]
    FailureMismatch {
        /// The declared failure.
        expected: Failure,
        /// The actual failure.
        actual: Failure,
    },
}
