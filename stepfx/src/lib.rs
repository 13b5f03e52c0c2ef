//! # stepfx: protocol types for effect-interpreted computations
//!
//! Business logic in `stepfx` never performs a side effect. It is written as
//! a resumable [`Computation`] that *suspends* on plain [`Command`] values,
//! and something else (an interpreter, or a test harness) decides what to
//! do with them and resumes the computation with the outcome.
//!
//! This crate holds only the vocabulary shared by every runtime:
//!
//! | Concept | Types |
//! |---------|-------|
//! | Descriptors | [`Command`] |
//! | Resumable computation | [`Computation`], [`Resume`], [`Step`], [`Suspension`], [`Session`] |
//! | Business functions | [`Procedure`] |
//! | Failures | [`Failure`], [`CommandError`], [`SessionError`], [`HookError`] |
//! | Telemetry | [`TelemetryRecord`], [`TelemetryEvent`], [`Trace`], [`Frame`], [`Hook`] |
//!
//! The live interpreter lives in `stepfx-runtime`, the telemetry registry in
//! `stepfx-hooks`, and the scripted protocol verifier in `stepfx-verify`.
//!
//! ## Values
//!
//! Command payloads, arguments and results are `serde_json::Value`. Commands
//! are data, compared structurally, and are the wire format between business
//! logic, handlers and monitoring sinks alike.

#![deny(missing_docs)]

pub mod command;
pub mod computation;
pub mod error;
pub mod hook;
pub mod id;
pub mod procedure;
pub mod telemetry;
pub mod time;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use command::Command;
pub use computation::{Computation, Outcome, Resume, Session, Step, Suspension, from_fn};
pub use error::{CommandError, Failure, HookError, SessionError};
pub use hook::{Hook, HookPoint};
pub use id::CorrelationId;
pub use procedure::{Procedure, procedure};
pub use telemetry::{Frame, TelemetryEvent, TelemetryRecord, Trace};
pub use time::{Latency, Timestamp};
