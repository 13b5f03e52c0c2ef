//! Telemetry records: the wire format for monitoring sinks.
//!
//! Four kinds of record are emitted per invocation: `call` before the
//! computation starts, `call_complete` after it settles, and `command` /
//! `command_complete` around every dispatched command. Each record carries
//! a [`Trace`] so nested invocations can be reconstructed from records
//! alone.

use crate::command::Command;
use crate::error::Failure;
use crate::hook::HookPoint;
use crate::id::CorrelationId;
use crate::time::{Latency, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One level of the invocation stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Name of the procedure invoked at this level.
    pub procedure: String,
    /// Arguments it was invoked with.
    pub args: Value,
    /// Command types resolvable at this level, sorted.
    pub handlers: Vec<String>,
}

impl Frame {
    /// Create a frame.
    pub fn new(procedure: impl Into<String>, args: Value, handlers: Vec<String>) -> Self {
        Self {
            procedure: procedure.into(),
            args,
            handlers,
        }
    }
}

/// Where in an invocation tree a record was emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    /// Optional human name from the invocation config.
    pub name: Option<String>,
    /// Correlation id shared by the whole invocation tree.
    pub cid: CorrelationId,
    /// Outermost frame first; the last frame is the emitting invocation.
    pub stack: Vec<Frame>,
}

impl Trace {
    /// Nesting depth (1 for a top-level invocation).
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The frame of the emitting invocation.
    pub fn current(&self) -> Option<&Frame> {
        self.stack.last()
    }
}

/// The four record kinds.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Before the computation is started.
    Call {
        /// Procedure name.
        procedure: String,
        /// Invocation arguments.
        args: Value,
        /// When the call started.
        start: Timestamp,
    },

    /// After the computation settled.
    CallComplete {
        /// Procedure name.
        procedure: String,
        /// Invocation arguments.
        args: Value,
        /// When the call started.
        start: Timestamp,
        /// When it settled.
        end: Timestamp,
        /// `end - start`.
        latency: Latency,
        /// Suspensions the computation went through.
        steps: u64,
        /// Whether the call completed with a value.
        success: bool,
        /// Terminal value, on success.
        result: Option<Value>,
        /// Terminal failure, otherwise.
        failure: Option<Failure>,
    },

    /// Before a command is dispatched.
    Command {
        /// The dispatched command.
        command: Command,
        /// Step of the suspension that produced it.
        step: u64,
        /// Position within a fan-out batch (0 for single commands).
        index: usize,
        /// When dispatch started.
        start: Timestamp,
    },

    /// After a command settled.
    CommandComplete {
        /// The dispatched command.
        command: Command,
        /// Step of the suspension that produced it.
        step: u64,
        /// Position within a fan-out batch (0 for single commands).
        index: usize,
        /// When dispatch started.
        start: Timestamp,
        /// When it settled.
        end: Timestamp,
        /// `end - start`.
        latency: Latency,
        /// Whether the handler produced a value.
        success: bool,
        /// Handler value, on success.
        result: Option<Value>,
        /// Handler or lookup failure, otherwise.
        failure: Option<Failure>,
    },
}

impl TelemetryEvent {
    /// A `call_complete` event ending now.
    pub fn call_complete(
        procedure: impl Into<String>,
        args: Value,
        start: Timestamp,
        steps: u64,
        outcome: &Result<Value, Failure>,
    ) -> Self {
        let end = Timestamp::now();
        let (success, result, failure) = split(outcome);
        Self::CallComplete {
            procedure: procedure.into(),
            args,
            start,
            end,
            latency: start.until(end),
            steps,
            success,
            result,
            failure,
        }
    }

    /// A `command_complete` event ending now.
    pub fn command_complete(
        command: Command,
        step: u64,
        index: usize,
        start: Timestamp,
        outcome: &Result<Value, Failure>,
    ) -> Self {
        let end = Timestamp::now();
        let (success, result, failure) = split(outcome);
        Self::CommandComplete {
            command,
            step,
            index,
            start,
            end,
            latency: start.until(end),
            success,
            result,
            failure,
        }
    }

    /// The hook point this event fires at.
    pub fn point(&self) -> HookPoint {
        match self {
            Self::Call { .. } => HookPoint::Call,
            Self::CallComplete { .. } => HookPoint::CallComplete,
            Self::Command { .. } => HookPoint::Command,
            Self::CommandComplete { .. } => HookPoint::CommandComplete,
        }
    }

    /// Success flag of a completion event; `None` for start events.
    pub fn success(&self) -> Option<bool> {
        match self {
            Self::CallComplete { success, .. } | Self::CommandComplete { success, .. } => {
                Some(*success)
            }
            _ => None,
        }
    }

    /// The command of a command event.
    pub fn command(&self) -> Option<&Command> {
        match self {
            Self::Command { command, .. } | Self::CommandComplete { command, .. } => Some(command),
            _ => None,
        }
    }
}

fn split(outcome: &Result<Value, Failure>) -> (bool, Option<Value>, Option<Failure>) {
    match outcome {
        Ok(v) => (true, Some(v.clone()), None),
        Err(f) => (false, None, Some(f.clone())),
    }
}

/// A telemetry event plus the trace it was emitted under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Invocation-tree position.
    pub trace: Trace,
    /// What happened.
    #[serde(flatten)]
    pub event: TelemetryEvent,
}

impl TelemetryRecord {
    /// The hook point this record fires at.
    pub fn point(&self) -> HookPoint {
        self.event.point()
    }
}
