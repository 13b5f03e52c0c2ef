//! The Hook interface: observation of an invocation's lifecycle.

use crate::error::HookError;
use crate::telemetry::TelemetryRecord;
use serde::{Deserialize, Serialize};

/// Where in an invocation a hook fires.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPoint {
    /// Before the computation is started.
    Call,
    /// After the computation completed or failed.
    CallComplete,
    /// Before each command is dispatched.
    Command,
    /// After each command settled.
    CommandComplete,
}

impl HookPoint {
    /// Every hook point, in lifecycle order.
    pub const ALL: [HookPoint; 4] = [
        HookPoint::Call,
        HookPoint::Command,
        HookPoint::CommandComplete,
        HookPoint::CallComplete,
    ];
}

/// A hook that observes telemetry records.
///
/// Hooks are observers only: nothing in the interpreter reads their result,
/// and an error is logged and otherwise ignored. `on_record` is called
/// inline on the interpreter's task, so it should return quickly and hand
/// any slow work (network sinks, files) to its own task.
pub trait Hook: Send + Sync {
    /// Which points this hook fires at.
    fn points(&self) -> &[HookPoint];

    /// Called with each record emitted at a registered point.
    fn on_record(&self, record: &TelemetryRecord) -> Result<(), HookError>;
}
