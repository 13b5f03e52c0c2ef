//! Telemetry emission for stepfx.
//!
//! The [`HookRegistry`] collects [`Hook`] implementations and delivers each
//! [`TelemetryRecord`] to every hook subscribed to its point, in
//! registration order. Emission is fire-and-forget: hook errors are logged
//! and never reach the interpreter, and no hook can alter an outcome.
//!
//! [`FnHook`] adapts a closure to a single point (the `on_call`,
//! `on_command`, ... callbacks of an invocation config). [`TracingHook`]
//! turns records into `tracing` events.

#![deny(missing_docs)]

mod fn_hook;
mod tracing_hook;

pub use fn_hook::FnHook;
pub use tracing_hook::TracingHook;

use stepfx::hook::{Hook, HookPoint};
use stepfx::telemetry::TelemetryRecord;
use std::sync::Arc;

/// An ordered set of hooks.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn Hook>>,
}

impl HookRegistry {
    /// Create a new empty hook registry.
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Add a hook to the end of the pipeline.
    pub fn add(&mut self, hook: Arc<dyn Hook>) {
        self.hooks.push(hook);
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// True when no hooks are registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Whether any hook listens at `point`. Lets callers skip building
    /// records nobody will see.
    pub fn listens(&self, point: HookPoint) -> bool {
        self.hooks.iter().any(|h| h.points().contains(&point))
    }

    /// Deliver a record to every hook registered for its point.
    ///
    /// Every hook sees the record regardless of what earlier hooks did.
    /// Errors are logged and otherwise ignored.
    pub fn emit(&self, record: &TelemetryRecord) {
        let point = record.point();
        for hook in &self.hooks {
            if !hook.points().contains(&point) {
                continue;
            }
            if let Err(e) = hook.on_record(record) {
                tracing::warn!(
                    ?point,
                    cid = %record.trace.cid,
                    error = %e,
                    "telemetry hook failed"
                );
            }
        }
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
