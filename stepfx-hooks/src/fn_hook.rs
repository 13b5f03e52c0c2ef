//! Closure-backed hooks.

use stepfx::error::HookError;
use stepfx::hook::{Hook, HookPoint};
use stepfx::telemetry::TelemetryRecord;

/// A hook that calls a closure at exactly one point.
pub struct FnHook<F> {
    points: [HookPoint; 1],
    f: F,
}

impl<F> FnHook<F>
where
    F: Fn(&TelemetryRecord) + Send + Sync,
{
    /// Fire `f` at `point`.
    pub fn new(point: HookPoint, f: F) -> Self {
        Self { points: [point], f }
    }
}

impl<F> Hook for FnHook<F>
where
    F: Fn(&TelemetryRecord) + Send + Sync,
{
    fn points(&self) -> &[HookPoint] {
        &self.points
    }

    fn on_record(&self, record: &TelemetryRecord) -> Result<(), HookError> {
        (self.f)(record);
        Ok(())
    }
}
