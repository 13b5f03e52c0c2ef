//! A hook that writes telemetry records as `tracing` events.

use stepfx::error::HookError;
use stepfx::hook::{Hook, HookPoint};
use stepfx::telemetry::{TelemetryEvent, TelemetryRecord};

/// Emits one `tracing` event per record under the `stepfx::telemetry`
/// target. Users bring their own subscriber.
///
/// Failed completions are logged at `WARN`, everything else at `DEBUG`.
/// Argument and result payloads are omitted unless `capture_values` is set.
#[derive(Debug, Clone, Default)]
pub struct TracingHook {
    capture_values: bool,
}

impl TracingHook {
    /// Create a hook that logs without payloads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Include args, results and failures in the events.
    #[must_use]
    pub fn capture_values(mut self, capture: bool) -> Self {
        self.capture_values = capture;
        self
    }
}

impl Hook for TracingHook {
    fn points(&self) -> &[HookPoint] {
        &HookPoint::ALL
    }

    fn on_record(&self, record: &TelemetryRecord) -> Result<(), HookError> {
        let cid = record.trace.cid.as_str();
        let depth = record.trace.depth();
        match &record.event {
            TelemetryEvent::Call { procedure, args, .. } => {
                if self.capture_values {
                    tracing::debug!(
                        target: "stepfx::telemetry",
                        cid, depth, procedure = procedure.as_str(), %args,
                        "call"
                    );
                } else {
                    tracing::debug!(
                        target: "stepfx::telemetry",
                        cid, depth, procedure = procedure.as_str(),
                        "call"
                    );
                }
            }
            TelemetryEvent::CallComplete {
                procedure,
                latency,
                steps,
                success,
                result,
                failure,
                ..
            } => {
                let latency_us = latency.as_micros();
                if !success {
                    tracing::warn!(
                        target: "stepfx::telemetry",
                        cid, depth, procedure = procedure.as_str(), latency_us, steps,
                        failure = ?failure,
                        "call failed"
                    );
                } else if self.capture_values {
                    tracing::debug!(
                        target: "stepfx::telemetry",
                        cid, depth, procedure = procedure.as_str(), latency_us, steps,
                        result = ?result,
                        "call complete"
                    );
                } else {
                    tracing::debug!(
                        target: "stepfx::telemetry",
                        cid, depth, procedure = procedure.as_str(), latency_us, steps,
                        "call complete"
                    );
                }
            }
            TelemetryEvent::Command { command, step, index, .. } => {
                let kind = command.kind();
                if self.capture_values {
                    tracing::debug!(
                        target: "stepfx::telemetry",
                        cid, depth, kind, step, index, %command,
                        "command"
                    );
                } else {
                    tracing::debug!(
                        target: "stepfx::telemetry",
                        cid, depth, kind, step, index,
                        "command"
                    );
                }
            }
            TelemetryEvent::CommandComplete {
                command,
                step,
                index,
                latency,
                success,
                result,
                failure,
                ..
            } => {
                let kind = command.kind();
                let latency_us = latency.as_micros();
                if !success {
                    tracing::warn!(
                        target: "stepfx::telemetry",
                        cid, depth, kind, step, index, latency_us,
                        failure = ?failure,
                        "command failed"
                    );
                } else if self.capture_values {
                    tracing::debug!(
                        target: "stepfx::telemetry",
                        cid, depth, kind, step, index, latency_us,
                        result = ?result,
                        "command complete"
                    );
                } else {
                    tracing::debug!(
                        target: "stepfx::telemetry",
                        cid, depth, kind, step, index, latency_us,
                        "command complete"
                    );
                }
            }
            _ => {}
        }
        Ok(())
    }
}
