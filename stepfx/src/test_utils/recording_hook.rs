//! RecordingHook: keeps every telemetry record for inspection in tests.

use crate::error::HookError;
use crate::hook::{Hook, HookPoint};
use crate::telemetry::TelemetryRecord;
use std::sync::Mutex;

/// A hook that records every record it sees at all hook points.
/// Use `.records()` to inspect what was recorded.
pub struct RecordingHook {
    records: Mutex<Vec<TelemetryRecord>>,
}

impl RecordingHook {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of all records, in emission order.
    pub fn records(&self) -> Vec<TelemetryRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Snapshot of records emitted at one point.
    pub fn at(&self, point: HookPoint) -> Vec<TelemetryRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.point() == point)
            .collect()
    }
}

impl Default for RecordingHook {
    fn default() -> Self {
        Self::new()
    }
}

impl Hook for RecordingHook {
    fn points(&self) -> &[HookPoint] {
        &HookPoint::ALL
    }

    fn on_record(&self, record: &TelemetryRecord) -> Result<(), HookError> {
        self.records
            .lock()
            .map_err(|e| HookError::Failed(e.to_string()))?
            .push(record.clone());
        Ok(())
    }
}
