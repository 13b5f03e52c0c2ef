//! The scripted drive: a [`Perform`] stub that asserts instead of performing.

use crate::diff::diff;
use crate::script::{Expectation, Script, Terminal};
use crate::violation::ProtocolViolation;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use stepfx::hook::HookPoint;
use stepfx::telemetry::{Frame, TelemetryEvent};
use stepfx::{Command, Outcome, Procedure, Suspension, Timestamp};
use stepfx_runtime::{CallContext, Config, Perform, drive};

struct Cursor {
    queue: VecDeque<Expectation>,
    consumed: usize,
}

/// Replays a script's expectations in order.
///
/// Each suspension must structurally equal the next expectation's
/// command (or batch); the expectation's outcome is then injected. A
/// mismatch or a suspension past the end of the script halts the run with
/// a [`ProtocolViolation`].
///
/// Telemetry is emitted as if the commands had been dispatched; for a
/// batch resumed with a failure, every command of the batch is reported
/// with that failure.
pub struct ScriptedEffects {
    cursor: Mutex<Cursor>,
}

impl ScriptedEffects {
    /// Replay `expectations`.
    pub fn new(expectations: impl IntoIterator<Item = Expectation>) -> Self {
        Self {
            cursor: Mutex::new(Cursor {
                queue: expectations.into_iter().collect(),
                consumed: 0,
            }),
        }
    }

    /// Expectations consumed so far.
    pub fn consumed(&self) -> usize {
        self.lock().consumed
    }

    /// Expectations not yet reached.
    pub fn remaining(&self) -> Vec<Expectation> {
        self.lock().queue.iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, Cursor> {
        self.cursor.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Perform for ScriptedEffects {
    type Error = ProtocolViolation;

    async fn perform(
        &self,
        suspension: Suspension,
        step: u64,
        ctx: &CallContext,
    ) -> Result<Outcome, ProtocolViolation> {
        let (position, next) = {
            let mut cursor = self.lock();
            let position = cursor.consumed;
            let next = cursor.queue.pop_front();
            if next.is_some() {
                cursor.consumed += 1;
            }
            (position, next)
        };

        let Some(expectation) = next else {
            return Err(ProtocolViolation::Overrun {
                step: position,
                actual: suspension.to_value(),
            });
        };
        if let Some(mismatch) = diff(&expectation.expected.to_value(), &suspension.to_value()) {
            return Err(ProtocolViolation::CommandMismatch {
                step: position,
                mismatch,
            });
        }

        tracing::trace!(step, position, "scripted suspension matched");
        record(ctx, &suspension, step, &expectation.inject);
        Ok(expectation.inject)
    }
}

fn record(ctx: &CallContext, suspension: &Suspension, step: u64, inject: &Outcome) {
    let start = Timestamp::now();
    match suspension {
        Suspension::One(command) => emit_pair(ctx, command, step, 0, start, inject),
        Suspension::All(commands) => {
            for (index, command) in commands.iter().enumerate() {
                let outcome = match inject {
                    Ok(Value::Array(values)) => {
                        Ok(values.get(index).cloned().unwrap_or(Value::Null))
                    }
                    other => other.clone(),
                };
                emit_pair(ctx, command, step, index, start, &outcome);
            }
        }
    }
}

fn emit_pair(
    ctx: &CallContext,
    command: &Command,
    step: u64,
    index: usize,
    start: Timestamp,
    outcome: &Outcome,
) {
    ctx.emit(HookPoint::Command, || TelemetryEvent::Command {
        command: command.clone(),
        step,
        index,
        start,
    });
    ctx.emit(HookPoint::CommandComplete, || {
        TelemetryEvent::command_complete(command.clone(), step, index, start, outcome)
    });
}

/// Verify `procedure` against `script` with a default config.
pub async fn verify(procedure: &dyn Procedure, script: &Script) -> Result<(), ProtocolViolation> {
    verify_with(&Arc::new(Config::new()), procedure, script).await
}

/// Verify `procedure` against `script`, emitting telemetry through
/// `config`.
///
/// Leftover expectations are reported before the terminal outcome is
/// compared: a computation that settles early usually also settles with
/// the wrong value, and the leftover is the more useful diagnosis.
pub async fn verify_with(
    config: &Arc<Config>,
    procedure: &dyn Procedure,
    script: &Script,
) -> Result<(), ProtocolViolation> {
    let terminal = script.validate()?;
    let args = script.arguments().clone();

    let kinds: BTreeSet<String> = script
        .expectations()
        .iter()
        .flat_map(|e| match &e.expected {
            Suspension::One(c) => vec![c.kind().to_owned()],
            Suspension::All(cs) => cs.iter().map(|c| c.kind().to_owned()).collect(),
        })
        .collect();
    let ctx = CallContext::root(Arc::clone(config)).push(Frame::new(
        procedure.name(),
        args.clone(),
        kinds.into_iter().collect(),
    ));

    let stub = ScriptedEffects::new(script.expectations().iter().cloned());
    let outcome = drive(&stub, &ctx, procedure, args).await?;

    let remaining = stub.remaining();
    if let Some(next) = remaining.first() {
        return Err(ProtocolViolation::Unconsumed {
            consumed: stub.consumed(),
            remaining: remaining.len(),
            next: next.expected.to_value(),
        });
    }

    match (terminal, outcome) {
        (Terminal::Returns(expected), Ok(actual)) => match diff(expected, &actual) {
            Some(mismatch) => Err(ProtocolViolation::ReturnMismatch { mismatch }),
            None => Ok(()),
        },
        (Terminal::Returns(expected), Err(actual)) => Err(ProtocolViolation::UnexpectedFailure {
            expected: expected.clone(),
            actual,
        }),
        (Terminal::Throws(expected), Ok(actual)) => Err(ProtocolViolation::UnexpectedReturn {
            expected: expected.clone(),
            actual,
        }),
        (Terminal::Throws(expected), Err(actual)) if *expected == actual => Ok(()),
        (Terminal::Throws(expected), Err(actual)) => Err(ProtocolViolation::FailureMismatch {
            expected: expected.clone(),
            actual,
        }),
    }
}

/// Verify and panic with the violation. For direct use in tests.
pub async fn assert_protocol(procedure: &dyn Procedure, script: &Script) {
    if let Err(violation) = verify(procedure, script).await {
        panic!("protocol violation in `{}`: {violation}", procedure.name());
    }
}

/// A reusable check: one procedure, one script, run as often as needed.
/// Every run uses a fresh computation and a fresh replay of the script.
pub struct Verifier {
    procedure: Arc<dyn Procedure>,
    script: Script,
    config: Arc<Config>,
}

impl Verifier {
    /// Check `procedure` against `script`.
    pub fn new(procedure: Arc<dyn Procedure>, script: Script) -> Self {
        Self {
            procedure,
            script,
            config: Arc::new(Config::new()),
        }
    }

    /// Emit telemetry through `config`.
    #[must_use]
    pub fn with_config(mut self, config: Arc<Config>) -> Self {
        self.config = config;
        self
    }

    /// Run the check.
    pub async fn check(&self) -> Result<(), ProtocolViolation> {
        verify_with(&self.config, self.procedure.as_ref(), &self.script).await
    }

    /// Run the check and panic on violation.
    pub async fn assert(&self) {
        if let Err(violation) = self.check().await {
            panic!(
                "protocol violation in `{}`: {violation}",
                self.procedure.name()
            );
        }
    }
}
