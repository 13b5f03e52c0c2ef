//! Command dispatch and fan-out.

use crate::config::CallContext;
use crate::handler::HandlerContext;
use crate::interpreter::{Interpreter, Perform};
use async_trait::async_trait;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use stepfx::hook::HookPoint;
use stepfx::telemetry::TelemetryEvent;
use stepfx::{Command, Failure, Outcome, Suspension, Timestamp};
use tokio::sync::mpsc;
use tracing::Instrument;

/// Dispatch one command: emit `command`, resolve and invoke its handler,
/// emit `command_complete`, return the outcome.
///
/// The handler runs on its own task, so a panic surfaces as
/// [`Failure::Panicked`] rather than unwinding through the interpreter. An
/// unregistered type settles as [`Failure::Lookup`] and is reported exactly
/// like a handler failure.
pub async fn dispatch(
    interpreter: &Interpreter,
    command: Command,
    step: u64,
    index: usize,
    ctx: &CallContext,
) -> Outcome {
    let start = Timestamp::now();
    let span = tracing::debug_span!("stepfx.command", kind = command.kind(), step, index);

    async move {
        ctx.emit(HookPoint::Command, || TelemetryEvent::Command {
            command: command.clone(),
            step,
            index,
            start,
        });

        let outcome = match interpreter.handlers().get(command.kind()) {
            None => Err(Failure::Lookup(command.kind().to_owned())),
            Some(handler) => {
                let handler = Arc::clone(handler);
                let cx = HandlerContext::new(interpreter.clone(), ctx.clone());
                let cmd = command.clone();
                let task = tokio::spawn(
                    async move { handler.handle(cmd, cx).await }.in_current_span(),
                );
                match task.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::warn!(error = %e, "handler task failed");
                        Err(Failure::Panicked(e.to_string()))
                    }
                }
            }
        };

        tracing::debug!(success = outcome.is_ok(), "command settled");
        ctx.emit(HookPoint::CommandComplete, || {
            TelemetryEvent::command_complete(command, step, index, start, &outcome)
        });
        outcome
    }
    .instrument(span)
    .await
}

/// Dispatch every command concurrently and collect the results in input
/// order.
///
/// Every dispatch is spawned as its own detached task before any result is
/// awaited, and reports back over a channel. The batch fails with the first
/// failure in *completion* order. Successful sibling results are discarded
/// in that case: the caller sees only the failure.
///
/// Nothing is cancelled. Siblings of a failed dispatch run to completion
/// and emit their telemetry, and the same holds when the caller drops the
/// returned future mid-batch.
pub async fn dispatch_all(
    interpreter: &Interpreter,
    commands: Vec<Command>,
    step: u64,
    ctx: &CallContext,
) -> Outcome {
    let total = commands.len();
    let (tx, mut rx) = mpsc::unbounded_channel();
    for (index, command) in commands.into_iter().enumerate() {
        let interpreter = interpreter.clone();
        let ctx = ctx.clone();
        let tx = tx.clone();
        tokio::spawn(
            async move {
                let outcome = dispatch(&interpreter, command, step, index, &ctx).await;
                // The receiver is gone once the batch has failed or was dropped.
                let _ = tx.send((index, outcome));
            }
            .in_current_span(),
        );
    }
    drop(tx);

    let mut results: Vec<Option<Value>> = vec![None; total];
    for _ in 0..total {
        match rx.recv().await {
            Some((index, Ok(value))) => results[index] = Some(value),
            Some((index, Err(failure))) => {
                tracing::debug!(index, step, "fan-out failed; siblings keep running");
                return Err(failure);
            }
            None => {
                tracing::warn!(step, "fan-out task ended without a result");
                return Err(Failure::Panicked(
                    "fan-out task ended without a result".into(),
                ));
            }
        }
    }

    Ok(Value::Array(
        results
            .into_iter()
            .map(|v| v.unwrap_or(Value::Null))
            .collect(),
    ))
}

/// The live [`Perform`] implementation: routes single commands to
/// [`dispatch`] and batches to [`dispatch_all`].
#[derive(Clone)]
pub struct Dispatcher {
    interpreter: Interpreter,
}

impl Dispatcher {
    /// Dispatch through `interpreter`'s handlers.
    pub fn new(interpreter: Interpreter) -> Self {
        Self { interpreter }
    }
}

#[async_trait]
impl Perform for Dispatcher {
    type Error = Infallible;

    async fn perform(
        &self,
        suspension: Suspension,
        step: u64,
        ctx: &CallContext,
    ) -> Result<Outcome, Infallible> {
        Ok(match suspension {
            Suspension::One(command) => dispatch(&self.interpreter, command, step, 0, ctx).await,
            Suspension::All(commands) => {
                dispatch_all(&self.interpreter, commands, step, ctx).await
            }
        })
    }
}
