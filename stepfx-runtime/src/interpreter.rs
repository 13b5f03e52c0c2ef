//! The drive loop and the live interpreter.

use crate::bound::Bound;
use crate::config::{CallContext, Config};
use crate::dispatch::Dispatcher;
use crate::handler::HandlerMap;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use stepfx::hook::HookPoint;
use stepfx::telemetry::{Frame, TelemetryEvent};
use stepfx::{Failure, Outcome, Procedure, Resume, Session, Step, Suspension, Timestamp};
use tracing::Instrument;

/// What the drive loop asks for at each suspension.
///
/// The live implementation is [`Dispatcher`]. A test harness implements
/// it to inject scripted outcomes instead of calling handlers.
#[async_trait]
pub trait Perform: Send + Sync {
    /// Errors that halt the run outright instead of being resumed into the
    /// computation. [`Dispatcher`] has none.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Produce the outcome the computation is resumed with. For a batch,
    /// a successful outcome is an array in suspension order.
    async fn perform(
        &self,
        suspension: Suspension,
        step: u64,
        ctx: &CallContext,
    ) -> Result<Outcome, Self::Error>;
}

/// Drive one invocation of `procedure` to its terminal outcome.
///
/// `ctx` is the invocation's own context: its top frame describes this
/// call. Emits `call` before starting and `call_complete` after settling.
/// Every suspension goes through `performer`; its outcome is resumed into
/// the computation as a value or a thrown failure, and the computation
/// alone decides whether a failure is recoverable.
///
/// If `performer` returns an error, the computation is abandoned without
/// being resumed, a failed `call_complete` carrying
/// [`Failure::Aborted`] is emitted, and the error is returned.
pub async fn drive<P>(
    performer: &P,
    ctx: &CallContext,
    procedure: &dyn Procedure,
    args: Value,
) -> Result<Outcome, P::Error>
where
    P: Perform + ?Sized,
{
    let name = procedure.name().to_owned();
    let start = Timestamp::now();
    let span = tracing::debug_span!(
        "stepfx.call",
        procedure = name.as_str(),
        cid = ctx.cid().as_str(),
        depth = ctx.depth()
    );

    async move {
        ctx.emit(HookPoint::Call, || TelemetryEvent::Call {
            procedure: name.clone(),
            args: args.clone(),
            start,
        });
        tracing::debug!("call started");

        let mut session = Session::new(procedure.start(args.clone()));
        let mut input = Resume::Start;
        let outcome = loop {
            let step = match session.resume(input) {
                Ok(step) => step,
                Err(e) => break Err(Failure::computation(e.to_string())),
            };
            match step {
                Step::Done(value) => break Ok(value),
                Step::Failed(failure) => break Err(failure),
                Step::Suspend(suspension) => {
                    let n = session.step();
                    tracing::trace!(step = n, commands = suspension.len(), "suspended");
                    match performer.perform(suspension, n, ctx).await {
                        Ok(outcome) => input = Resume::from(outcome),
                        Err(e) => {
                            tracing::warn!(step = n, error = %e, "run aborted");
                            let aborted = Err(Failure::Aborted(e.to_string()));
                            ctx.emit(HookPoint::CallComplete, || {
                                TelemetryEvent::call_complete(name, args, start, n, &aborted)
                            });
                            return Err(e);
                        }
                    }
                }
            }
        };

        tracing::debug!(success = outcome.is_ok(), steps = session.step(), "call settled");
        ctx.emit(HookPoint::CallComplete, || {
            TelemetryEvent::call_complete(name, args, start, session.step(), &outcome)
        });
        Ok(outcome)
    }
    .instrument(span)
    .await
}

/// The live effect interpreter: a handler map plus the drive loop.
///
/// Cheap to clone; handlers are shared.
#[derive(Clone, Debug)]
pub struct Interpreter {
    handlers: Arc<HandlerMap>,
}

impl Interpreter {
    /// Interpret with `handlers`.
    pub fn new(handlers: HandlerMap) -> Self {
        Self {
            handlers: Arc::new(handlers),
        }
    }

    /// The handler map.
    pub fn handlers(&self) -> &HandlerMap {
        &self.handlers
    }

    /// Run a top-level invocation under `config`.
    pub async fn run(
        &self,
        config: &Arc<Config>,
        procedure: &dyn Procedure,
        args: Value,
    ) -> Outcome {
        let root = CallContext::root(Arc::clone(config));
        self.run_nested(&root, procedure, args).await
    }

    /// Run an invocation nested under `parent`: the parent's config and
    /// cid, one more frame.
    pub async fn run_nested(
        &self,
        parent: &CallContext,
        procedure: &dyn Procedure,
        args: Value,
    ) -> Outcome {
        let ctx = parent.push(Frame::new(
            procedure.name(),
            args.clone(),
            self.handlers.kinds(),
        ));
        let dispatcher = Dispatcher::new(self.clone());
        match drive(&dispatcher, &ctx, procedure, args).await {
            Ok(outcome) => outcome,
            Err(never) => match never {},
        }
    }

    /// Bind `procedure` into an ordinary async function.
    pub fn bind(&self, procedure: Arc<dyn Procedure>, config: Arc<Config>) -> Bound {
        Bound::new(self.clone(), procedure, config)
    }
}
