#![deny(missing_docs)]
//! The stepfx effect interpreter.
//!
//! [`Interpreter::run`] drives one [`stepfx::Procedure`] invocation to
//! completion: it starts the computation, routes each suspension through
//! the [`Dispatcher`] (single command) or the fan-out coordinator (batch),
//! resumes the computation with the outcome, and emits telemetry at every
//! boundary. Handlers receive a [`HandlerContext`] through which they can
//! invoke further procedures; nested invocations share the [`Config`] and
//! correlation id and push one [`stepfx::Frame`] onto the stack.
//!
//! The drive loop itself ([`drive`]) is generic over [`Perform`], the seam
//! at which a test harness substitutes scripted outcomes for real handlers.
//!
//! No retries, timeouts or cancellation: a dispatched command always runs
//! to completion, and handlers own their own policies.

mod bound;
mod config;
mod dispatch;
mod handler;
mod interpreter;

pub use bound::Bound;
pub use config::{CallContext, Config};
pub use dispatch::{Dispatcher, dispatch, dispatch_all};
pub use handler::{Handler, HandlerContext, HandlerMap, handler_fn, sync_handler};
pub use interpreter::{Interpreter, Perform, drive};
