//! Handlers: the only code that performs real effects.

use crate::config::CallContext;
use crate::interpreter::Interpreter;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use stepfx::{Command, Outcome, Procedure};

/// Performs the effect described by one command type.
///
/// A handler may settle immediately or after awaiting; both look the same
/// to the interpreter. It may also invoke further procedures through
/// [`HandlerContext::run`].
#[async_trait]
pub trait Handler: Send + Sync {
    /// Perform `command`.
    async fn handle(&self, command: Command, cx: HandlerContext) -> Outcome;
}

/// What a handler gets besides its command: the interpreter that
/// dispatched it and the dispatching invocation's context.
#[derive(Clone)]
pub struct HandlerContext {
    interpreter: Interpreter,
    context: CallContext,
}

impl HandlerContext {
    pub(crate) fn new(interpreter: Interpreter, context: CallContext) -> Self {
        Self {
            interpreter,
            context,
        }
    }

    /// Invoke `procedure` as a nested call: same config, same cid, same
    /// handlers, one more frame on the stack.
    pub async fn run(&self, procedure: &dyn Procedure, args: Value) -> Outcome {
        self.interpreter
            .run_nested(&self.context, procedure, args)
            .await
    }

    /// The dispatching invocation's context.
    pub fn context(&self) -> &CallContext {
        &self.context
    }

    /// The handlers available for nested calls.
    pub fn handlers(&self) -> &HandlerMap {
        self.interpreter.handlers()
    }

    /// The dispatching interpreter.
    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }
}

/// Command type → handler.
#[derive(Clone, Default)]
pub struct HandlerMap {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, returning the handler it replaces.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        handler: Arc<dyn Handler>,
    ) -> Option<Arc<dyn Handler>> {
        self.handlers.insert(kind.into(), handler)
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, kind: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        self.register(kind, handler);
        self
    }

    /// The handler for `kind`.
    pub fn get(&self, kind: &str) -> Option<&Arc<dyn Handler>> {
        self.handlers.get(kind)
    }

    /// Registered command types, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.handlers.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerMap")
            .field("kinds", &self.kinds())
            .finish()
    }
}

struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Command, HandlerContext) -> Fut + Send + Sync,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    async fn handle(&self, command: Command, cx: HandlerContext) -> Outcome {
        (self.0)(command, cx).await
    }
}

/// Adapt an async closure into a handler.
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn Handler>
where
    F: Fn(Command, HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

struct SyncHandler<F>(F);

#[async_trait]
impl<F> Handler for SyncHandler<F>
where
    F: Fn(&Command) -> Outcome + Send + Sync,
{
    async fn handle(&self, command: Command, _cx: HandlerContext) -> Outcome {
        (self.0)(&command)
    }
}

/// Adapt a closure that settles immediately into a handler.
pub fn sync_handler<F>(f: F) -> Arc<dyn Handler>
where
    F: Fn(&Command) -> Outcome + Send + Sync + 'static,
{
    Arc::new(SyncHandler(f))
}
