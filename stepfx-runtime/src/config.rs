//! Invocation config and the per-invocation call context.

use stepfx::hook::{Hook, HookPoint};
use stepfx::telemetry::{Frame, TelemetryEvent, TelemetryRecord, Trace};
use stepfx::CorrelationId;
use stepfx_hooks::{FnHook, HookRegistry};
use std::sync::Arc;

/// Options for a top-level invocation: a display name, an optional fixed
/// correlation id, and the telemetry hooks.
///
/// Immutable once built. Shared by `Arc` across the whole nested-call tree.
///
/// ```
/// use stepfx_runtime::Config;
///
/// let config = Config::new()
///     .with_name("people")
///     .on_command(|record| println!("{:?}", record.event));
/// assert_eq!(config.name(), Some("people"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    name: Option<String>,
    cid: Option<CorrelationId>,
    hooks: HookRegistry,
}

impl Config {
    /// A config with no name, no hooks and a generated correlation id per
    /// top-level invocation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the display name copied into every record's trace.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Fix the correlation id instead of generating one per invocation.
    #[must_use]
    pub fn with_cid(mut self, cid: impl Into<CorrelationId>) -> Self {
        self.cid = Some(cid.into());
        self
    }

    /// Register a hook.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn Hook>) -> Self {
        self.hooks.add(hook);
        self
    }

    /// Callback before a computation starts.
    #[must_use]
    pub fn on_call<F>(self, f: F) -> Self
    where
        F: Fn(&TelemetryRecord) + Send + Sync + 'static,
    {
        self.with_hook(Arc::new(FnHook::new(HookPoint::Call, f)))
    }

    /// Callback after a computation settles.
    #[must_use]
    pub fn on_call_complete<F>(self, f: F) -> Self
    where
        F: Fn(&TelemetryRecord) + Send + Sync + 'static,
    {
        self.with_hook(Arc::new(FnHook::new(HookPoint::CallComplete, f)))
    }

    /// Callback before each command dispatch.
    #[must_use]
    pub fn on_command<F>(self, f: F) -> Self
    where
        F: Fn(&TelemetryRecord) + Send + Sync + 'static,
    {
        self.with_hook(Arc::new(FnHook::new(HookPoint::Command, f)))
    }

    /// Callback after each command settles.
    #[must_use]
    pub fn on_command_complete<F>(self, f: F) -> Self
    where
        F: Fn(&TelemetryRecord) + Send + Sync + 'static,
    {
        self.with_hook(Arc::new(FnHook::new(HookPoint::CommandComplete, f)))
    }

    /// The display name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The fixed correlation id, if any.
    pub fn cid(&self) -> Option<&CorrelationId> {
        self.cid.as_ref()
    }

    /// The registered hooks.
    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }
}

/// Where one invocation sits in a nested-call tree.
///
/// Cloning is cheap. The config is shared; the stack is copied on
/// [`push`](Self::push) and never mutated, so concurrent branches of a
/// fan-out each extend their own copy.
#[derive(Debug, Clone)]
pub struct CallContext {
    config: Arc<Config>,
    cid: CorrelationId,
    stack: Arc<[Frame]>,
}

impl CallContext {
    /// The context of a new top-level invocation: empty stack, the
    /// config's fixed cid or a freshly generated one.
    pub fn root(config: Arc<Config>) -> Self {
        let cid = config.cid.clone().unwrap_or_else(CorrelationId::generate);
        Self {
            config,
            cid,
            stack: Arc::from(Vec::new()),
        }
    }

    /// A child context with `frame` on top. Config and cid are inherited.
    pub fn push(&self, frame: Frame) -> Self {
        let mut stack = Vec::with_capacity(self.stack.len() + 1);
        stack.extend_from_slice(&self.stack);
        stack.push(frame);
        Self {
            config: Arc::clone(&self.config),
            cid: self.cid.clone(),
            stack: Arc::from(stack),
        }
    }

    /// The shared config.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// The invocation tree's correlation id.
    pub fn cid(&self) -> &CorrelationId {
        &self.cid
    }

    /// Outermost frame first.
    pub fn stack(&self) -> &[Frame] {
        &self.stack
    }

    /// Number of frames.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Snapshot for a telemetry record.
    pub fn trace(&self) -> Trace {
        Trace {
            name: self.config.name.clone(),
            cid: self.cid.clone(),
            stack: self.stack.to_vec(),
        }
    }

    /// Emit a record at `point`. The event is only built when some hook
    /// listens there.
    pub fn emit(&self, point: HookPoint, event: impl FnOnce() -> TelemetryEvent) {
        let hooks = &self.config.hooks;
        if !hooks.listens(point) {
            return;
        }
        hooks.emit(&TelemetryRecord {
            trace: self.trace(),
            event: event(),
        });
    }
}
