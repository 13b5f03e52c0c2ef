//! Procedures: named business functions that produce computations.

use crate::computation::Computation;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A business function. Each call to [`Procedure::start`] produces a fresh
/// computation; computations are never reused across invocations.
pub trait Procedure: Send + Sync {
    /// Name recorded in call frames and telemetry.
    fn name(&self) -> &str;

    /// Create the computation for one invocation with `args`.
    fn start(&self, args: Value) -> Box<dyn Computation>;
}

impl fmt::Debug for dyn Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure").field("name", &self.name()).finish()
    }
}

/// A [`Procedure`] backed by a closure.
pub struct FnProcedure<F> {
    name: String,
    f: F,
}

impl<F, C> Procedure for FnProcedure<F>
where
    F: Fn(Value) -> C + Send + Sync,
    C: Computation + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&self, args: Value) -> Box<dyn Computation> {
        Box::new((self.f)(args))
    }
}

/// Build a shareable procedure from a name and a computation factory.
pub fn procedure<F, C>(name: impl Into<String>, f: F) -> Arc<dyn Procedure>
where
    F: Fn(Value) -> C + Send + Sync + 'static,
    C: Computation + 'static,
{
    Arc::new(FnProcedure {
        name: name.into(),
        f,
    })
}
