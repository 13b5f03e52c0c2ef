//! Procedures bound into plain async functions.

use crate::config::Config;
use crate::interpreter::Interpreter;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use stepfx::{Outcome, Procedure};

/// A procedure bound to an interpreter and a config. Each [`call`](Self::call)
/// is a fresh top-level invocation with its own computation and, unless the
/// config fixes one, its own correlation id.
#[derive(Clone)]
pub struct Bound {
    interpreter: Interpreter,
    procedure: Arc<dyn Procedure>,
    config: Arc<Config>,
}

impl Bound {
    pub(crate) fn new(
        interpreter: Interpreter,
        procedure: Arc<dyn Procedure>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            interpreter,
            procedure,
            config,
        }
    }

    /// The bound procedure's name.
    pub fn name(&self) -> &str {
        self.procedure.name()
    }

    /// Invoke with `args`.
    pub async fn call(&self, args: Value) -> Outcome {
        self.interpreter
            .run(&self.config, self.procedure.as_ref(), args)
            .await
    }
}

impl Interpreter {
    /// Bind a set of procedures at once, keyed by name.
    pub fn bind_all(
        &self,
        procedures: impl IntoIterator<Item = Arc<dyn Procedure>>,
        config: Arc<Config>,
    ) -> HashMap<String, Bound> {
        procedures
            .into_iter()
            .map(|p| {
                let name = p.name().to_owned();
                (name, self.bind(p, Arc::clone(&config)))
            })
            .collect()
    }
}
