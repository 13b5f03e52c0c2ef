//! Script declaration.

use crate::violation::ProtocolViolation;
use serde_json::Value;
use stepfx::{Command, Failure, Outcome, Suspension};

/// One scripted suspension: what the computation must suspend on, and
/// what it is resumed with.
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    /// The expected command or batch.
    pub expected: Suspension,
    /// The value or failure injected in response.
    pub inject: Outcome,
}

/// The expected terminal outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    /// The computation completes with this value.
    Returns(Value),
    /// The computation fails with this failure.
    Throws(Failure),
}

/// A fluent declaration of a procedure's expected protocol.
///
/// ```
/// use serde_json::json;
/// use stepfx::{Command, Failure};
/// use stepfx_verify::Script;
///
/// let script = Script::args(json!(["luke"]))
///     .yield_cmd(Command::new("httpGet").with("url", "/people/1"))
///     .yield_throws(Failure::handler("oops"))
///     .returns(json!({"results": []}));
/// assert_eq!(script.expectations().len(), 1);
/// ```
///
/// A command declared directly before [`returns`](Self::returns) (or
/// [`throws`](Self::throws)) is the short form: the computation must
/// suspend on it once and settle with exactly the injected value (or
/// failure), untransformed.
///
/// Mistakes in the declaration itself (an injection with no command, two
/// commands in a row, a second terminal) are remembered and reported as
/// [`ProtocolViolation::MalformedScript`] when the script is run.
#[derive(Debug, Clone)]
pub struct Script {
    args: Value,
    expectations: Vec<Expectation>,
    pending: Option<Suspension>,
    terminal: Option<Terminal>,
    malformed: Option<String>,
}

impl Script {
    /// Start a script for an invocation with `args`.
    pub fn args(args: Value) -> Self {
        Self {
            args,
            expectations: Vec::new(),
            pending: None,
            terminal: None,
            malformed: None,
        }
    }

    /// The short-return form: one suspension on `command`, injected
    /// `value`, and `value` returned untransformed.
    pub fn short_return(args: Value, command: Command, value: Value) -> Self {
        Self::args(args).yield_cmd(command).returns(value)
    }

    /// Expect a suspension on a single command.
    #[must_use]
    pub fn yield_cmd(self, command: Command) -> Self {
        self.expect(Suspension::One(command))
    }

    /// Expect a suspension on an ordered batch.
    #[must_use]
    pub fn yield_cmds(self, commands: Vec<Command>) -> Self {
        self.expect(Suspension::All(commands))
    }

    /// Resume the last expected suspension with `value`. For a batch,
    /// `value` is the array of results.
    #[must_use]
    pub fn yield_returns(self, value: Value) -> Self {
        self.inject(Ok(value), "yield_returns")
    }

    /// Resume the last expected suspension with `failure`.
    #[must_use]
    pub fn yield_throws(self, failure: Failure) -> Self {
        self.inject(Err(failure), "yield_throws")
    }

    /// Expect the computation to complete with `value`.
    #[must_use]
    pub fn returns(self, value: Value) -> Self {
        self.settle(Terminal::Returns(value))
    }

    /// Expect the computation to fail with `failure`.
    #[must_use]
    pub fn throws(self, failure: Failure) -> Self {
        self.settle(Terminal::Throws(failure))
    }

    /// The invocation arguments.
    pub fn arguments(&self) -> &Value {
        &self.args
    }

    /// Declared expectations, in order.
    pub fn expectations(&self) -> &[Expectation] {
        &self.expectations
    }

    /// The declared terminal, if any.
    pub fn terminal(&self) -> Option<&Terminal> {
        self.terminal.as_ref()
    }

    /// Check the declaration is complete and well-formed.
    pub fn validate(&self) -> Result<&Terminal, ProtocolViolation> {
        if let Some(reason) = &self.malformed {
            return Err(ProtocolViolation::MalformedScript(reason.clone()));
        }
        if let Some(pending) = &self.pending {
            return Err(ProtocolViolation::MalformedScript(format!(
                "expected suspension {} has no injected outcome",
                pending.to_value()
            )));
        }
        self.terminal.as_ref().ok_or_else(|| {
            ProtocolViolation::MalformedScript("no terminal `returns` or `throws`".into())
        })
    }

    fn expect(mut self, suspension: Suspension) -> Self {
        if self.terminal.is_some() {
            self.mark(format!(
                "suspension {} declared after the terminal expectation",
                suspension.to_value()
            ));
        } else if let Some(prev) = &self.pending {
            let reason = format!(
                "suspension {} declared before {} was given an injected outcome",
                suspension.to_value(),
                prev.to_value()
            );
            self.mark(reason);
        }
        self.pending = Some(suspension);
        self
    }

    fn inject(mut self, inject: Outcome, what: &str) -> Self {
        match self.pending.take() {
            Some(expected) => self.expectations.push(Expectation { expected, inject }),
            None => self.mark(format!("`{what}` without a preceding expected command")),
        }
        self
    }

    fn settle(mut self, terminal: Terminal) -> Self {
        if self.terminal.is_some() {
            self.mark("more than one terminal expectation".into());
            return self;
        }
        if let Some(expected) = self.pending.take() {
            let inject = match &terminal {
                Terminal::Returns(v) => Ok(v.clone()),
                Terminal::Throws(f) => Err(f.clone()),
            };
            self.expectations.push(Expectation { expected, inject });
        }
        self.terminal = Some(terminal);
        self
    }

    fn mark(&mut self, reason: String) {
        if self.malformed.is_none() {
            self.malformed = Some(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn get(url: &str) -> Command {
        Command::new("httpGet").with("url", url)
    }

    #[test]
    fn builds_entries_in_order() {
        let script = Script::args(json!([]))
            .yield_cmd(get("/a"))
            .yield_returns(json!(1))
            .yield_cmds(vec![get("/b"), get("/c")])
            .yield_throws(Failure::handler("x"))
            .returns(json!("done"));

        assert!(script.validate().is_ok());
        let e = script.expectations();
        assert_eq!(e.len(), 2);
        assert_eq!(e[0].expected, Suspension::One(get("/a")));
        assert_eq!(e[0].inject, Ok(json!(1)));
        assert_eq!(e[1].expected, Suspension::All(vec![get("/b"), get("/c")]));
        assert_eq!(e[1].inject, Err(Failure::handler("x")));
        assert_eq!(script.terminal(), Some(&Terminal::Returns(json!("done"))));
    }

    #[test]
    fn short_return_injects_the_returned_value() {
        let script = Script::short_return(json!([]), get("/a"), json!({"ok": true}));
        assert!(script.validate().is_ok());
        assert_eq!(script.expectations()[0].inject, Ok(json!({"ok": true})));
        assert_eq!(
            script.terminal(),
            Some(&Terminal::Returns(json!({"ok": true})))
        );
    }

    #[test]
    fn zero_expectations_is_valid() {
        let script = Script::args(json!(1)).returns(json!(1));
        assert!(script.validate().is_ok());
        assert!(script.expectations().is_empty());
    }

    #[test]
    fn malformed_declarations_are_reported() {
        let cases = [
            Script::args(json!([])).yield_returns(json!(1)).returns(json!(1)),
            Script::args(json!([]))
                .yield_cmd(get("/a"))
                .yield_cmd(get("/b"))
                .returns(json!(1)),
            Script::args(json!([])).returns(json!(1)).throws(Failure::handler("x")),
            Script::args(json!([])).yield_cmd(get("/a")).yield_returns(json!(1)),
            Script::args(json!([])).returns(json!(1)).yield_cmd(get("/a")),
        ];
        for script in cases {
            assert!(matches!(
                script.validate(),
                Err(ProtocolViolation::MalformedScript(_))
            ));
        }
    }
}
