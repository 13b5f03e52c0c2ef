//! Resumable computations: business logic as an explicit suspend/resume
//! state machine.

use crate::command::Command;
use crate::error::{Failure, SessionError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The settled result of a command, a batch, or a whole invocation.
pub type Outcome = Result<Value, Failure>;

/// What a suspended computation is waiting on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Suspension {
    /// A single command. Resumed with its result.
    One(Command),
    /// An ordered batch performed concurrently. Resumed with an array of
    /// results in the same order.
    All(Vec<Command>),
}

impl Suspension {
    /// The JSON form: a command object, or an array of them.
    pub fn to_value(&self) -> Value {
        match self {
            Self::One(cmd) => cmd.to_value(),
            Self::All(cmds) => Value::Array(cmds.iter().map(Command::to_value).collect()),
        }
    }

    /// Number of commands in this suspension.
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::All(cmds) => cmds.len(),
        }
    }

    /// True for an empty batch.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Command> for Suspension {
    fn from(cmd: Command) -> Self {
        Self::One(cmd)
    }
}

impl From<Vec<Command>> for Suspension {
    fn from(cmds: Vec<Command>) -> Self {
        Self::All(cmds)
    }
}

/// What a computation is resumed with.
#[derive(Debug, Clone, PartialEq)]
pub enum Resume {
    /// Begin running. Always the first and only the first input.
    Start,
    /// Normal resumption with the performed effect's value.
    Value(Value),
    /// Exceptional resumption with the performed effect's failure.
    Throw(Failure),
}

impl Resume {
    /// View the input as a `Result`, so computations can use `?`-style
    /// matching. `Start` reads as `Ok(Value::Null)`.
    pub fn into_result(self) -> Outcome {
        match self {
            Self::Start => Ok(Value::Null),
            Self::Value(v) => Ok(v),
            Self::Throw(f) => Err(f),
        }
    }
}

impl From<Outcome> for Resume {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Ok(v) => Self::Value(v),
            Err(f) => Self::Throw(f),
        }
    }
}

/// The state a computation reaches after one resumption.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Suspended on one command or a batch of commands.
    Suspend(Suspension),
    /// Completed with a terminal value.
    Done(Value),
    /// Failed with a terminal failure.
    Failed(Failure),
}

impl Step {
    /// Suspend on a single command.
    pub fn command(cmd: Command) -> Self {
        Self::Suspend(Suspension::One(cmd))
    }

    /// Suspend on a concurrent batch.
    pub fn all(cmds: Vec<Command>) -> Self {
        Self::Suspend(Suspension::All(cmds))
    }

    /// Whether this step is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Suspend(_))
    }
}

impl From<Outcome> for Step {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Ok(v) => Self::Done(v),
            Err(f) => Self::Failed(f),
        }
    }
}

/// A single-use resumable computation.
///
/// The computation owns its control flow: given an injected value or
/// failure it decides whether to suspend again, complete, or fail. It never
/// performs effects itself. Drivers wrap it in a [`Session`] which enforces
/// the resumption protocol.
pub trait Computation: Send {
    /// Advance the computation by one resumption.
    fn resume(&mut self, input: Resume) -> Step;
}

impl<C: Computation + ?Sized> Computation for Box<C> {
    fn resume(&mut self, input: Resume) -> Step {
        (**self).resume(input)
    }
}

/// A [`Computation`] backed by a closure.
pub struct FnComputation<F> {
    f: F,
}

impl<F> Computation for FnComputation<F>
where
    F: FnMut(Resume) -> Step + Send,
{
    fn resume(&mut self, input: Resume) -> Step {
        (self.f)(input)
    }
}

/// Build a computation from a closure holding its own state.
///
/// ```
/// use stepfx::{Command, Resume, Step, from_fn};
///
/// let mut stage = 0;
/// let _c = from_fn(move |input: Resume| {
///     stage += 1;
///     match (stage, input) {
///         (1, Resume::Start) => Step::command(Command::new("now")),
///         (_, input) => input.into_result().into(),
///     }
/// });
/// ```
pub fn from_fn<F>(f: F) -> FnComputation<F>
where
    F: FnMut(Resume) -> Step + Send,
{
    FnComputation { f }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Fresh,
    Suspended,
    Finished,
}

/// Protocol guard around one computation.
///
/// Enforces exactly one `Start`, exactly one resumption per suspension and
/// no resumption once the computation has settled. Counts steps: the step
/// of the current suspension is the number of resumptions accepted so far,
/// so step numbers are never reused.
pub struct Session {
    computation: Box<dyn Computation>,
    phase: Phase,
    steps: u64,
}

impl Session {
    /// Wrap a fresh computation.
    pub fn new(computation: Box<dyn Computation>) -> Self {
        Self {
            computation,
            phase: Phase::Fresh,
            steps: 0,
        }
    }

    /// Step number of the current suspension.
    pub fn step(&self) -> u64 {
        self.steps
    }

    /// Whether the computation completed or failed.
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Forward one input to the computation, enforcing the protocol.
    pub fn resume(&mut self, input: Resume) -> Result<Step, SessionError> {
        match (self.phase, &input) {
            (Phase::Finished, _) => {
                return Err(SessionError::Finished { steps: self.steps });
            }
            (Phase::Fresh, Resume::Start) => {}
            (Phase::Fresh, _) => return Err(SessionError::NotStarted),
            (Phase::Suspended, Resume::Start) => return Err(SessionError::AlreadyStarted),
            (Phase::Suspended, _) => self.steps += 1,
        }

        let step = self.computation.resume(input);
        self.phase = if step.is_terminal() {
            Phase::Finished
        } else {
            Phase::Suspended
        };
        Ok(step)
    }
}
