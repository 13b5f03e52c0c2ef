//! Commands: plain descriptors of effects a computation wants performed.

use crate::error::{CommandError, Failure};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A descriptor of one effect. NOT executed by the computation that
/// produces it. The interpreter routes it to the handler registered for
/// its `type`.
///
/// On the wire a command is a flat object: `{ "type": "httpGet", "url": "/people" }`.
/// `type` is the only reserved field; everything else is payload the core
/// never inspects.
///
/// Equality is structural. Payload key order is irrelevant.
///
/// Typed vocabularies are ordinary serde enums tagged on `type`:
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use stepfx::Command;
///
/// #[derive(Serialize, Deserialize, PartialEq, Debug)]
/// #[serde(tag = "type", rename_all = "camelCase")]
/// enum Http {
///     HttpGet { url: String },
/// }
///
/// let cmd = Command::encode(&Http::HttpGet { url: "/people".into() }).unwrap();
/// assert_eq!(cmd.kind(), "httpGet");
/// assert_eq!(cmd.decode::<Http>().unwrap(), Http::HttpGet { url: "/people".into() });
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    payload: Map<String, Value>,
}

impl Command {
    /// Create a command with the given type and an empty payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Map::new(),
        }
    }

    /// Add a payload field. A field named `type` is ignored.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != "type" {
            self.payload.insert(key, value.into());
        }
        self
    }

    /// Convert a typed command (any `Serialize` producing an object with a
    /// string `type` field) into a [`Command`].
    pub fn encode<T: Serialize + ?Sized>(typed: &T) -> Result<Self, CommandError> {
        let value = serde_json::to_value(typed)
            .map_err(|e| CommandError::Serialization(e.to_string()))?;
        Self::try_from(value)
    }

    /// Read the command back into a typed vocabulary. Handlers use this to
    /// recover their own command shape; a mismatch is a handler failure.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, Failure> {
        serde_json::from_value(self.to_value()).map_err(|e| {
            Failure::handler(format!("malformed `{}` command: {e}", self.kind))
        })
    }

    /// The handler-selecting type tag.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Borrow one payload field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Borrow the whole payload (without `type`).
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// The flat JSON form, `type` included.
    pub fn to_value(&self) -> Value {
        let mut map = self.payload.clone();
        map.insert("type".into(), Value::String(self.kind.clone()));
        Value::Object(map)
    }
}

impl TryFrom<Value> for Command {
    type Error = CommandError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let Value::Object(mut map) = value else {
            return Err(CommandError::NotAnObject(value));
        };
        match map.remove("type") {
            Some(Value::String(kind)) => Ok(Self { kind, payload: map }),
            Some(other) => Err(CommandError::InvalidType(other)),
            None => Err(CommandError::MissingType),
        }
    }
}

impl From<Command> for Value {
    fn from(cmd: Command) -> Self {
        let Command { kind, mut payload } = cmd;
        payload.insert("type".into(), Value::String(kind));
        Value::Object(payload)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}
