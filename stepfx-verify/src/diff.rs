//! Structural comparison of JSON values.

use serde_json::{Number, Value};
use std::collections::BTreeSet;
use std::fmt;

/// The first point where two values differ.
#[derive(Debug, Clone, PartialEq)]
pub struct Mismatch {
    /// JSONPath-like location, `$` being the root.
    pub path: String,
    /// Expected value there, `None` if absent.
    pub expected: Option<Value>,
    /// Actual value there, `None` if absent.
    pub actual: Option<Value>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn show(v: &Option<Value>) -> String {
            v.as_ref()
                .map_or_else(|| "<absent>".to_owned(), Value::to_string)
        }
        write!(
            f,
            "at `{}`: expected {}, got {}",
            self.path,
            show(&self.expected),
            show(&self.actual)
        )
    }
}

/// Compare `actual` against `expected`, returning the first difference.
///
/// Objects compare by key set and per-key value, key order ignored.
/// Arrays compare element-wise and by length. Numbers compare by value,
/// so `1` equals `1.0`. Everything else compares by equality.
pub fn diff(expected: &Value, actual: &Value) -> Option<Mismatch> {
    walk(expected, actual, "$".to_owned())
}

/// True when [`diff`] finds nothing.
pub fn structurally_equal(expected: &Value, actual: &Value) -> bool {
    diff(expected, actual).is_none()
}

fn walk(expected: &Value, actual: &Value, path: String) -> Option<Mismatch> {
    match (expected, actual) {
        (Value::Object(e), Value::Object(a)) => {
            let keys: BTreeSet<&String> = e.keys().chain(a.keys()).collect();
            for key in keys {
                let child = format!("{path}.{key}");
                match (e.get(key), a.get(key)) {
                    (Some(x), Some(y)) => {
                        if let Some(m) = walk(x, y, child) {
                            return Some(m);
                        }
                    }
                    (x, y) => {
                        return Some(Mismatch {
                            path: child,
                            expected: x.cloned(),
                            actual: y.cloned(),
                        });
                    }
                }
            }
            None
        }
        (Value::Array(e), Value::Array(a)) => {
            for (i, (x, y)) in e.iter().zip(a).enumerate() {
                if let Some(m) = walk(x, y, format!("{path}[{i}]")) {
                    return Some(m);
                }
            }
            if e.len() == a.len() {
                return None;
            }
            let i = e.len().min(a.len());
            Some(Mismatch {
                path: format!("{path}[{i}]"),
                expected: e.get(i).cloned(),
                actual: a.get(i).cloned(),
            })
        }
        (Value::Number(e), Value::Number(a)) if same_number(e, a) => None,
        (e, a) if e == a => None,
        (e, a) => Some(Mismatch {
            path,
            expected: Some(e.clone()),
            actual: Some(a.clone()),
        }),
    }
}

/// Integers compare exactly; only a float on either side falls back to
/// `f64`. Integers above 2^53 do not survive the round trip through `f64`.
fn same_number(e: &Number, a: &Number) -> bool {
    if let (Some(x), Some(y)) = (e.as_u64(), a.as_u64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (e.as_i64(), a.as_i64()) {
        return x == y;
    }
    if e.is_f64() || a.is_f64() {
        return e.as_f64() == a.as_f64();
    }
    false
}
