//! # Dynamic Value Model
//!
//! [`Value`] is the closed set of dynamic values the engine validates:
//! null, booleans, numbers, strings, and reference-counted arrays and
//! objects. Containers use `Rc<RefCell<…>>` so that self-referential
//! (cyclic) values are constructible and carry a stable identity,
//! which the per-call cycle memo keys on.
//!
//! Values are deliberately single-threaded (`Rc`); schemas are `Arc`
//! shared, so independent threads validate their own values against
//! shared schemas without interference.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use thiserror::Error;

/// Maximum nesting depth rendered by [`Value::show`]. Deeper arrays
/// and objects collapse to `[Array]` / `{Object}`, which also bounds
/// rendering of cyclic values.
const SHOW_DEPTH: usize = 3;

/// Shared, internally-mutable array storage.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Shared, internally-mutable object storage. `BTreeMap` keeps key
/// iteration deterministic, which keeps error paths deterministic.
pub type ObjectRef = Rc<RefCell<BTreeMap<String, Value>>>;

/// A dynamic value to be validated against a [`Schema`](crate::Schema).
///
/// Cloning is shallow: clones of an array or object alias the same
/// storage. That aliasing is what makes a value self-referential:
///
/// ```
/// use shapecast_core::Value;
///
/// let v = Value::array([Value::from(1), Value::Null]);
/// v.as_array().unwrap().borrow_mut()[1] = v.clone();
/// // v now satisfies v[1] == v
/// ```
#[derive(Clone)]
pub enum Value {
    /// The null value.
    Null,
    /// A boolean.
    Bool(bool),
    /// A double-precision number.
    Number(f64),
    /// A UTF-8 string.
    String(String),
    /// An ordered sequence with identity.
    Array(ArrayRef),
    /// A keyed mapping with identity.
    Object(ObjectRef),
}

impl Value {
    /// Build an array value from its items.
    pub fn array(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    /// Build an object value from key/value entries.
    pub fn object<K, I>(entries: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(Rc::new(RefCell::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    /// The kind name of this value: `null`, `boolean`, `number`,
    /// `string`, `array` or `object`. This is the `<description>` that
    /// appears in `Expected …, but was <description>` messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// A stable identity for container values, `None` for primitives.
    /// Two values share an identity exactly when they alias the same
    /// storage.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Array(cell) => Some(Rc::as_ptr(cell) as usize),
            Value::Object(cell) => Some(Rc::as_ptr(cell) as usize),
            _ => None,
        }
    }

    /// The array storage, if this is an array.
    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(cell) => Some(cell),
            _ => None,
        }
    }

    /// The object storage, if this is an object.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(cell) => Some(cell),
            _ => None,
        }
    }

    /// Render this value for diagnostics, to a depth of three levels.
    /// Strings are quoted and escaped; deeper containers collapse to
    /// `[Array]` / `{Object}`, so cyclic values render finitely.
    pub fn show(&self) -> String {
        self.show_depth(SHOW_DEPTH)
    }

    fn show_depth(&self, remaining: usize) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => format!("{s:?}"),
            Value::Array(cell) => {
                if remaining == 0 {
                    return "[Array]".to_string();
                }
                let items: Vec<String> = cell
                    .borrow()
                    .iter()
                    .map(|v| v.show_depth(remaining - 1))
                    .collect();
                format!("[{}]", items.join(", "))
            }
            Value::Object(cell) => {
                if remaining == 0 {
                    return "{Object}".to_string();
                }
                let entries: Vec<String> = cell
                    .borrow()
                    .iter()
                    .map(|(k, v)| {
                        let key = if k.chars().any(char::is_whitespace) {
                            format!("{k:?}")
                        } else {
                            k.clone()
                        };
                        format!("{key}: {}", v.show_depth(remaining - 1))
                    })
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
        }
    }

    /// Export to a `serde_json::Value`. Fails on cyclic values, since
    /// JSON cannot represent sharing.
    pub fn to_json(&self) -> Result<serde_json::Value, CyclicValueError> {
        let mut in_progress = HashSet::new();
        self.to_json_inner(&mut in_progress)
    }

    fn to_json_inner(
        &self,
        in_progress: &mut HashSet<usize>,
    ) -> Result<serde_json::Value, CyclicValueError> {
        if let Some(id) = self.identity() {
            if !in_progress.insert(id) {
                return Err(CyclicValueError);
            }
        }
        let out = match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => json_number(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(cell) => {
                let items: Result<Vec<_>, _> = cell
                    .borrow()
                    .iter()
                    .map(|v| v.to_json_inner(in_progress))
                    .collect();
                serde_json::Value::Array(items?)
            }
            Value::Object(cell) => {
                let mut map = serde_json::Map::new();
                for (k, v) in cell.borrow().iter() {
                    map.insert(k.clone(), v.to_json_inner(in_progress)?);
                }
                serde_json::Value::Object(map)
            }
        };
        if let Some(id) = self.identity() {
            in_progress.remove(&id);
        }
        Ok(out)
    }
}

/// JSON integers import as whole `f64`s, so whole numbers must export
/// back as integers for the bridge to round-trip losslessly. NaN and
/// the infinities have no JSON form and yield `None`.
fn json_number(n: f64) -> Option<serde_json::Number> {
    // A saturating cast that converts back unchanged is exact.
    if (n as i64) as f64 == n {
        return Some(serde_json::Number::from(n as i64));
    }
    if (n as u64) as f64 == n {
        return Some(serde_json::Number::from(n as u64));
    }
    serde_json::Number::from_f64(n)
}

/// A value graph contained a cycle where an acyclic structure was
/// required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot export a cyclic value to JSON")]
pub struct CyclicValueError;

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::array(items.into_iter().map(Value::from)),
            serde_json::Value::Object(map) => {
                Value::object(map.into_iter().map(|(k, v)| (k, Value::from(v))))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Value {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Value {
        Value::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::String(s)
    }
}

impl PartialEq for Value {
    /// Deep structural equality that terminates on cyclic values:
    /// aliased storage compares equal immediately, and a pair of
    /// containers reached again inside its own comparison is assumed
    /// equal, so two distinct but isomorphic cycles are equal.
    fn eq(&self, other: &Value) -> bool {
        let mut assumed = HashSet::new();
        deep_eq(self, other, &mut assumed)
    }
}

fn deep_eq(a: &Value, b: &Value, assumed: &mut HashSet<(usize, usize)>) -> bool {
    if let (Some(x), Some(y)) = (a.identity(), b.identity()) {
        if x == y || !assumed.insert((x, y)) {
            return true;
        }
    }
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            let x = x.borrow();
            let y = y.borrow();
            x.len() == y.len() && x.iter().zip(y.iter()).all(|(a, b)| deep_eq(a, b, assumed))
        }
        (Value::Object(x), Value::Object(y)) => {
            let x = x.borrow();
            let y = y.borrow();
            x.len() == y.len()
                && x.iter()
                    .zip(y.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && deep_eq(va, vb, assumed))
        }
        _ => false,
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Depth-limited so cyclic values do not recurse forever.
        write!(f, "{}", self.show())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.show())
    }
}

// ── Literal Values ───────────────────────────────────────────────────

/// The fixed values a literal schema can hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    /// The literal `null`.
    Null,
    /// A boolean literal.
    Bool(bool),
    /// A numeric literal.
    Number(f64),
    /// A string literal.
    String(String),
}

impl LiteralValue {
    /// Whether a value equals this literal.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (LiteralValue::Null, Value::Null) => true,
            (LiteralValue::Bool(a), Value::Bool(b)) => a == b,
            (LiteralValue::Number(a), Value::Number(b)) => a == b,
            (LiteralValue::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }

    /// Render for schema display: strings quoted, everything else
    /// bare (`"foo"`, `42`, `true`, `null`).
    pub fn show(&self) -> String {
        match self {
            LiteralValue::Null => "null".to_string(),
            LiteralValue::Bool(b) => b.to_string(),
            LiteralValue::Number(n) => n.to_string(),
            LiteralValue::String(s) => format!("{s:?}"),
        }
    }
}

impl From<bool> for LiteralValue {
    fn from(b: bool) -> LiteralValue {
        LiteralValue::Bool(b)
    }
}

impl From<f64> for LiteralValue {
    fn from(n: f64) -> LiteralValue {
        LiteralValue::Number(n)
    }
}

impl From<i32> for LiteralValue {
    fn from(n: i32) -> LiteralValue {
        LiteralValue::Number(n.into())
    }
}

impl From<i64> for LiteralValue {
    fn from(n: i64) -> LiteralValue {
        LiteralValue::Number(n as f64)
    }
}

impl From<&str> for LiteralValue {
    fn from(s: &str) -> LiteralValue {
        LiteralValue::String(s.to_string())
    }
}

impl From<String> for LiteralValue {
    fn from(s: String) -> LiteralValue {
        LiteralValue::String(s)
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.show())
    }
}
