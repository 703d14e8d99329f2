//! Host-side values exchanged with the Lua interpreter

use crate::bridge::SlotLease;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

/// String-keyed mapping of host values
pub type Map = BTreeMap<String, Value>;

/// A host callable that scripts can invoke
pub trait HostFunction {
    fn call(&self, args: Vec<Value>) -> Result<Value>;
}

impl<F> HostFunction for F
where
    F: Fn(Vec<Value>) -> Result<Value>,
{
    fn call(&self, args: Vec<Value>) -> Result<Value> {
        self(args)
    }
}

/// Boxed host function, cheap to clone
#[derive(Clone)]
pub struct NativeFunction(Rc<dyn HostFunction>);

impl NativeFunction {
    pub fn new(function: impl HostFunction + 'static) -> Self {
        Self(Rc::new(function))
    }

    pub fn call(&self, args: Vec<Value>) -> Result<Value> {
        self.0.call(args)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NativeFunction")
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Marker owned by one interpreter session; dropped when the session closes
#[derive(Debug)]
pub(crate) struct SessionToken;

/// Opaque handle to an interpreter function returned to the host
///
/// The function itself stays inside the interpreter. The handle can be
/// passed back into the same session or invoked through
/// [`crate::Bridge::invoke`] while the session is alive.
///
/// Clones share one pin on the function; dropping the last clone lets the
/// interpreter collect it.
#[derive(Clone)]
pub struct Callable {
    session: Weak<SessionToken>,
    lease: Rc<SlotLease>,
}

impl Callable {
    pub(crate) fn new(session: &Rc<SessionToken>, lease: SlotLease) -> Self {
        Self {
            session: Rc::downgrade(session),
            lease: Rc::new(lease),
        }
    }

    pub fn slot(&self) -> u64 {
        self.lease.slot()
    }

    /// Check if the issuing session is still open
    pub fn is_live(&self) -> bool {
        self.session.strong_count() > 0
    }

    pub(crate) fn belongs_to(&self, session: &Rc<SessionToken>) -> bool {
        std::ptr::eq(self.session.as_ptr(), Rc::as_ptr(session))
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("slot", &self.slot())
            .field("live", &self.is_live())
            .finish()
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.slot() == other.slot() && Weak::ptr_eq(&self.session, &other.session)
    }
}

/// A value on the host side of the bridge
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value (Lua `nil`)
    #[default]
    Nil,
    Bool(bool),
    /// Lua integer subtype
    Int(i64),
    /// Lua float subtype
    Float(f64),
    String(String),
    /// Table with keys exactly 1..N
    Array(Vec<Value>),
    /// Any other table, keys stringified
    Map(Map),
    /// Host function passed into the interpreter
    Function(NativeFunction),
    /// Interpreter function returned to the host
    Callable(Callable),
}

impl Value {
    /// Wrap a host closure as a value
    pub fn function(function: impl HostFunction + 'static) -> Self {
        Value::Function(NativeFunction::new(function))
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Function(_) | Value::Callable(_) => "function",
        }
    }

    fn type_error(&self, expected: &str) -> Error {
        Error::TypeError {
            expected: expected.to_string(),
            actual: self.type_name().to_string(),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(self.type_error("boolean")),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
            _ => Err(self.type_error("integer")),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            _ => Err(self.type_error("number")),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::String(s) => Ok(s.as_str()),
            _ => Err(self.type_error("string")),
        }
    }

    pub fn as_array(&self) -> Result<&[Value]> {
        match self {
            Value::Array(arr) => Ok(arr.as_slice()),
            _ => Err(self.type_error("array")),
        }
    }

    pub fn as_map(&self) -> Result<&Map> {
        match self {
            Value::Map(map) => Ok(map),
            _ => Err(self.type_error("map")),
        }
    }

    pub fn as_callable(&self) -> Result<&Callable> {
        match self {
            Value::Callable(c) => Ok(c),
            _ => Err(self.type_error("function")),
        }
    }

    /// Look up a key in a map value
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Lua truthiness: everything except `nil` and `false`
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Check if this is an empty table (which Lua cannot tag as array or map)
    pub fn is_empty_table(&self) -> bool {
        match self {
            Value::Array(arr) => arr.is_empty(),
            Value::Map(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Convert to JSON, rendering functions as `"<function>"`
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Nil => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Array(arr) => Json::Array(arr.iter().map(Value::to_json).collect()),
            Value::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Function(_) | Value::Callable(_) => Json::String("<function>".to_string()),
        }
    }
}

/// Format a float the way Lua's `tostring` does
fn format_float(f: f64, out: &mut fmt::Formatter<'_>) -> fmt::Result {
    if f.is_nan() {
        out.write_str(if f.is_sign_negative() { "-nan" } else { "nan" })
    } else if f.is_infinite() {
        out.write_str(if f > 0.0 { "inf" } else { "-inf" })
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        write!(out, "{:.1}", f)
    } else {
        write!(out, "{}", f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(n) => format_float(*n, f),
            Value::String(s) => f.write_str(s),
            Value::Array(_) | Value::Map(_) => f.write_str("table"),
            Value::Function(_) | Value::Callable(_) => f.write_str("function"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Nil => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(arr) => arr.serialize(serializer),
            Value::Map(map) => map.serialize(serializer),
            Value::Function(_) | Value::Callable(_) => Err(serde::ser::Error::custom(
                "function values cannot be serialized",
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

// Conversion from common types

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Nil,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::String(s),
            Json::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            Json::Object(obj) => {
                Value::Map(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl From<NativeFunction> for Value {
    fn from(f: NativeFunction) -> Self {
        Value::Function(f)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Nil)
    }
}
