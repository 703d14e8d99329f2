//! Value conversion across the Lua boundary
//!
//! Host -> Lua:
//! - arrays become 1-indexed tables
//! - maps become tables keyed by their own keys; keys that are canonical
//!   integers (`"1"`, `"-3"`) become integer keys
//! - [`NativeFunction`]s become Lua functions wrapped by [`wrap_native`]
//! - a live [`crate::Callable`] restores the original Lua function
//!
//! Lua -> host:
//! - a table whose keys are exactly the integers 1..N becomes an array
//!   (an empty table is an empty array); anything else becomes a map with
//!   stringified keys. Sparse arrays therefore collapse to maps.
//! - functions become opaque [`crate::Callable`] handles
//! - cyclic tables, userdata and threads are rejected with `Error::Marshal`

use crate::bridge::Session;
use crate::{Error, Map, NativeFunction, Result, Value};
use mlua::{Error as LuaError, Function as LuaFunction, MultiValue, Table, Value as LuaValue};
use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};

/// Convert a host value into a Lua value owned by `session`
pub(crate) fn to_lua(session: &Session, value: &Value) -> Result<LuaValue> {
    let lua = &session.lua;
    Ok(match value {
        Value::Nil => LuaValue::Nil,
        Value::Bool(b) => LuaValue::Boolean(*b),
        Value::Int(i) => LuaValue::Integer(*i),
        Value::Float(f) => LuaValue::Number(*f),
        Value::String(s) => LuaValue::String(lua.create_string(s)?),
        Value::Array(items) => {
            let table = lua.create_table_with_capacity(items.len(), 0)?;
            for (index, item) in items.iter().enumerate() {
                table.raw_set(index + 1, to_lua(session, item)?)?;
            }
            LuaValue::Table(table)
        }
        Value::Map(map) => {
            let table = lua.create_table_with_capacity(0, map.len())?;
            for (key, item) in map {
                let item = to_lua(session, item)?;
                match integer_key(key) {
                    Some(i) => table.raw_set(i, item)?,
                    None => table.raw_set(key.as_str(), item)?,
                }
            }
            LuaValue::Table(table)
        }
        Value::Function(function) => LuaValue::Function(wrap_native(session, function.clone())?),
        Value::Callable(callable) => LuaValue::Function(session.restore_callable(callable)?),
    })
}

/// Convert a Lua value into a host value
pub(crate) fn from_lua(session: &Session, value: &LuaValue) -> Result<Value> {
    let mut visiting = Vec::new();
    convert_out(session, value, &mut visiting)
}

fn convert_out(
    session: &Session,
    value: &LuaValue,
    visiting: &mut Vec<*const c_void>,
) -> Result<Value> {
    match value {
        LuaValue::Nil => Ok(Value::Nil),
        LuaValue::Boolean(b) => Ok(Value::Bool(*b)),
        LuaValue::Integer(i) => Ok(Value::Int(*i)),
        LuaValue::Number(n) => Ok(Value::Float(*n)),
        LuaValue::String(s) => Ok(Value::String(s.to_str()?.to_string())),
        LuaValue::Table(table) => {
            let ptr = table.to_pointer();
            if visiting.contains(&ptr) {
                return Err(Error::Marshal(
                    "cyclic table cannot cross the interpreter boundary".to_string(),
                ));
            }
            visiting.push(ptr);
            let result = table_to_value(session, table, visiting);
            visiting.pop();
            result
        }
        LuaValue::Function(function) => {
            Ok(Value::Callable(session.issue_callable(function.clone())?))
        }
        other => Err(Error::Marshal(format!(
            "Lua {} values cannot be represented on the host",
            other.type_name()
        ))),
    }
}

/// Decide between array and map for one table, then convert its entries
fn table_to_value(
    session: &Session,
    table: &Table,
    visiting: &mut Vec<*const c_void>,
) -> Result<Value> {
    let mut entries = Vec::new();
    for pair in table.pairs::<LuaValue, LuaValue>() {
        entries.push(pair?);
    }

    if let Some(len) = sequence_len(&entries) {
        let mut items = vec![Value::Nil; len];
        for (key, item) in &entries {
            if let LuaValue::Integer(i) = key {
                items[(*i - 1) as usize] = convert_out(session, item, visiting)?;
            }
        }
        return Ok(Value::Array(items));
    }

    let mut map = Map::new();
    for (key, item) in &entries {
        map.insert(stringify_key(key)?, convert_out(session, item, visiting)?);
    }
    Ok(Value::Map(map))
}

/// Length N if the keys are exactly the integers 1..N
///
/// Keys in a Lua table are distinct, so N integer keys all within 1..=N
/// cover every slot.
fn sequence_len(entries: &[(LuaValue, LuaValue)]) -> Option<usize> {
    let mut max = 0i64;
    for (key, _) in entries {
        match key {
            LuaValue::Integer(i) if *i >= 1 => max = max.max(*i),
            _ => return None,
        }
    }
    (usize::try_from(max).ok()? == entries.len()).then_some(entries.len())
}

fn stringify_key(key: &LuaValue) -> Result<String> {
    match key {
        LuaValue::String(s) => Ok(s.to_str()?.to_string()),
        LuaValue::Integer(i) => Ok(i.to_string()),
        LuaValue::Number(n) => Ok(Value::Float(*n).to_string()),
        LuaValue::Boolean(b) => Ok(b.to_string()),
        other => Err(Error::Marshal(format!(
            "table keys of type {} cannot be represented on the host",
            other.type_name()
        ))),
    }
}

/// Parse a map key written in canonical integer form
fn integer_key(key: &str) -> Option<i64> {
    let i = key.parse::<i64>().ok()?;
    (i.to_string() == key).then_some(i)
}

/// Wrap a host function as a Lua function
///
/// Arguments are converted positionally; a returned error or a panic inside
/// the host function becomes a Lua error.
pub(crate) fn wrap_native(session: &Session, function: NativeFunction) -> Result<LuaFunction> {
    let weak = session.weak();
    let wrapped = session.lua.create_function(move |_, args: MultiValue| {
        let session = weak.upgrade().ok_or_else(|| LuaError::external(Error::Closed))?;
        let args = args
            .iter()
            .map(|arg| from_lua(&session, arg))
            .collect::<Result<Vec<_>>>()
            .map_err(LuaError::external)?;

        let result = panic::catch_unwind(AssertUnwindSafe(|| function.call(args)))
            .map_err(|payload| {
                LuaError::external(Error::Runtime(format!(
                    "host function panicked: {}",
                    panic_message(payload.as_ref())
                )))
            })?
            .map_err(LuaError::external)?;

        to_lua(&session, &result).map_err(LuaError::external)
    })?;
    Ok(wrapped)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_key_is_canonical() {
        assert_eq!(integer_key("1"), Some(1));
        assert_eq!(integer_key("-3"), Some(-3));
        assert_eq!(integer_key("01"), None);
        assert_eq!(integer_key("+1"), None);
        assert_eq!(integer_key("x"), None);
    }

    #[test]
    fn test_sequence_len() {
        let seq = vec![
            (LuaValue::Integer(2), LuaValue::Nil),
            (LuaValue::Integer(1), LuaValue::Nil),
        ];
        assert_eq!(sequence_len(&seq), Some(2));

        let sparse = vec![
            (LuaValue::Integer(1), LuaValue::Nil),
            (LuaValue::Integer(3), LuaValue::Nil),
        ];
        assert_eq!(sequence_len(&sparse), None);

        let zero = vec![(LuaValue::Integer(0), LuaValue::Nil)];
        assert_eq!(sequence_len(&zero), None);

        assert_eq!(sequence_len(&[]), Some(0));
    }
}
