//! Standard globals installed into every UI session
//!
//! | Global | Purpose |
//! |--------|---------|
//! | `log(...)`, `print(...)` | Write a line to host diagnostics and the script log |
//! | `getComponents()` | List of component tags |
//! | `getComponentInfo(tag)` | Metadata table for one tag, or nil |
//! | `utils.deepCopy(v)` | Structural copy of a plain value |
//! | `utils.merge(...)` | Shallow merge of tables, later keys win |
//! | `utils.format(t, ...)` | Replace `{n}` with the n-th argument |
//! | `state.get/set/getAll/clear` | Plain values kept across runs |
//! | `ui.<tag>(props, children)` | UI node factories |

use crate::bridge::Session;
use crate::ui::{build_node, component, component_tags, COMPONENTS};
use crate::{Bridge, Error, Map, NativeFunction, Result, ScriptLog, Value};
use std::rc::{Rc, Weak};
use tracing::{debug, info};

/// Installs the standard globals into a bridge session
pub struct Registrar;

impl Registrar {
    /// Install once per session; returns false if already installed
    pub fn install(bridge: &Bridge) -> Result<bool> {
        let session = bridge.session()?;
        if session.installed.get() {
            return Ok(false);
        }

        install_logging(bridge)?;
        install_introspection(bridge)?;
        install_utils(bridge)?;
        install_state(bridge, &session)?;
        install_ui(bridge)?;

        session.installed.set(true);
        debug!(components = COMPONENTS.len(), "installed standard globals");
        Ok(true)
    }
}

fn install_logging(bridge: &Bridge) -> Result<()> {
    for name in ["log", "print"] {
        let log = bridge.script_log().clone();
        bridge.register_function(name, move |args: Vec<Value>| -> Result<Value> {
            write_line(&log, &args);
            Ok(Value::Nil)
        })?;
    }
    Ok(())
}

fn write_line(log: &ScriptLog, args: &[Value]) {
    let line = args
        .iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    info!(target: "script", "{}", line);
    log.push(line);
}

fn install_introspection(bridge: &Bridge) -> Result<()> {
    bridge.register_function("getComponents", |_args: Vec<Value>| -> Result<Value> {
        Ok(Value::Array(component_tags().map(Value::from).collect()))
    })?;
    bridge.register_function("getComponentInfo", |args: Vec<Value>| -> Result<Value> {
        let tag = args.first().map(Value::as_str).transpose()?;
        Ok(tag
            .and_then(component)
            .map(|info| info.to_value())
            .unwrap_or_default())
    })
}

fn install_utils(bridge: &Bridge) -> Result<()> {
    bridge.register_module(
        "utils",
        [
            ("deepCopy", NativeFunction::new(deep_copy)),
            ("merge", NativeFunction::new(merge)),
            ("format", NativeFunction::new(format)),
        ],
    )
}

fn deep_copy(args: Vec<Value>) -> Result<Value> {
    let value = args.into_iter().next().unwrap_or_default();
    let json = serde_json::to_value(&value)
        .map_err(|e| Error::Runtime(format!("utils.deepCopy: {}", e)))?;
    Ok(Value::from(json))
}

fn merge(args: Vec<Value>) -> Result<Value> {
    let mut merged = Map::new();
    for (index, arg) in args.into_iter().enumerate() {
        match arg {
            Value::Nil => {}
            Value::Map(map) => merged.extend(map),
            Value::Array(items) => {
                for (i, item) in items.into_iter().enumerate() {
                    merged.insert((i + 1).to_string(), item);
                }
            }
            other => {
                return Err(Error::Runtime(format!(
                    "utils.merge: argument {} is a {}, expected a table",
                    index + 1,
                    other.type_name()
                )))
            }
        }
    }
    Ok(Value::Map(merged))
}

fn format(args: Vec<Value>) -> Result<Value> {
    let (template, rest) = match args.split_first() {
        Some((Value::String(template), rest)) => (template, rest),
        _ => {
            return Err(Error::Runtime(
                "utils.format: first argument must be a template string".to_string(),
            ))
        }
    };
    Ok(Value::String(format_template(template, rest)))
}

/// Replace `{n}` (1-based) with the n-th argument; unmatched placeholders stay
fn format_template(template: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substituted = after.find('}').and_then(|close| {
            let index = &after[..close];
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let arg = index.parse::<usize>().ok()?.checked_sub(1).and_then(|i| args.get(i))?;
            Some((arg.to_string(), close))
        });

        match substituted {
            Some((text, close)) => {
                out.push_str(&text);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

fn install_state(bridge: &Bridge, session: &Rc<Session>) -> Result<()> {
    let get = state_fn(session, |state, args| {
        let key = state_key("state.get", &args)?;
        Ok(state.get(key).cloned().unwrap_or_default())
    });
    let set = state_fn(session, |state, mut args| {
        let key = state_key("state.set", &args)?.to_string();
        let value = if args.len() > 1 { args.swap_remove(1) } else { Value::Nil };
        if holds_function(&value) {
            return Err(Error::Marshal(format!(
                "state.set: value for '{}' holds a function; state keeps plain data only",
                key
            )));
        }
        if value.is_nil() {
            state.remove(&key);
        } else {
            state.insert(key, value);
        }
        Ok(Value::Nil)
    });
    let get_all = state_fn(session, |state, _args| Ok(Value::Map(state.clone())));
    let clear = state_fn(session, |state, _args| {
        state.clear();
        Ok(Value::Nil)
    });

    bridge.register_module(
        "state",
        [("get", get), ("set", set), ("getAll", get_all), ("clear", clear)],
    )
}

/// Host function with mutable access to the session's state namespace
fn state_fn<F>(session: &Rc<Session>, body: F) -> NativeFunction
where
    F: Fn(&mut Map, Vec<Value>) -> Result<Value> + 'static,
{
    let weak: Weak<Session> = Rc::downgrade(session);
    NativeFunction::new(move |args: Vec<Value>| -> Result<Value> {
        let session = weak.upgrade().ok_or(Error::Closed)?;
        let mut state = session.state.borrow_mut();
        body(&mut state, args)
    })
}

fn holds_function(value: &Value) -> bool {
    match value {
        Value::Function(_) | Value::Callable(_) => true,
        Value::Array(items) => items.iter().any(holds_function),
        Value::Map(map) => map.values().any(holds_function),
        _ => false,
    }
}

fn state_key<'a>(name: &str, args: &'a [Value]) -> Result<&'a str> {
    match args.first() {
        Some(Value::String(key)) => Ok(key.as_str()),
        _ => Err(Error::Runtime(format!("{}: key must be a string", name))),
    }
}

fn install_ui(bridge: &Bridge) -> Result<()> {
    bridge.register_module(
        "ui",
        COMPONENTS.iter().map(|info| {
            let tag = info.tag;
            (tag, NativeFunction::new(move |args: Vec<Value>| build_node(tag, args)))
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installed() -> Bridge {
        let bridge = Bridge::new().unwrap();
        assert!(Registrar::install(&bridge).unwrap());
        bridge
    }

    #[test]
    fn test_install_is_idempotent() {
        let bridge = installed();
        assert!(!Registrar::install(&bridge).unwrap());
        bridge.execute("log('once')").unwrap();
        assert_eq!(bridge.script_log().lines(), vec!["once"]);
    }

    #[test]
    fn test_log_joins_arguments() {
        let bridge = installed();
        bridge.execute("print('a', 1, 2.5, true, nil)").unwrap();
        assert_eq!(bridge.script_log().lines(), vec!["a 1 2.5 true nil"]);
    }

    #[test]
    fn test_format_template() {
        let args = [Value::from("x"), Value::Int(2)];
        assert_eq!(format_template("{1}-{2}", &args), "x-2");
        assert_eq!(format_template("{3} {0} {a}", &args), "{3} {0} {a}");
        assert_eq!(format_template("{a{1}}", &args), "{ax}");
        assert_eq!(format_template("open {", &args), "open {");
    }

    #[test]
    fn test_utils_from_lua() {
        let bridge = installed();
        assert_eq!(
            bridge.execute("return utils.format('{1} has {2}', 'box', 3)").unwrap(),
            Value::from("box has 3")
        );
        assert_eq!(
            bridge
                .execute("local m = utils.merge({ a = 1, b = 1 }, nil, { b = 2 }) return m.a + m.b")
                .unwrap(),
            Value::Int(3)
        );
        assert_eq!(
            bridge
                .execute("local t = { x = { 1, 2 } } local c = utils.deepCopy(t) c.x[1] = 9 return t.x[1]")
                .unwrap(),
            Value::Int(1)
        );
    }

    #[test]
    fn test_state_survives_runs() {
        let bridge = installed();
        bridge.execute("state.set('count', (state.get('count') or 0) + 1)").unwrap();
        bridge.execute("state.set('count', (state.get('count') or 0) + 1)").unwrap();
        assert_eq!(bridge.state_snapshot().unwrap().get("count"), Some(&Value::Int(2)));

        bridge.execute("state.set('count', nil)").unwrap();
        assert!(bridge.state_snapshot().unwrap().is_empty());

        bridge.execute("state.set('a', 1) state.clear()").unwrap();
        assert_eq!(bridge.execute("return next(state.getAll())").unwrap(), Value::Nil);
    }

    #[test]
    fn test_state_rejects_functions() {
        let bridge = installed();
        let err = bridge
            .execute("state.set('greet', function() return 'hi' end)")
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Marshal);
        assert!(err.message().contains("greet"));

        let err = bridge
            .execute("state.set('nested', { handlers = { print } })")
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Marshal);
        assert!(bridge.state_snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_component_introspection() {
        let bridge = installed();
        assert_eq!(
            bridge.execute("return #getComponents()").unwrap(),
            Value::Int(COMPONENTS.len() as i64)
        );
        assert_eq!(COMPONENTS.len(), 28);
        assert_eq!(
            bridge.execute("return getComponentInfo('slider').group").unwrap(),
            Value::from("input")
        );
        assert_eq!(bridge.execute("return getComponentInfo('nope')").unwrap(), Value::Nil);
    }
}
