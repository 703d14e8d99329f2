//! Bridge, registration and UI protocol behavior
//!
//! Exercises the public API end to end against a real Lua state.

use scripting::{Bridge, Error, ErrorKind, Map, Registrar, UiNode, UiRuntime, Value};

fn map(pairs: &[(&str, Value)]) -> Value {
    Value::Map(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<Map>(),
    )
}

/// Pass a value into Lua and read it straight back
fn round_trip(bridge: &Bridge, value: Value) -> Value {
    bridge.set_global("echo", value).unwrap();
    bridge.execute("return echo").unwrap()
}

#[test]
fn test_scalar_round_trip() {
    let bridge = Bridge::new().unwrap();
    for value in [
        Value::Nil,
        Value::Bool(true),
        Value::Bool(false),
        Value::Int(-42),
        Value::Float(2.5),
        Value::from("héllo"),
    ] {
        assert_eq!(round_trip(&bridge, value.clone()), value);
    }
}

#[test]
fn test_sequential_table_is_array() {
    let bridge = Bridge::new().unwrap();
    let input = map(&[
        ("1", Value::from("a")),
        ("2", Value::from("b")),
        ("3", Value::from("c")),
    ]);
    assert_eq!(
        round_trip(&bridge, input),
        Value::Array(vec![Value::from("a"), Value::from("b"), Value::from("c")])
    );
}

#[test]
fn test_mixed_table_is_map() {
    let bridge = Bridge::new().unwrap();
    let input = map(&[("1", Value::from("a")), ("x", Value::from("b"))]);
    assert_eq!(round_trip(&bridge, input.clone()), input);

    // Holes collapse to a map with the surviving keys
    let sparse = bridge.execute("return { 'a', nil, 'c' }").unwrap();
    assert_eq!(sparse, map(&[("1", Value::from("a")), ("3", Value::from("c"))]));
}

#[test]
fn test_empty_table_is_empty_array() {
    let bridge = Bridge::new().unwrap();
    assert_eq!(bridge.execute("return {}").unwrap(), Value::Array(vec![]));
}

#[test]
fn test_install_twice() {
    let bridge = Bridge::new().unwrap();
    assert!(Registrar::install(&bridge).unwrap());
    assert!(!Registrar::install(&bridge).unwrap());

    bridge.execute("log('ready')").unwrap();
    assert_eq!(bridge.script_log().lines(), vec!["ready".to_string()]);
}

#[test]
fn test_arithmetic() {
    let bridge = Bridge::new().unwrap();
    assert_eq!(bridge.execute("return 1 + 1").unwrap(), Value::Int(2));
}

#[test]
fn test_malformed_source() {
    let bridge = Bridge::new().unwrap();
    let err = bridge.execute("retur 1").unwrap_err();
    assert!(matches!(err, Error::Syntax(ref msg) if !msg.is_empty()));
    assert_eq!(bridge.execute("return 'alive'").unwrap(), Value::from("alive"));
}

#[test]
fn test_run_ui_panel_with_button() {
    let runtime = UiRuntime::new().unwrap();
    let tree = runtime
        .run_ui("return ui.panel({ title = 'X' }, { ui.button({ label = 'Save' }) })")
        .unwrap()
        .unwrap();

    let expected = UiNode::new("panel")
        .with_prop("title", "X")
        .with_child(UiNode::new("button").with_prop("label", "Save"));
    assert_eq!(tree, expected);
    assert_eq!(
        tree.to_json(),
        serde_json::json!({
            "type": "panel",
            "props": { "title": "X" },
            "children": [{ "type": "button", "props": { "label": "Save" } }]
        })
    );
}

#[test]
fn test_reentrant_execute_rejected() {
    let bridge = Bridge::new().unwrap();
    let weak = bridge.downgrade();
    bridge
        .register_function("nested", move |_args: Vec<Value>| -> scripting::Result<Value> {
            let bridge = weak.upgrade().ok_or(Error::Closed)?;
            bridge.execute("return 1")
        })
        .unwrap();

    let err = bridge.execute("return nested()").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Runtime);
    assert!(err.message().contains("re-entrant"));

    // Guard released after the failure
    assert_eq!(bridge.execute("return 3").unwrap(), Value::Int(3));
}

#[test]
fn test_callable_after_close() {
    let bridge = Bridge::new().unwrap();
    let value = bridge.execute("return function(x) return x * 2 end").unwrap();
    let callable = value.as_callable().unwrap().clone();

    assert_eq!(bridge.invoke(&callable, vec![Value::Int(21)]).unwrap(), Value::Int(42));

    bridge.close().unwrap();
    assert!(!callable.is_live());
    assert!(matches!(bridge.invoke(&callable, vec![Value::Int(1)]), Err(Error::Closed)));
}

#[test]
fn test_callable_passed_back_into_lua() {
    let bridge = Bridge::new().unwrap();
    let double = bridge.execute("return function(x) return x * 2 end").unwrap();
    bridge.set_global("double", double).unwrap();
    assert_eq!(bridge.execute("return double(5)").unwrap(), Value::Int(10));
}

#[test]
fn test_native_function_after_close_fails_cleanly() {
    let bridge = Bridge::new().unwrap();
    bridge
        .register_function("answer", |_args: Vec<Value>| -> scripting::Result<Value> { Ok(Value::Int(42)) })
        .unwrap();
    let getter = bridge.execute("return answer").unwrap();
    bridge.close().unwrap();

    let callable = getter.as_callable().unwrap();
    assert!(!callable.is_live());
    assert!(matches!(bridge.execute("return answer()"), Err(Error::Closed)));
}

#[test]
fn test_cyclic_table_rejected() {
    let bridge = Bridge::new().unwrap();
    let err = bridge.execute("local t = {} t.self = t return t").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Marshal);

    // Shared but acyclic references are fine
    let shared = bridge
        .execute("local leaf = { 1 } return { a = leaf, b = leaf }")
        .unwrap();
    assert_eq!(shared.get("a"), shared.get("b"));
}

#[test]
fn test_native_error_and_panic_become_script_errors() {
    let bridge = Bridge::new().unwrap();
    bridge
        .register_function("fail", |_args: Vec<Value>| -> scripting::Result<Value> {
            Err(Error::Runtime("disk on fire".to_string()))
        })
        .unwrap();
    bridge
        .register_function("explode", |_args: Vec<Value>| -> scripting::Result<Value> {
            panic!("kaboom")
        })
        .unwrap();

    let err = bridge.execute("fail()").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Runtime);
    assert!(err.message().contains("disk on fire"));

    // Scripts can catch host failures
    assert_eq!(
        bridge.execute("return pcall(fail)").unwrap(),
        Value::Bool(false)
    );

    let err = bridge.execute("explode()").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Runtime);
    assert!(err.message().contains("kaboom"));
}

#[test]
fn test_host_function_receives_marshaled_arguments() {
    let bridge = Bridge::new().unwrap();
    bridge
        .register_function("count", |args: Vec<Value>| -> scripting::Result<Value> {
            let items = args[0].as_array()?;
            Ok(Value::Int(items.len() as i64))
        })
        .unwrap();
    assert_eq!(bridge.execute("return count({ 'a', 'b', 'c' })").unwrap(), Value::Int(3));
}

#[test]
fn test_reentrant_execute_from_callback_rejected() {
    let runtime = UiRuntime::new().unwrap();
    let weak = runtime.bridge().downgrade();
    runtime
        .bridge()
        .register_function("nested", move |_args: Vec<Value>| -> scripting::Result<Value> {
            let bridge = weak.upgrade().ok_or(Error::Closed)?;
            bridge.execute("return 99")
        })
        .unwrap();

    let tree = runtime
        .run_ui("return ui.button({ label = 'Go', onClick = function() return nested() end })")
        .unwrap()
        .unwrap();
    let callback = tree.prop("onClick").unwrap().as_callable().unwrap().clone();

    let diagnostic = runtime.dispatch(&callback, vec![]).unwrap_err();
    assert_eq!(diagnostic.kind, ErrorKind::Runtime);
    assert!(diagnostic.message.contains("re-entrant"));

    let bridge = runtime.bridge();
    bridge.execute("function poke() return nested() end").unwrap();
    let err = bridge.call_global("poke", vec![]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Runtime);
    assert!(err.message().contains("re-entrant"));

    // Guard released after both failures
    assert_eq!(bridge.execute("return 3").unwrap(), Value::Int(3));
}

#[test]
fn test_unsupported_value_rejected() {
    let bridge = Bridge::new().unwrap();
    let err = bridge
        .execute("return coroutine.create(function() end)")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Marshal);
    assert!(err.message().contains("thread"));
}

#[test]
fn test_boolean_and_float_keys_are_stringified() {
    let bridge = Bridge::new().unwrap();
    assert_eq!(
        bridge.execute("return { [true] = 1, [1.5] = 2 }").unwrap(),
        map(&[("true", Value::Int(1)), ("1.5", Value::Int(2))])
    );
}

#[test]
fn test_argument_functions_are_not_pinned() {
    let bridge = Bridge::new().unwrap();
    Registrar::install(&bridge).unwrap();
    bridge
        .execute("for i = 1, 1000 do utils.merge({ f = function() end }) end")
        .unwrap();
    bridge
        .execute("return ui.panel({ ui.button({ onClick = function() end }) })")
        .unwrap();
    assert_eq!(bridge.pinned_callables(), 0);

    let kept = bridge.execute("return function() return 7 end").unwrap();
    assert_eq!(bridge.pinned_callables(), 1);
    let callable = kept.as_callable().unwrap().clone();
    drop(kept);
    assert_eq!(bridge.invoke(&callable, vec![]).unwrap(), Value::Int(7));

    drop(callable);
    assert_eq!(bridge.pinned_callables(), 0);
}

#[test]
fn test_state_keeps_plain_values_across_runs() {
    let runtime = UiRuntime::new().unwrap();
    runtime.run_ui("state.set('greeting', 'hi')").unwrap();

    let diagnostic = runtime
        .run_ui("state.set('greet', function() return 'hi' end)")
        .unwrap_err();
    assert_eq!(diagnostic.kind, ErrorKind::Marshal);

    let tree = runtime
        .run_ui("return ui.text(state.get('greeting'))")
        .unwrap()
        .unwrap();
    assert_eq!(tree.prop("value"), Some(&Value::from("hi")));
}
