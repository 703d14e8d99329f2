//! Lua interpreter session and the host-facing bridge API
//!
//! A [`Bridge`] owns one Lua state for the lifetime of the session. The state
//! is reused across `execute` calls so globals and the `state` namespace
//! survive re-runs. Everything runs on the calling thread; there is no step
//! budget, so a script that never terminates blocks the caller.

use crate::marshal::{from_lua, to_lua, wrap_native};
use crate::value::SessionToken;
use crate::{
    Callable, Error, HostFunction, Map, NativeFunction, Result, ScriptLog, ScriptingConfig, Value,
};
use mlua::{Function as LuaFunction, Lua, LuaOptions, MultiValue, RegistryKey, StdLib, Value as LuaValue};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use tracing::debug;

/// One open interpreter state and everything scoped to it
pub(crate) struct Session {
    /// Lua functions handed to the host, keyed by slot
    callables: RefCell<HashMap<u64, RegistryKey>>,
    next_slot: Cell<u64>,
    pub(crate) lua: Lua,
    token: Rc<SessionToken>,
    this: Weak<Session>,
    /// Backing store of the script `state` namespace
    pub(crate) state: RefCell<Map>,
    /// Set once the standard globals are installed
    pub(crate) installed: Cell<bool>,
}

impl Session {
    fn open(config: &ScriptingConfig) -> Result<Rc<Session>> {
        let lua = if config.sandbox {
            let lua = Lua::new_with(
                StdLib::TABLE | StdLib::STRING | StdLib::UTF8 | StdLib::MATH | StdLib::COROUTINE,
                LuaOptions::default(),
            )?;
            // Base library file access
            lua.globals().raw_set("dofile", LuaValue::Nil)?;
            lua.globals().raw_set("loadfile", LuaValue::Nil)?;
            lua
        } else {
            Lua::new()
        };

        if let Some(limit) = config.memory_limit {
            lua.set_memory_limit(limit)?;
        }

        Ok(Rc::new_cyclic(|this| Session {
            callables: RefCell::new(HashMap::new()),
            next_slot: Cell::new(1),
            lua,
            token: Rc::new(SessionToken),
            this: this.clone(),
            state: RefCell::new(Map::new()),
            installed: Cell::new(false),
        }))
    }

    pub(crate) fn weak(&self) -> Weak<Session> {
        self.this.clone()
    }

    /// Keep a Lua function alive and hand out an opaque handle to it
    ///
    /// The function is pinned until the last clone of the handle drops, or
    /// until [`Bridge::release_callables`] runs.
    pub(crate) fn issue_callable(&self, function: LuaFunction) -> Result<Callable> {
        let key = self.lua.create_registry_value(function)?;
        let slot = self.next_slot.get();
        self.next_slot.set(slot + 1);
        self.callables.borrow_mut().insert(slot, key);
        Ok(Callable::new(
            &self.token,
            SlotLease {
                slot,
                owner: self.weak(),
            },
        ))
    }

    fn forget_callable(&self, slot: u64) {
        let key = match self.callables.try_borrow_mut() {
            Ok(mut callables) => callables.remove(&slot),
            Err(_) => None,
        };
        if let Some(key) = key {
            let _ = self.lua.remove_registry_value(key);
        }
    }

    /// Number of function handles currently pinned
    fn pinned(&self) -> usize {
        self.callables.borrow().len()
    }

    /// Look up the Lua function behind a handle issued by this session
    pub(crate) fn restore_callable(&self, callable: &Callable) -> Result<LuaFunction> {
        if !callable.belongs_to(&self.token) {
            return Err(Error::Marshal(
                "function handle belongs to a closed interpreter session".to_string(),
            ));
        }
        let callables = self.callables.borrow();
        let key = callables.get(&callable.slot()).ok_or_else(|| {
            Error::Marshal(format!("function handle {} was released", callable.slot()))
        })?;
        Ok(self.lua.registry_value(key)?)
    }

    fn release_callables(&self) -> usize {
        let released: Vec<RegistryKey> = self.callables.borrow_mut().drain().map(|(_, k)| k).collect();
        let count = released.len();
        for key in released {
            // Keys from this session are always valid here
            let _ = self.lua.remove_registry_value(key);
        }
        count
    }
}

/// Unpins a callable slot when the last handle to it drops
pub(crate) struct SlotLease {
    slot: u64,
    owner: Weak<Session>,
}

impl SlotLease {
    pub(crate) fn slot(&self) -> u64 {
        self.slot
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        if let Some(session) = self.owner.upgrade() {
            session.forget_callable(self.slot);
        }
    }
}

struct BridgeInner {
    session: RefCell<Option<Rc<Session>>>,
    executing: Cell<bool>,
    config: ScriptingConfig,
    log: ScriptLog,
}

/// Resets the execution flag when a call into the interpreter finishes
struct ExecutionGuard<'a>(&'a Cell<bool>);

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Handle to one interpreter session
///
/// Clones share the same session. Host functions that need to reach back
/// into the bridge should capture a [`WeakBridge`] so the session can be
/// freed on [`Bridge::close`].
#[derive(Clone)]
pub struct Bridge {
    inner: Rc<BridgeInner>,
}

/// Non-owning bridge handle
#[derive(Clone)]
pub struct WeakBridge {
    inner: Weak<BridgeInner>,
}

impl WeakBridge {
    pub fn upgrade(&self) -> Option<Bridge> {
        self.inner.upgrade().map(|inner| Bridge { inner })
    }
}

impl Bridge {
    /// Open a session with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ScriptingConfig::default())
    }

    /// Open a session with the given configuration
    pub fn with_config(config: ScriptingConfig) -> Result<Self> {
        let session = Session::open(&config)?;
        debug!(sandbox = config.sandbox, "opened interpreter session");
        Ok(Self {
            inner: Rc::new(BridgeInner {
                session: RefCell::new(Some(session)),
                executing: Cell::new(false),
                log: ScriptLog::new(config.log_capacity),
                config,
            }),
        })
    }

    pub fn downgrade(&self) -> WeakBridge {
        WeakBridge {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn config(&self) -> &ScriptingConfig {
        &self.inner.config
    }

    /// Lines written by scripts through `log`/`print`
    pub fn script_log(&self) -> &ScriptLog {
        &self.inner.log
    }

    pub(crate) fn session(&self) -> Result<Rc<Session>> {
        self.inner.session.borrow().clone().ok_or(Error::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.session.borrow().is_none()
    }

    /// Mark the interpreter busy for one `execute`, `call_global` or `invoke`
    fn enter(&self) -> Result<ExecutionGuard<'_>> {
        if self.inner.executing.replace(true) {
            return Err(Error::Runtime(
                "re-entrant call into the same interpreter state is not allowed".to_string(),
            ));
        }
        Ok(ExecutionGuard(&self.inner.executing))
    }

    /// Compile and run source text, returning its first return value
    pub fn execute(&self, source: &str) -> Result<Value> {
        self.execute_named(source, &self.inner.config.chunk_name)
    }

    /// Like [`Bridge::execute`] with an explicit chunk name for messages
    pub fn execute_named(&self, source: &str, chunk_name: &str) -> Result<Value> {
        let _guard = self.enter()?;
        let session = self.session()?;
        let function = session
            .lua
            .load(source)
            .set_name(format!("={}", chunk_name))
            .into_function()?;
        let result: LuaValue = function.call(())?;
        from_lua(&session, &result)
    }

    /// Compile source into a function handle without running it
    pub fn compile_named(&self, source: &str, chunk_name: &str) -> Result<Callable> {
        let session = self.session()?;
        let function = session
            .lua
            .load(source)
            .set_name(format!("={}", chunk_name))
            .into_function()?;
        session.issue_callable(function)
    }

    pub fn set_global(&self, name: &str, value: Value) -> Result<()> {
        let session = self.session()?;
        let value = to_lua(&session, &value)?;
        session.lua.globals().set(name, value)?;
        Ok(())
    }

    pub fn get_global(&self, name: &str) -> Result<Value> {
        let session = self.session()?;
        let value: LuaValue = session.lua.globals().get(name)?;
        from_lua(&session, &value)
    }

    /// Expose a host function as a global
    pub fn register_function(&self, name: &str, function: impl HostFunction + 'static) -> Result<()> {
        let session = self.session()?;
        let wrapped = wrap_native(&session, NativeFunction::new(function))?;
        session.lua.globals().set(name, wrapped)?;
        Ok(())
    }

    /// Expose a namespace table of host functions as a global
    pub fn register_module<K: Into<String>>(
        &self,
        name: &str,
        methods: impl IntoIterator<Item = (K, NativeFunction)>,
    ) -> Result<()> {
        let session = self.session()?;
        let table = session.lua.create_table()?;
        for (method, function) in methods {
            let method: String = method.into();
            table.raw_set(method, wrap_native(&session, function)?)?;
        }
        session.lua.globals().set(name, table)?;
        Ok(())
    }

    /// Call a global Lua function with host arguments
    pub fn call_global(&self, name: &str, args: Vec<Value>) -> Result<Value> {
        let _guard = self.enter()?;
        let session = self.session()?;
        match session.lua.globals().get::<LuaValue>(name)? {
            LuaValue::Function(function) => call_with(&session, &function, &args),
            other => Err(Error::Runtime(format!(
                "global '{}' is not a function (got {})",
                name,
                other.type_name()
            ))),
        }
    }

    /// Call an interpreter function previously returned to the host
    pub fn invoke(&self, callable: &Callable, args: Vec<Value>) -> Result<Value> {
        if !callable.is_live() {
            return Err(Error::Closed);
        }
        let _guard = self.enter()?;
        let session = self.session()?;
        let function = session.restore_callable(callable)?;
        call_with(&session, &function, &args)
    }

    /// Drop every function handle issued so far; returns how many were held
    pub fn release_callables(&self) -> usize {
        match self.session() {
            Ok(session) => session.release_callables(),
            Err(_) => 0,
        }
    }

    /// Number of interpreter functions currently held for the host
    pub fn pinned_callables(&self) -> usize {
        self.session().map(|session| session.pinned()).unwrap_or(0)
    }

    /// Copy of the script `state` namespace
    pub fn state_snapshot(&self) -> Result<Map> {
        Ok(self.session()?.state.borrow().clone())
    }

    /// Close the interpreter; issued callables stop being live
    pub fn close(&self) -> Result<()> {
        if self.inner.executing.get() {
            return Err(Error::Runtime(
                "cannot close the interpreter while a script is running".to_string(),
            ));
        }
        if let Some(session) = self.inner.session.borrow_mut().take() {
            session.release_callables();
            debug!("closed interpreter session");
        }
        Ok(())
    }

    /// Close and reopen the interpreter with the same configuration
    pub fn reset(&self) -> Result<()> {
        self.close()?;
        let session = Session::open(&self.inner.config)?;
        *self.inner.session.borrow_mut() = Some(session);
        debug!("reset interpreter session");
        Ok(())
    }
}

fn call_with(session: &Session, function: &LuaFunction, args: &[Value]) -> Result<Value> {
    let args = args
        .iter()
        .map(|arg| to_lua(session, arg))
        .collect::<Result<MultiValue>>()?;
    let result: LuaValue = function.call(args)?;
    from_lua(session, &result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_execute_returns_value() {
        let bridge = Bridge::new().unwrap();
        assert_eq!(bridge.execute("return 1 + 1").unwrap(), Value::Int(2));
        assert_eq!(bridge.execute("x = 1").unwrap(), Value::Nil);
    }

    #[test]
    fn test_globals_persist_between_runs() {
        let bridge = Bridge::new().unwrap();
        bridge.execute("counter = (counter or 0) + 1").unwrap();
        bridge.execute("counter = (counter or 0) + 1").unwrap();
        assert_eq!(bridge.get_global("counter").unwrap(), Value::Int(2));
    }

    #[test]
    fn test_syntax_and_runtime_errors() {
        let bridge = Bridge::new().unwrap();

        let err = bridge.execute("retur 1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert!(!err.message().is_empty());

        let err = bridge.execute("error('boom')").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
        assert!(err.message().contains("boom"));

        // Session still usable
        assert_eq!(bridge.execute("return 'ok'").unwrap(), Value::from("ok"));
    }

    #[test]
    fn test_sandbox_hides_io() {
        let bridge = Bridge::new().unwrap();
        assert_eq!(
            bridge.execute("return io == nil and os == nil and dofile == nil").unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_closed_bridge_fails_cleanly() {
        let bridge = Bridge::new().unwrap();
        bridge.close().unwrap();
        assert!(bridge.is_closed());
        assert!(matches!(bridge.execute("return 1"), Err(Error::Closed)));
        assert!(matches!(bridge.get_global("x"), Err(Error::Closed)));
        bridge.close().unwrap();
    }

    #[test]
    fn test_reset_clears_globals() {
        let bridge = Bridge::new().unwrap();
        bridge.execute("x = 5").unwrap();
        bridge.reset().unwrap();
        assert_eq!(bridge.get_global("x").unwrap(), Value::Nil);
    }

    #[test]
    fn test_memory_limit_is_runtime_error() {
        let config = ScriptingConfig {
            memory_limit: Some(256 * 1024),
            ..Default::default()
        };
        let bridge = Bridge::with_config(config).unwrap();
        let err = bridge
            .execute("local t = {} for i = 1, 1e7 do t[i] = tostring(i) end")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
    }
}
