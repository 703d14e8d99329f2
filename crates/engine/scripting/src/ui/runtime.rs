//! Running UI scripts against a bridge

use crate::{Bridge, Callable, Error, ErrorKind, Registrar, Result, ScriptFile, ScriptingConfig, UiNode, Value};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

/// A contained script failure, ready for display
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error in {chunk}: {message}")]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub message: String,
    /// Chunk the failing script was run as
    pub chunk: String,
}

impl Diagnostic {
    pub fn new(error: &Error, chunk: impl Into<String>) -> Self {
        Self {
            kind: error.kind(),
            message: error.message(),
            chunk: chunk.into(),
        }
    }
}

/// Result of a live preview run
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    /// The script returned a UI definition
    Tree(UiNode),
    /// The script ran but returned something else
    Empty,
    /// The script failed
    Error(Diagnostic),
}

/// Runs UI scripts in one persistent session
///
/// Globals and `state` survive between runs. Callback handles from the
/// previous tree are released at the start of every run.
pub struct UiRuntime {
    bridge: Bridge,
}

impl UiRuntime {
    /// Runtime with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ScriptingConfig::default())
    }

    pub fn with_config(config: ScriptingConfig) -> Result<Self> {
        Self::from_bridge(Bridge::with_config(config)?)
    }

    /// Wrap an existing bridge, installing the standard globals
    pub fn from_bridge(bridge: Bridge) -> Result<Self> {
        Registrar::install(&bridge)?;
        Ok(Self { bridge })
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    /// Run a UI script; `Ok(None)` when it returns no UI definition
    pub fn run_ui(&self, source: &str) -> std::result::Result<Option<UiNode>, Diagnostic> {
        let chunk = self.bridge.config().chunk_name.clone();
        self.run_named(source, &chunk)
    }

    /// Run a script file, named after the file
    pub fn run_file(&self, file: &ScriptFile) -> std::result::Result<Option<UiNode>, Diagnostic> {
        self.run_named(&file.source, &file.chunk_name())
    }

    /// Run with an explicit chunk name
    pub fn run_named(&self, source: &str, chunk: &str) -> std::result::Result<Option<UiNode>, Diagnostic> {
        let started = Instant::now();
        match self.evaluate(source, chunk) {
            Ok(tree) => {
                debug!(
                    chunk,
                    elapsed_us = started.elapsed().as_micros() as u64,
                    has_tree = tree.is_some(),
                    "ui script finished"
                );
                Ok(tree)
            }
            Err(err) => {
                let diagnostic = Diagnostic::new(&err, chunk);
                warn!(chunk, kind = %diagnostic.kind, message = %diagnostic.message, "ui script failed");
                Err(diagnostic)
            }
        }
    }

    fn evaluate(&self, source: &str, chunk: &str) -> Result<Option<UiNode>> {
        let released = self.bridge.release_callables();
        if released > 0 {
            debug!(released, "released callbacks from previous tree");
        }
        Registrar::install(&self.bridge)?;
        let value = self.bridge.execute_named(source, chunk)?;
        UiNode::from_value(&value)
    }

    /// Run for live preview, folding failures into the result
    pub fn preview(&self, source: &str) -> Preview {
        match self.run_ui(source) {
            Ok(Some(tree)) => Preview::Tree(tree),
            Ok(None) => Preview::Empty,
            Err(diagnostic) => Preview::Error(diagnostic),
        }
    }

    /// Invoke an event callback taken from the current tree
    pub fn dispatch(&self, callback: &Callable, args: Vec<Value>) -> std::result::Result<Value, Diagnostic> {
        let chunk = self.bridge.config().chunk_name.clone();
        self.bridge.invoke(callback, args).map_err(|err| {
            let diagnostic = Diagnostic::new(&err, chunk);
            warn!(slot = callback.slot(), kind = %diagnostic.kind, message = %diagnostic.message, "ui callback failed");
            diagnostic
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_with_button() {
        let runtime = UiRuntime::new().unwrap();
        let tree = runtime
            .run_ui("return ui.panel({ title = 'X' }, { ui.button({ label = 'Go' }) })")
            .unwrap()
            .unwrap();
        assert_eq!(tree.tag, "panel");
        assert_eq!(tree.prop("title"), Some(&Value::from("X")));
        assert_eq!(tree.children().len(), 1);
        assert_eq!(tree.children()[0].tag, "button");
    }

    #[test]
    fn test_non_ui_result_is_none() {
        let runtime = UiRuntime::new().unwrap();
        assert_eq!(runtime.run_ui("return 42").unwrap(), None);
        assert_eq!(runtime.preview("return { type = 'panel' }"), Preview::Empty);
    }

    #[test]
    fn test_failure_is_contained() {
        let runtime = UiRuntime::new().unwrap();
        let diagnostic = runtime.run_ui("retur 1").unwrap_err();
        assert_eq!(diagnostic.kind, ErrorKind::Syntax);
        assert_eq!(diagnostic.chunk, "script");

        assert!(matches!(runtime.preview("error('x')"), Preview::Error(d) if d.kind == ErrorKind::Runtime));
        assert!(runtime.run_ui("return ui.text('ok')").unwrap().is_some());
    }

    #[test]
    fn test_dispatch_callback() {
        let runtime = UiRuntime::new().unwrap();
        let tree = runtime
            .run_ui(
                "clicks = 0
                 return ui.button({ label = 'Go', onClick = function(n) clicks = clicks + n; return clicks end })",
            )
            .unwrap()
            .unwrap();
        let callback = tree.prop("onClick").unwrap().as_callable().unwrap().clone();

        assert_eq!(runtime.dispatch(&callback, vec![Value::Int(2)]).unwrap(), Value::Int(2));
        assert_eq!(runtime.dispatch(&callback, vec![Value::Int(3)]).unwrap(), Value::Int(5));

        // The next run drops the previous tree's callbacks
        runtime.run_ui("return nil").unwrap();
        let diagnostic = runtime.dispatch(&callback, vec![Value::Int(1)]).unwrap_err();
        assert_eq!(diagnostic.kind, ErrorKind::Marshal);
    }
}
