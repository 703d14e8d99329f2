//! KDL configuration for the scripting system
//!
//! # Example
//!
//! ```kdl
//! scripting {
//!     sandbox #true
//!     memory-limit 67108864
//!     chunk-name "panel"
//!     log-capacity 256
//! }
//! ui {
//!     debounce-ms 300
//! }
//! log {
//!     filter "info"
//! }
//! ```
//!
//! Every key is optional. Unknown sections and keys are skipped.

use crate::{Error, Result};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Settings for a bridge session, the UI runtime and host logging
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptingConfig {
    /// Restrict the Lua stdlib to table/string/utf8/math/coroutine
    pub sandbox: bool,
    /// Interpreter memory limit in bytes
    pub memory_limit: Option<usize>,
    /// Chunk name reported in script error messages
    pub chunk_name: String,
    /// Number of script log lines kept for the console
    pub log_capacity: usize,
    /// Quiet period before a live-edited script is re-run
    pub debounce_ms: u64,
    /// `tracing` filter directive for host binaries
    pub log_filter: String,
}

impl Default for ScriptingConfig {
    fn default() -> Self {
        Self {
            sandbox: true,
            memory_limit: None,
            chunk_name: "script".to_string(),
            log_capacity: 256,
            debounce_ms: 300,
            log_filter: "info".to_string(),
        }
    }
}

impl ScriptingConfig {
    /// Parse a KDL file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading scripting config");
        Self::from_kdl_str(&content)
    }

    /// Parse a KDL string
    pub fn from_kdl_str(content: &str) -> Result<Self> {
        let doc: kdl::KdlDocument = content.parse()?;
        let mut config = Self::default();

        for section in doc.nodes() {
            let Some(children) = section.children() else {
                continue;
            };
            let section_name = section.name().value();
            for node in children.nodes() {
                let key = format!("{}.{}", section_name, node.name().value());
                config.apply(&key, node)?;
            }
        }

        Ok(config)
    }

    fn apply(&mut self, key: &str, node: &kdl::KdlNode) -> Result<()> {
        match key {
            "scripting.sandbox" => self.sandbox = bool_arg(key, node)?,
            "scripting.memory-limit" => {
                let limit = usize_arg(key, node)?;
                self.memory_limit = (limit > 0).then_some(limit);
            }
            "scripting.chunk-name" => self.chunk_name = string_arg(key, node)?,
            "scripting.log-capacity" => self.log_capacity = usize_arg(key, node)?,
            "ui.debounce-ms" => self.debounce_ms = usize_arg(key, node)? as u64,
            "log.filter" => self.log_filter = string_arg(key, node)?,
            other => debug!(key = other, "ignoring unknown config key"),
        }
        Ok(())
    }

    /// Debounce window as a duration
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// First positional argument of a KDL node
fn first_arg(node: &kdl::KdlNode) -> Option<&kdl::KdlValue> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .map(|e| e.value())
}

fn invalid(key: &str, expected: &str) -> Error {
    Error::InvalidConfig(format!("{}: expected {}", key, expected))
}

fn bool_arg(key: &str, node: &kdl::KdlNode) -> Result<bool> {
    match first_arg(node) {
        Some(kdl::KdlValue::Bool(b)) => Ok(*b),
        _ => Err(invalid(key, "boolean")),
    }
}

fn usize_arg(key: &str, node: &kdl::KdlNode) -> Result<usize> {
    match first_arg(node) {
        Some(kdl::KdlValue::Integer(i)) => {
            usize::try_from(*i).map_err(|_| invalid(key, "non-negative integer"))
        }
        _ => Err(invalid(key, "integer")),
    }
}

fn string_arg(key: &str, node: &kdl::KdlNode) -> Result<String> {
    match first_arg(node) {
        Some(kdl::KdlValue::String(s)) => Ok(s.clone()),
        _ => Err(invalid(key, "string")),
    }
}
