//! Crossworld UI script runner
//!
//! Shared pieces of the `editor` binary: config loading, running a script
//! file into printable output, watching a file for live preview, and
//! catalogue listings.

use anyhow::{Context, Result};
use logic::{NodeCategory, NodeRegistry};
use notify_debouncer_mini::{
    new_debouncer,
    notify::{RecursiveMode, Watcher},
};
use scripting::ui::COMPONENTS;
use scripting::{Diagnostic, ScriptFile, ScriptingConfig, UiRuntime, Value};
use std::path::Path;
use std::sync::mpsc::channel;
use tracing::{debug, info, warn};

/// Printable result of one script run
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutput {
    /// Pretty JSON of the returned UI tree
    Tree(String),
    /// The script ran but returned no UI tree
    NoTree,
    Failed(Diagnostic),
}

impl std::fmt::Display for RunOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutput::Tree(json) => f.write_str(json),
            RunOutput::NoTree => f.write_str("(script returned no UI tree)"),
            RunOutput::Failed(diagnostic) => write!(f, "{}", diagnostic),
        }
    }
}

/// Load the KDL config, or defaults when no path is given
pub fn load_config(path: Option<&Path>) -> Result<ScriptingConfig> {
    match path {
        Some(path) => ScriptingConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(ScriptingConfig::default()),
    }
}

/// Run a loaded script file through the UI runtime
pub fn run_script(runtime: &UiRuntime, file: &ScriptFile) -> Result<RunOutput> {
    Ok(match runtime.run_file(file) {
        Ok(Some(tree)) => RunOutput::Tree(serde_json::to_string_pretty(&tree.to_json())?),
        Ok(None) => RunOutput::NoTree,
        Err(diagnostic) => RunOutput::Failed(diagnostic),
    })
}

/// Evaluate a code snippet and render the returned value
pub fn eval(runtime: &UiRuntime, code: &str) -> Result<String> {
    let value = runtime.bridge().execute(code)?;
    render_value(&value)
}

/// Tables as pretty JSON, scalars in Lua `tostring` form
pub fn render_value(value: &Value) -> Result<String> {
    Ok(match value {
        Value::Array(_) | Value::Map(_) => serde_json::to_string_pretty(&value.to_json())?,
        other => other.to_string(),
    })
}

/// Re-run a script whenever its file changes
///
/// Runs once immediately, then blocks until the watcher shuts down.
pub fn watch(
    path: &Path,
    runtime: &UiRuntime,
    mut on_run: impl FnMut(&RunOutput),
) -> Result<()> {
    let mut file = ScriptFile::load(path)?;
    on_run(&run_script(runtime, &file)?);

    let (tx, rx) = channel();
    let mut debouncer = new_debouncer(runtime.bridge().config().debounce(), tx)
        .context("Failed to create file watcher")?;

    // Watch the directory; editors often replace the file on save
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    debouncer
        .watcher()
        .watch(dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", dir.display()))?;
    info!(path = %path.display(), "watching for changes");

    for result in rx {
        let events = match result {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "file watcher error");
                continue;
            }
        };
        if !events.iter().any(|e| e.path.file_name() == path.file_name()) {
            continue;
        }
        match file.reload_if_modified() {
            Ok(true) => on_run(&run_script(runtime, &file)?),
            Ok(false) => debug!("change event without a newer modification time"),
            Err(e) => warn!(error = %e, "failed to reload script"),
        }
    }

    Ok(())
}

/// One line per UI component: tag, group, description
pub fn component_listing() -> Vec<String> {
    COMPONENTS
        .iter()
        .map(|c| format!("{:<12} {:<9} {}", c.tag, c.group.name(), c.description))
        .collect()
}

/// One line per node type: id, category, name
pub fn node_listing(registry: &NodeRegistry, category: Option<NodeCategory>) -> Vec<String> {
    let types = match category {
        Some(category) => registry.get_nodes_by_category(category),
        None => registry.get_all_node_types(),
    };
    types
        .iter()
        .map(|def| format!("{:<16} {:<10} {}", def.id, def.category.name(), def.name))
        .collect()
}
