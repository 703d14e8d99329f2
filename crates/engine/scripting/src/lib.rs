//! Lua scripting bridge and declarative UI scripts for Crossworld
//!
//! This crate provides:
//! - **Bridge**: one persistent Lua session with value marshaling in both
//!   directions, host functions and opaque handles to Lua functions
//! - **Registrar**: the standard globals (`log`, `utils`, `state`, `ui`, ...)
//! - **UI runtime**: runs panel scripts and reads back a [`UiNode`] tree
//! - **Script nodes**: compiles and invokes node-graph script bodies
//! - **Config**: KDL settings for sandboxing, limits and live reload
//!
//! ```text
//! ┌──────────┐  run_ui   ┌───────────┐  execute  ┌────────┐
//! │  editor  │ ────────> │ UiRuntime │ ────────> │ Bridge │ ── Lua state
//! └──────────┘ <──────── └───────────┘ <──────── └────────┘
//!               UiNode                   Value
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use scripting::UiRuntime;
//!
//! let runtime = UiRuntime::new()?;
//! let tree = runtime
//!     .run_ui("return ui.panel({ title = 'Stats' }, { ui.text('HP: 10') })")?
//!     .expect("script returned a UI tree");
//! assert_eq!(tree.tag, "panel");
//! ```

mod bridge;
mod config;
mod error;
mod marshal;
mod panel_store;
mod registrar;
mod script_file;
mod script_log;
mod script_node;
pub mod ui;
mod value;

pub use bridge::{Bridge, WeakBridge};
pub use config::ScriptingConfig;
pub use error::{Error, ErrorKind, Result};
pub use panel_store::{panel_id, slug, MemoryPanelStore, PanelStore, SavedPanel};
pub use registrar::Registrar;
pub use script_file::ScriptFile;
pub use script_log::ScriptLog;
pub use script_node::{ScriptNodeOutcome, ScriptNodeRunner, ScriptServices};
pub use ui::{Diagnostic, Preview, UiNode, UiRuntime};
pub use value::{Callable, HostFunction, Map, NativeFunction, Value};

// Re-export for downstream crates
pub use logic;
pub use mlua;
