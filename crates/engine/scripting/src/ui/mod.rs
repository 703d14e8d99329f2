//! Declarative UI trees built from Lua
//!
//! Scripts call `ui.<tag>(props, children)` factories and return the root
//! node. The host reads the result back as a [`UiNode`] tree.

mod catalog;
mod node;
mod runtime;

pub use catalog::{component, component_tags, ComponentGroup, ComponentInfo, COMPONENTS};
pub use node::{is_node_value, UiNode, NODE_MARKER};
pub use runtime::{Diagnostic, Preview, UiRuntime};

pub(crate) use node::build_node;
