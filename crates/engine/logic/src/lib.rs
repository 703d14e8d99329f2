//! Logic crate - Typed node-graph model for Crossworld visual scripting
//!
//! This crate holds the data model of the visual-programming layer: the node
//! type catalogue, port typing, graph records and the script-node contract.
//! It does not run graphs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Node Registry                         │
//! │  ├── Built-in catalogue (event/action/condition/...)    │
//! │  └── Custom types (registered at runtime, removable)    │
//! ├─────────────────────────────────────────────────────────┤
//! │  Graphs                                                  │
//! │  ├── Node instances (type id + position + data)         │
//! │  └── Edges (source port -> target port, type-checked)   │
//! ├─────────────────────────────────────────────────────────┤
//! │  Script nodes                                            │
//! │  ├── Per-instance ports and signals                     │
//! │  └── Invocation contract (inputs, ctx, emit, services)  │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use logic::{EdgeInstance, NodeGraph, NodeInstance, NodeRegistry, Position};
//!
//! let registry = NodeRegistry::new();
//! let mut graph = NodeGraph::new("g1", "Door");
//! graph.add_node(NodeInstance::new("start", "on-start", Position::new(0.0, 0.0))).unwrap();
//! graph.add_node(NodeInstance::new("log", "log", Position::new(200.0, 0.0))).unwrap();
//! graph.connect(&registry, EdgeInstance::new("start", "out", "log", "in")).unwrap();
//! ```

mod builtin;
mod error;
mod graph;
mod node_type;
mod port;
mod registry;
mod script_node;

pub use builtin::{builtin_node_types, SCRIPT_NODE_TYPE};
pub use error::{Error, Result};
pub use graph::{EdgeInstance, NodeGraph, NodeInstance, Position};
pub use node_type::{NodeCategory, NodeTypeDefinition};
pub use port::{NodePortDefinition, PortDirection, PortType};
pub use registry::{NodeRegistry, SharedRegistry};
pub use script_node::{
    validate_emit, ContextHandle, ScriptInvocation, ScriptNodeData, ServiceNamespace,
    SignalEmission, SCRIPT_PARAMS,
};

// Re-export glam for convenience
pub use glam;
