//! Error types for the logic crate

use crate::PortType;
use thiserror::Error;

/// Result type alias for node-graph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while editing node types and graphs
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Attempt to replace a built-in node type
    #[error("Node type is built in and cannot be replaced: {0}")]
    ProtectedNodeType(String),

    /// Node type id not present in the registry
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// Two ports with the same id on one node type or script node
    #[error("Duplicate port '{port}' on {node_type}")]
    DuplicatePort { node_type: String, port: String },

    /// Node id already used in the graph
    #[error("Duplicate node ID: {0}")]
    DuplicateNode(String),

    /// Edge id already used in the graph
    #[error("Duplicate edge ID: {0}")]
    DuplicateEdge(String),

    /// Node not found by ID
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Port not found on a node
    #[error("Port '{port}' not found on node {node}")]
    PortNotFound { node: String, port: String },

    /// Port types cannot be connected
    #[error("Cannot connect {source_type} output to {target_type} input")]
    IncompatiblePorts {
        source_type: PortType,
        target_type: PortType,
    },

    /// Data input already has an incoming edge
    #[error("Input '{port}' on node {node} is already connected")]
    InputAlreadyConnected { node: String, port: String },

    /// Instance data does not match the payload its node type expects
    #[error("Invalid data on node {node}: {message}")]
    InvalidNodeData { node: String, message: String },

    /// Invocation supplied an input the script node does not declare
    #[error("Unknown input: {0}")]
    UnknownInput(String),

    /// Invocation is missing a required input
    #[error("Missing required input: {0}")]
    MissingInput(String),

    /// Script emitted a signal it did not declare
    #[error("Signal not declared in emitSignals: {0}")]
    UndeclaredSignal(String),
}
