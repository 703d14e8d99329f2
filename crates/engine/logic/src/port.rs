//! Port typing for node inputs and outputs

use serde::{Deserialize, Serialize};

/// Type carried by a port
///
/// `Flow` ports sequence execution; every other type carries data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortType {
    Flow,
    String,
    Number,
    Boolean,
    Any,
    Entity,
    Position,
}

impl PortType {
    /// All port types, in catalogue order
    pub const ALL: [PortType; 7] = [
        PortType::Flow,
        PortType::String,
        PortType::Number,
        PortType::Boolean,
        PortType::Any,
        PortType::Entity,
        PortType::Position,
    ];

    /// Lowercase name used in persisted graphs
    pub fn name(&self) -> &'static str {
        match self {
            PortType::Flow => "flow",
            PortType::String => "string",
            PortType::Number => "number",
            PortType::Boolean => "boolean",
            PortType::Any => "any",
            PortType::Entity => "entity",
            PortType::Position => "position",
        }
    }

    /// Check if this is an execution-flow port
    pub fn is_flow(&self) -> bool {
        matches!(self, PortType::Flow)
    }

    /// Check if this port carries data
    pub fn is_data(&self) -> bool {
        !self.is_flow()
    }

    /// Check whether an output of this type may feed an input of `other`
    ///
    /// Flow only connects to flow. `Any` connects to every data type in
    /// either direction.
    pub fn is_compatible_with(&self, other: &PortType) -> bool {
        match (self, other) {
            (PortType::Flow, PortType::Flow) => true,
            (PortType::Flow, _) | (_, PortType::Flow) => false,
            (PortType::Any, _) | (_, PortType::Any) => true,
            (a, b) => a == b,
        }
    }
}

impl std::fmt::Display for PortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Direction of a port relative to its node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortDirection {
    Input,
    Output,
}

/// A typed, named connection point on a node type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePortDefinition {
    /// Port id, unique within its node type
    pub id: String,

    /// Display label (falls back to the id when empty)
    #[serde(default)]
    pub label: String,

    /// Port type
    #[serde(rename = "type")]
    pub port_type: PortType,

    /// Whether an invocation must supply this input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
}

impl NodePortDefinition {
    /// Create a port with an explicit type
    pub fn new(id: impl Into<String>, label: impl Into<String>, port_type: PortType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            port_type,
            required: None,
        }
    }

    /// Create a flow port
    pub fn flow(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(id, label, PortType::Flow)
    }

    /// Mark this port as required (builder pattern)
    pub fn required(mut self) -> Self {
        self.required = Some(true);
        self
    }

    /// Check if this port is required
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }

    /// Label to show in an editor
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.id
        } else {
            &self.label
        }
    }
}
