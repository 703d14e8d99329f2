//! Node type definitions for the visual-scripting catalogue

use crate::{Error, NodePortDefinition, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Catalogue group a node type belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    Event,
    Action,
    Condition,
    Data,
    Flow,
    Custom,
}

impl NodeCategory {
    pub const ALL: [NodeCategory; 6] = [
        NodeCategory::Event,
        NodeCategory::Action,
        NodeCategory::Condition,
        NodeCategory::Data,
        NodeCategory::Flow,
        NodeCategory::Custom,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            NodeCategory::Event => "event",
            NodeCategory::Action => "action",
            NodeCategory::Condition => "condition",
            NodeCategory::Data => "data",
            NodeCategory::Flow => "flow",
            NodeCategory::Custom => "custom",
        }
    }

    /// Default header color for nodes of this category
    pub fn color(&self) -> &'static str {
        match self {
            NodeCategory::Event => "#e74c3c",
            NodeCategory::Action => "#3498db",
            NodeCategory::Condition => "#f39c12",
            NodeCategory::Data => "#2ecc71",
            NodeCategory::Flow => "#9b59b6",
            NodeCategory::Custom => "#1abc9c",
        }
    }
}

impl std::fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for NodeCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        NodeCategory::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown node category: {}", s))
    }
}

/// A capability descriptor in the node catalogue
///
/// Serialized field names follow the persisted graph format
/// (`isCustom`, camelCase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeDefinition {
    /// Unique identifier (e.g. "on-start")
    pub id: String,

    /// Human-readable name
    pub name: String,

    pub category: NodeCategory,

    #[serde(default)]
    pub description: String,

    /// Icon name understood by the editor
    #[serde(default)]
    pub icon: String,

    /// Header color (hex)
    #[serde(default)]
    pub color: String,

    #[serde(default)]
    pub inputs: Vec<NodePortDefinition>,

    #[serde(default)]
    pub outputs: Vec<NodePortDefinition>,

    /// Optional embedded Lua behavior snippet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<String>,

    /// Set for types registered at runtime; built-ins leave it unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_custom: Option<bool>,
}

impl NodeTypeDefinition {
    /// Create a new node type with no ports
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: NodeCategory) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            description: String::new(),
            icon: String::new(),
            color: category.color().to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            behavior: None,
            is_custom: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Add an input port (builder pattern)
    pub fn input(mut self, port: NodePortDefinition) -> Self {
        self.inputs.push(port);
        self
    }

    /// Add an output port (builder pattern)
    pub fn output(mut self, port: NodePortDefinition) -> Self {
        self.outputs.push(port);
        self
    }

    pub fn with_behavior(mut self, code: impl Into<String>) -> Self {
        self.behavior = Some(code.into());
        self
    }

    /// Check if this type was registered at runtime
    pub fn is_custom(&self) -> bool {
        self.is_custom.unwrap_or(false)
    }

    /// Find an input port by id
    pub fn input_port(&self, id: &str) -> Option<&NodePortDefinition> {
        self.inputs.iter().find(|p| p.id == id)
    }

    /// Find an output port by id
    pub fn output_port(&self, id: &str) -> Option<&NodePortDefinition> {
        self.outputs.iter().find(|p| p.id == id)
    }

    /// Check that port ids are unique across inputs and outputs
    pub fn validate_ports(&self) -> Result<()> {
        check_unique_ports(&self.id, self.inputs.iter().chain(self.outputs.iter()))
    }
}

pub(crate) fn check_unique_ports<'a>(
    owner: &str,
    ports: impl Iterator<Item = &'a NodePortDefinition>,
) -> Result<()> {
    let mut seen = HashSet::new();
    for port in ports {
        if !seen.insert(port.id.as_str()) {
            return Err(Error::DuplicatePort {
                node_type: owner.to_string(),
                port: port.id.clone(),
            });
        }
    }
    Ok(())
}
