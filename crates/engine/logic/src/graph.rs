//! Graph, node instance and edge records

use crate::{Error, NodeRegistry, PortDirection, Result};
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Canvas position of a node
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<Vec2> for Position {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Position> for Vec2 {
    fn from(p: Position) -> Self {
        Vec2::new(p.x, p.y)
    }
}

/// A node placed in a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInstance {
    pub id: String,

    /// References a [`crate::NodeTypeDefinition`] id
    pub type_id: String,

    #[serde(default)]
    pub position: Position,

    /// Free-form payload, interpreted per type id
    #[serde(default)]
    pub data: serde_json::Value,
}

impl NodeInstance {
    pub fn new(id: impl Into<String>, type_id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            type_id: type_id.into(),
            position,
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// A directed connection from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeInstance {
    pub id: String,
    pub source: String,
    pub source_handle: String,
    pub target: String,
    pub target_handle: String,
}

impl EdgeInstance {
    /// Create an edge with an id derived from its endpoints
    pub fn new(
        source: impl Into<String>,
        source_handle: impl Into<String>,
        target: impl Into<String>,
        target_handle: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let source_handle = source_handle.into();
        let target = target.into();
        let target_handle = target_handle.into();
        Self {
            id: format!("e-{}-{}-{}-{}", source, source_handle, target, target_handle),
            source,
            source_handle,
            target,
            target_handle,
        }
    }
}

/// A named graph of node instances and edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGraph {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<NodeInstance>,
    #[serde(default)]
    pub edges: Vec<EdgeInstance>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl NodeGraph {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            metadata: None,
        }
    }

    pub fn node(&self, id: &str) -> Option<&NodeInstance> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut NodeInstance> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&EdgeInstance> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Add a node; ids must be unique within the graph
    pub fn add_node(&mut self, node: NodeInstance) -> Result<()> {
        if self.node(&node.id).is_some() {
            return Err(Error::DuplicateNode(node.id));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Remove a node and every edge attached to it
    pub fn remove_node(&mut self, id: &str) -> Option<NodeInstance> {
        let index = self.nodes.iter().position(|n| n.id == id)?;
        self.edges.retain(|e| e.source != id && e.target != id);
        Some(self.nodes.remove(index))
    }

    /// Edges leaving a node
    pub fn edges_from<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a EdgeInstance> {
        self.edges.iter().filter(move |e| e.source == node_id)
    }

    /// Edges entering a node
    pub fn edges_to<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a EdgeInstance> {
        self.edges.iter().filter(move |e| e.target == node_id)
    }

    /// Add an edge after checking it against the registry
    pub fn connect(&mut self, registry: &NodeRegistry, edge: EdgeInstance) -> Result<()> {
        if self.edge(&edge.id).is_some() {
            return Err(Error::DuplicateEdge(edge.id));
        }
        self.check_edge(registry, &edge)?;
        self.edges.push(edge);
        Ok(())
    }

    /// Remove an edge by id
    pub fn disconnect(&mut self, edge_id: &str) -> Option<EdgeInstance> {
        let index = self.edges.iter().position(|e| e.id == edge_id)?;
        Some(self.edges.remove(index))
    }

    /// Check every node type and edge, collecting all problems
    pub fn validate(&self, registry: &NodeRegistry) -> Vec<Error> {
        let mut problems = Vec::new();
        for node in &self.nodes {
            if registry.get_node_type(&node.type_id).is_none() {
                problems.push(Error::UnknownNodeType(node.type_id.clone()));
            }
        }
        for (index, edge) in self.edges.iter().enumerate() {
            if let Err(e) = self.check_endpoints(registry, edge) {
                problems.push(e);
                continue;
            }
            // Data inputs accept a single edge; flag later duplicates
            let earlier = &self.edges[..index];
            if let Err(e) = self.check_single_input(registry, edge, earlier) {
                problems.push(e);
            }
        }
        problems
    }

    /// Bounding box of all node positions
    pub fn bounds(&self) -> Option<(Vec2, Vec2)> {
        let mut positions = self.nodes.iter().map(|n| Vec2::from(n.position));
        let first = positions.next()?;
        Some(positions.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }

    fn check_edge(&self, registry: &NodeRegistry, edge: &EdgeInstance) -> Result<()> {
        self.check_endpoints(registry, edge)?;
        self.check_single_input(registry, edge, &self.edges)
    }

    fn check_endpoints(&self, registry: &NodeRegistry, edge: &EdgeInstance) -> Result<()> {
        let source = self
            .node(&edge.source)
            .ok_or_else(|| Error::NodeNotFound(edge.source.clone()))?;
        let target = self
            .node(&edge.target)
            .ok_or_else(|| Error::NodeNotFound(edge.target.clone()))?;

        let source_port = registry
            .ports_for(source, PortDirection::Output)?
            .into_iter()
            .find(|p| p.id == edge.source_handle)
            .ok_or_else(|| Error::PortNotFound {
                node: source.id.clone(),
                port: edge.source_handle.clone(),
            })?;
        let target_port = registry
            .ports_for(target, PortDirection::Input)?
            .into_iter()
            .find(|p| p.id == edge.target_handle)
            .ok_or_else(|| Error::PortNotFound {
                node: target.id.clone(),
                port: edge.target_handle.clone(),
            })?;

        if !source_port.port_type.is_compatible_with(&target_port.port_type) {
            return Err(Error::IncompatiblePorts {
                source_type: source_port.port_type,
                target_type: target_port.port_type,
            });
        }
        Ok(())
    }

    fn check_single_input(
        &self,
        registry: &NodeRegistry,
        edge: &EdgeInstance,
        existing: &[EdgeInstance],
    ) -> Result<()> {
        let Some(target) = self.node(&edge.target) else {
            return Err(Error::NodeNotFound(edge.target.clone()));
        };
        let is_data = registry
            .ports_for(target, PortDirection::Input)?
            .iter()
            .any(|p| p.id == edge.target_handle && p.port_type.is_data());
        let taken = existing
            .iter()
            .any(|e| e.target == edge.target && e.target_handle == edge.target_handle);
        if is_data && taken {
            return Err(Error::InputAlreadyConnected {
                node: edge.target.clone(),
                port: edge.target_handle.clone(),
            });
        }
        Ok(())
    }
}
