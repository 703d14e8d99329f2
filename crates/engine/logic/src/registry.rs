//! Node type registry

use crate::builtin::{builtin_node_types, SCRIPT_NODE_TYPE};
use crate::{
    Error, NodeCategory, NodeInstance, NodePortDefinition, NodeTypeDefinition, PortDirection,
    Result, ScriptNodeData,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Registry shared by every consumer on the logic thread
pub type SharedRegistry = Rc<RefCell<NodeRegistry>>;

/// Catalogue of node types, seeded with the built-ins
///
/// Built-in entries can be read but never replaced or removed. Lookups and
/// `unregister_node_type` never fail; absence is reported as `None`/`false`.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    /// All node types, keyed by ID
    types: HashMap<String, NodeTypeDefinition>,

    /// IDs in registration order
    order: Vec<String>,
}

impl NodeRegistry {
    /// Create a registry seeded with the built-in catalogue
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for def in builtin_node_types() {
            registry.insert(def);
        }
        debug!(count = registry.len(), "node registry seeded");
        registry
    }

    /// Create a registry with no entries
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a seeded registry behind shared ownership
    pub fn shared() -> SharedRegistry {
        Rc::new(RefCell::new(Self::new()))
    }

    fn insert(&mut self, def: NodeTypeDefinition) {
        if !self.types.contains_key(&def.id) {
            self.order.push(def.id.clone());
        }
        self.types.insert(def.id.clone(), def);
    }

    pub fn get_node_type(&self, id: &str) -> Option<&NodeTypeDefinition> {
        self.types.get(id)
    }

    /// All node types in registration order
    pub fn get_all_node_types(&self) -> Vec<&NodeTypeDefinition> {
        self.order.iter().filter_map(|id| self.types.get(id)).collect()
    }

    pub fn get_nodes_by_category(&self, category: NodeCategory) -> Vec<&NodeTypeDefinition> {
        self.get_all_node_types()
            .into_iter()
            .filter(|def| def.category == category)
            .collect()
    }

    /// Check if an id names a built-in type
    pub fn is_builtin(&self, id: &str) -> bool {
        self.types.get(id).is_some_and(|def| !def.is_custom())
    }

    /// Insert or replace a custom node type
    ///
    /// The stored definition is marked `isCustom`. Ids that belong to a
    /// built-in are rejected with [`Error::ProtectedNodeType`].
    pub fn register_node_type(&mut self, mut def: NodeTypeDefinition) -> Result<()> {
        if self.is_builtin(&def.id) {
            return Err(Error::ProtectedNodeType(def.id));
        }
        def.validate_ports()?;
        def.is_custom = Some(true);
        debug!(id = %def.id, category = %def.category, "registered node type");
        self.insert(def);
        Ok(())
    }

    /// Remove a custom node type; built-in and unknown ids return `false`
    pub fn unregister_node_type(&mut self, id: &str) -> bool {
        match self.types.get(id) {
            Some(def) if def.is_custom() => {
                self.types.remove(id);
                self.order.retain(|existing| existing != id);
                debug!(id, "unregistered node type");
                true
            }
            _ => false,
        }
    }

    /// Drop every custom type, leaving the built-ins
    pub fn teardown(&mut self) {
        self.types.retain(|_, def| !def.is_custom());
        let types = &self.types;
        self.order.retain(|id| types.contains_key(id));
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Ports of a node instance
    ///
    /// Instances of the `script` type that carry [`ScriptNodeData`] expose
    /// the registered schema ports plus their own custom ports. Every other
    /// type exposes its registered ports, whatever its instance data holds.
    pub fn ports_for(
        &self,
        node: &NodeInstance,
        direction: PortDirection,
    ) -> Result<Vec<NodePortDefinition>> {
        let def = self
            .get_node_type(&node.type_id)
            .ok_or_else(|| Error::UnknownNodeType(node.type_id.clone()))?;

        if def.id == SCRIPT_NODE_TYPE {
            if let Some(data) = ScriptNodeData::from_instance(node)? {
                return Ok(match direction {
                    PortDirection::Input => data.inputs_over(&def.inputs),
                    PortDirection::Output => data.outputs_over(&def.outputs),
                });
            }
        }

        Ok(match direction {
            PortDirection::Input => def.inputs.clone(),
            PortDirection::Output => def.outputs.clone(),
        })
    }

    pub fn input_ports_of(&self, node: &NodeInstance) -> Result<Vec<NodePortDefinition>> {
        self.ports_for(node, PortDirection::Input)
    }

    pub fn output_ports_of(&self, node: &NodeInstance) -> Result<Vec<NodePortDefinition>> {
        self.ports_for(node, PortDirection::Output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Position, PortType};

    #[test]
    fn test_seeded_with_builtins() {
        let registry = NodeRegistry::new();
        assert!(registry.get_node_type("on-start").is_some());
        assert!(registry.is_builtin("script"));
        assert_eq!(registry.get_all_node_types()[0].id, "on-start");
        assert!(NodeRegistry::empty().is_empty());
    }

    #[test]
    fn test_register_then_unregister_custom() {
        let mut registry = NodeRegistry::new();
        let def = NodeTypeDefinition::new("custom-1", "Custom One", NodeCategory::Custom);
        registry.register_node_type(def).unwrap();

        let stored = registry.get_node_type("custom-1").unwrap();
        assert!(stored.is_custom());

        assert!(registry.unregister_node_type("custom-1"));
        assert!(registry.get_node_type("custom-1").is_none());
        assert!(!registry.unregister_node_type("custom-1"));
    }

    #[test]
    fn test_builtin_is_protected() {
        let mut registry = NodeRegistry::new();
        assert!(!registry.unregister_node_type("on-start"));
        assert!(registry.get_node_type("on-start").is_some());

        let shadow = NodeTypeDefinition::new("on-start", "Shadow", NodeCategory::Event);
        assert_eq!(
            registry.register_node_type(shadow),
            Err(Error::ProtectedNodeType("on-start".to_string()))
        );
        assert_eq!(registry.get_node_type("on-start").unwrap().name, "On Start");
    }

    #[test]
    fn test_custom_overwrite_keeps_order() {
        let mut registry = NodeRegistry::new();
        let before = registry.len();
        registry
            .register_node_type(NodeTypeDefinition::new("c", "First", NodeCategory::Action))
            .unwrap();
        registry
            .register_node_type(NodeTypeDefinition::new("c", "Second", NodeCategory::Action))
            .unwrap();

        assert_eq!(registry.len(), before + 1);
        assert_eq!(registry.get_node_type("c").unwrap().name, "Second");
        assert_eq!(registry.get_all_node_types().last().unwrap().id, "c");
    }

    #[test]
    fn test_by_category_and_teardown() {
        let mut registry = NodeRegistry::new();
        let builtin_events = registry.get_nodes_by_category(NodeCategory::Event).len();
        registry
            .register_node_type(NodeTypeDefinition::new("on-door", "On Door", NodeCategory::Event))
            .unwrap();
        assert_eq!(
            registry.get_nodes_by_category(NodeCategory::Event).len(),
            builtin_events + 1
        );

        registry.teardown();
        assert!(registry.get_node_type("on-door").is_none());
        assert_eq!(
            registry.get_nodes_by_category(NodeCategory::Event).len(),
            builtin_events
        );
    }

    #[test]
    fn test_script_instance_ports() {
        let registry = NodeRegistry::new();
        let data = ScriptNodeData::default()
            .with_input(NodePortDefinition::new("speed", "", PortType::Number));
        let node = NodeInstance::new("s1", "script", Position::default())
            .with_data(serde_json::to_value(&data).unwrap());

        let inputs = registry.ports_for(&node, PortDirection::Input).unwrap();
        let ids: Vec<_> = inputs.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["in", "speed"]);
        assert_eq!(inputs[0].port_type, PortType::Flow);

        let bare = NodeInstance::new("s2", "script", Position::default());
        assert_eq!(registry.ports_for(&bare, PortDirection::Input).unwrap().len(), 1);
    }

    #[test]
    fn test_shared_registry() {
        let shared = NodeRegistry::shared();
        let other = Rc::clone(&shared);
        other
            .borrow_mut()
            .register_node_type(NodeTypeDefinition::new("x", "X", NodeCategory::Data))
            .unwrap();
        assert!(shared.borrow().get_node_type("x").is_some());
    }
}
