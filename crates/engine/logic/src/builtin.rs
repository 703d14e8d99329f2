//! Built-in node types seeded into every registry

use crate::{NodeCategory, NodePortDefinition, NodeTypeDefinition, PortType};

/// Id of the user-scriptable node type
pub const SCRIPT_NODE_TYPE: &str = "script";

fn flow_in() -> NodePortDefinition {
    NodePortDefinition::flow("in", "In")
}

fn flow_out() -> NodePortDefinition {
    NodePortDefinition::flow("out", "Out")
}

fn data(id: &str, label: &str, port_type: PortType) -> NodePortDefinition {
    NodePortDefinition::new(id, label, port_type)
}

fn event(id: &str, name: &str, icon: &str, description: &str) -> NodeTypeDefinition {
    NodeTypeDefinition::new(id, name, NodeCategory::Event)
        .with_icon(icon)
        .with_description(description)
        .output(flow_out())
}

fn action(id: &str, name: &str, icon: &str, description: &str) -> NodeTypeDefinition {
    NodeTypeDefinition::new(id, name, NodeCategory::Action)
        .with_icon(icon)
        .with_description(description)
        .input(flow_in())
        .output(flow_out())
}

fn data_node(id: &str, name: &str, icon: &str, description: &str) -> NodeTypeDefinition {
    NodeTypeDefinition::new(id, name, NodeCategory::Data)
        .with_icon(icon)
        .with_description(description)
}

/// The built-in catalogue, in display order
pub fn builtin_node_types() -> Vec<NodeTypeDefinition> {
    vec![
        // Events
        event("on-start", "On Start", "play", "Fires once when the scene starts"),
        event("on-update", "On Update", "refresh-cw", "Fires every frame")
            .output(data("deltaTime", "Delta Time", PortType::Number)),
        event("on-collision", "On Collision", "zap", "Fires when the entity collides")
            .output(data("other", "Other", PortType::Entity)),
        event("on-key-press", "On Key Press", "keyboard", "Fires when a key is pressed")
            .output(data("key", "Key", PortType::String)),
        event("on-signal", "On Signal", "radio", "Fires when a named signal is emitted")
            .output(data("signal", "Signal", PortType::String))
            .output(data("data", "Data", PortType::Any)),
        // Actions
        action("set-position", "Set Position", "move", "Moves an entity to a position")
            .input(data("entity", "Entity", PortType::Entity))
            .input(data("position", "Position", PortType::Position).required()),
        action("move-by", "Move By", "navigation", "Offsets an entity's position")
            .input(data("entity", "Entity", PortType::Entity))
            .input(data("offset", "Offset", PortType::Position).required()),
        action("spawn-entity", "Spawn Entity", "plus-square", "Creates an entity from a prefab")
            .input(data("prefab", "Prefab", PortType::String).required())
            .input(data("position", "Position", PortType::Position))
            .output(data("entity", "Entity", PortType::Entity)),
        action("destroy-entity", "Destroy Entity", "trash", "Removes an entity from the scene")
            .input(data("entity", "Entity", PortType::Entity)),
        action("play-sound", "Play Sound", "volume-2", "Plays a sound asset")
            .input(data("sound", "Sound", PortType::String).required())
            .input(data("volume", "Volume", PortType::Number)),
        action("log", "Log", "terminal", "Writes a message to the console")
            .input(data("message", "Message", PortType::Any)),
        action("emit-signal", "Emit Signal", "send", "Broadcasts a named signal")
            .input(data("signal", "Signal", PortType::String).required())
            .input(data("data", "Data", PortType::Any)),
        // Conditions
        NodeTypeDefinition::new("branch", "Branch", NodeCategory::Condition)
            .with_icon("git-branch")
            .with_description("Routes flow by a boolean condition")
            .input(flow_in())
            .input(data("condition", "Condition", PortType::Boolean).required())
            .output(NodePortDefinition::flow("true", "True"))
            .output(NodePortDefinition::flow("false", "False")),
        NodeTypeDefinition::new("compare", "Compare", NodeCategory::Condition)
            .with_icon("divide")
            .with_description("Compares two values")
            .input(data("a", "A", PortType::Any))
            .input(data("b", "B", PortType::Any))
            .input(data("operator", "Operator", PortType::String))
            .output(data("result", "Result", PortType::Boolean)),
        NodeTypeDefinition::new("has-tag", "Has Tag", NodeCategory::Condition)
            .with_icon("tag")
            .with_description("Checks whether an entity carries a tag")
            .input(data("entity", "Entity", PortType::Entity))
            .input(data("tag", "Tag", PortType::String).required())
            .output(data("result", "Result", PortType::Boolean)),
        // Data
        data_node("number", "Number", "hash", "A constant number")
            .output(data("value", "Value", PortType::Number)),
        data_node("string", "String", "type", "A constant string")
            .output(data("value", "Value", PortType::String)),
        data_node("boolean", "Boolean", "toggle-left", "A constant boolean")
            .output(data("value", "Value", PortType::Boolean)),
        data_node("get-position", "Get Position", "crosshair", "Reads an entity's position")
            .input(data("entity", "Entity", PortType::Entity))
            .output(data("position", "Position", PortType::Position)),
        data_node("get-variable", "Get Variable", "box", "Reads a graph variable")
            .input(data("name", "Name", PortType::String).required())
            .output(data("value", "Value", PortType::Any)),
        data_node("set-variable", "Set Variable", "edit", "Writes a graph variable")
            .input(flow_in())
            .input(data("name", "Name", PortType::String).required())
            .input(data("value", "Value", PortType::Any))
            .output(flow_out()),
        data_node("math", "Math", "percent", "Applies an arithmetic operator")
            .input(data("a", "A", PortType::Number))
            .input(data("b", "B", PortType::Number))
            .input(data("operator", "Operator", PortType::String))
            .output(data("result", "Result", PortType::Number)),
        // Flow
        NodeTypeDefinition::new("sequence", "Sequence", NodeCategory::Flow)
            .with_icon("list")
            .with_description("Runs its outputs in order")
            .input(flow_in())
            .output(NodePortDefinition::flow("then0", "Then 0"))
            .output(NodePortDefinition::flow("then1", "Then 1")),
        NodeTypeDefinition::new("delay", "Delay", NodeCategory::Flow)
            .with_icon("clock")
            .with_description("Continues after a number of seconds")
            .input(flow_in())
            .input(data("seconds", "Seconds", PortType::Number))
            .output(flow_out()),
        NodeTypeDefinition::new("loop", "Loop", NodeCategory::Flow)
            .with_icon("repeat")
            .with_description("Runs its body a fixed number of times")
            .input(flow_in())
            .input(data("count", "Count", PortType::Number))
            .output(NodePortDefinition::flow("body", "Body"))
            .output(data("index", "Index", PortType::Number))
            .output(NodePortDefinition::flow("done", "Done")),
        // Custom
        NodeTypeDefinition::new(SCRIPT_NODE_TYPE, "Script", NodeCategory::Custom)
            .with_icon("code")
            .with_description("Runs user-authored Lua with per-node ports and signals")
            .input(flow_in())
            .output(flow_out()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_ids_unique() {
        let types = builtin_node_types();
        let ids: HashSet<_> = types.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids.len(), types.len());
    }

    #[test]
    fn test_builtin_ports_valid() {
        for def in builtin_node_types() {
            assert!(def.validate_ports().is_ok(), "{} has duplicate ports", def.id);
            assert!(!def.is_custom());
        }
    }

    #[test]
    fn test_every_category_populated() {
        let types = builtin_node_types();
        for category in NodeCategory::ALL {
            assert!(types.iter().any(|t| t.category == category), "{}", category);
        }
    }
}
