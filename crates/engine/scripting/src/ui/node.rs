//! UI definition trees built by the `ui.*` factories

use super::catalog::component;
use crate::{Error, Map, Result, Value};
use serde::{Deserialize, Serialize};

/// Field marking a table as a UI definition
pub const NODE_MARKER: &str = "__ui";

/// One node of a declarative UI tree
///
/// Props may hold [`crate::Callable`] handles (event callbacks); those are
/// only valid until the next UI run of the same runtime.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UiNode {
    /// Component tag, one of [`crate::ui::COMPONENTS`]
    #[serde(rename = "type")]
    pub tag: String,
    #[serde(default)]
    pub props: Map,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<UiNode>>,
}

impl UiNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: UiNode) -> Self {
        self.children.get_or_insert_with(Vec::new).push(child);
        self
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    /// Children, empty when the node has none
    pub fn children(&self) -> &[UiNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Read a definition produced by a factory
    ///
    /// Returns `None` for values that are not marked as UI definitions.
    pub fn from_value(value: &Value) -> Result<Option<UiNode>> {
        if !is_node_value(value) {
            return Ok(None);
        }

        let tag = match value.get("type") {
            Some(Value::String(tag)) => tag.clone(),
            _ => return Err(Error::Marshal("UI node without a type tag".to_string())),
        };

        let props = match value.get("props") {
            None | Some(Value::Nil) => Map::new(),
            Some(Value::Map(props)) => props.clone(),
            Some(empty) if empty.is_empty_table() => Map::new(),
            Some(other) => {
                return Err(Error::Marshal(format!(
                    "props of '{}' must be a table, got {}",
                    tag,
                    other.type_name()
                )))
            }
        };

        let children = match value.get("children") {
            None | Some(Value::Nil) => None,
            Some(Value::Array(items)) if items.is_empty() => None,
            Some(Value::Array(items)) => {
                let mut children = Vec::with_capacity(items.len());
                for item in items {
                    let child = UiNode::from_value(item)?.ok_or_else(|| {
                        Error::Marshal(format!(
                            "child of '{}' is a {}, not a UI node",
                            tag,
                            item.type_name()
                        ))
                    })?;
                    children.push(child);
                }
                Some(children)
            }
            Some(empty) if empty.is_empty_table() => None,
            Some(other) => {
                return Err(Error::Marshal(format!(
                    "children of '{}' must be a list, got {}",
                    tag,
                    other.type_name()
                )))
            }
        };

        Ok(Some(UiNode {
            tag,
            props,
            children,
        }))
    }

    /// Marked table form, as handed to scripts
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(NODE_MARKER.to_string(), Value::Bool(true));
        map.insert("type".to_string(), Value::from(self.tag.as_str()));
        map.insert("props".to_string(), Value::Map(self.props.clone()));
        if let Some(children) = &self.children {
            map.insert(
                "children".to_string(),
                Value::Array(children.iter().map(UiNode::to_value).collect()),
            );
        }
        Value::Map(map)
    }

    /// JSON for renderers; callbacks render as `"<function>"`
    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        object.insert("type".to_string(), serde_json::Value::from(self.tag.as_str()));
        object.insert("props".to_string(), Value::Map(self.props.clone()).to_json());
        if let Some(children) = &self.children {
            object.insert(
                "children".to_string(),
                serde_json::Value::Array(children.iter().map(UiNode::to_json).collect()),
            );
        }
        serde_json::Value::Object(object)
    }

    /// First node with the given tag, depth-first, including self
    pub fn find(&self, tag: &str) -> Option<&UiNode> {
        if self.tag == tag {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(tag))
    }

    /// All nodes in pre-order
    pub fn walk(&self) -> Vec<&UiNode> {
        let mut nodes = vec![self];
        for child in self.children() {
            nodes.extend(child.walk());
        }
        nodes
    }
}

/// Check if a value carries the UI definition marker
pub fn is_node_value(value: &Value) -> bool {
    matches!(value.get(NODE_MARKER), Some(Value::Bool(true)))
}

/// Factory body shared by every `ui.<tag>` function
///
/// Arguments are `(props?, children?)`:
/// - a scalar first argument becomes `{ value = <scalar> }`
/// - a node or list of nodes as the first argument is taken as children
/// - a single node as children is wrapped in a list
/// - leaf components (`button`, `text`, ...) reject children
pub(crate) fn build_node(tag: &str, args: Vec<Value>) -> Result<Value> {
    let mut args = args.into_iter();
    let first = args.next().unwrap_or_default();
    let second = args.next().unwrap_or_default();

    let (props, children) = match first {
        node if is_node_value(&node) => (Map::new(), node),
        Value::Nil => (Map::new(), second),
        Value::Map(map) => (map, second),
        Value::Array(items) if items.is_empty() => (Map::new(), second),
        Value::Array(items) if items.iter().all(is_node_value) => (Map::new(), Value::Array(items)),
        Value::Array(_) => {
            return Err(Error::Runtime(format!(
                "ui.{}: first argument must be props or child nodes",
                tag
            )))
        }
        Value::Function(_) | Value::Callable(_) => {
            return Err(Error::Runtime(format!(
                "ui.{}: a function cannot be used as props",
                tag
            )))
        }
        scalar => {
            let mut props = Map::new();
            props.insert("value".to_string(), scalar);
            (props, second)
        }
    };

    let children = normalize_children(tag, children)?;
    if !children.is_empty() && component(tag).is_some_and(|info| !info.children) {
        return Err(Error::Runtime(format!("ui.{}: this component takes no children", tag)));
    }

    let mut node = Map::new();
    node.insert(NODE_MARKER.to_string(), Value::Bool(true));
    node.insert("type".to_string(), Value::from(tag));
    node.insert("props".to_string(), Value::Map(props));
    if !children.is_empty() {
        node.insert("children".to_string(), Value::Array(children));
    }
    Ok(Value::Map(node))
}

fn normalize_children(tag: &str, children: Value) -> Result<Vec<Value>> {
    let items = match children {
        Value::Nil => return Ok(Vec::new()),
        node if is_node_value(&node) => return Ok(vec![node]),
        Value::Array(items) => items,
        empty if empty.is_empty_table() => return Ok(Vec::new()),
        other => {
            return Err(Error::Runtime(format!(
                "ui.{}: children must be a node or a list of nodes, got {}",
                tag,
                other.type_name()
            )))
        }
    };

    if let Some(position) = items.iter().position(|item| !is_node_value(item)) {
        return Err(Error::Runtime(format!(
            "ui.{}: child {} is a {}, not a UI node",
            tag,
            position + 1,
            items[position].type_name()
        )));
    }
    Ok(items)
}
