//! Closed catalogue of UI component tags

use crate::{Map, Value};

/// Group a component tag belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentGroup {
    Layout,
    Display,
    Input,
    Data,
    Feedback,
}

impl ComponentGroup {
    pub fn name(&self) -> &'static str {
        match self {
            ComponentGroup::Layout => "layout",
            ComponentGroup::Display => "display",
            ComponentGroup::Input => "input",
            ComponentGroup::Data => "data",
            ComponentGroup::Feedback => "feedback",
        }
    }
}

impl std::fmt::Display for ComponentGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Metadata for one component tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentInfo {
    pub tag: &'static str,
    pub group: ComponentGroup,
    pub description: &'static str,
    /// Whether renderers lay out children for this tag
    pub children: bool,
    /// Documented props
    pub props: &'static [&'static str],
}

impl ComponentInfo {
    /// Metadata as a script-visible table
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("tag".to_string(), Value::from(self.tag));
        map.insert("group".to_string(), Value::from(self.group.name()));
        map.insert("description".to_string(), Value::from(self.description));
        map.insert("children".to_string(), Value::Bool(self.children));
        map.insert(
            "props".to_string(),
            Value::Array(self.props.iter().map(|p| Value::from(*p)).collect()),
        );
        Value::Map(map)
    }
}

const fn layout(
    tag: &'static str,
    description: &'static str,
    props: &'static [&'static str],
) -> ComponentInfo {
    ComponentInfo {
        tag,
        group: ComponentGroup::Layout,
        description,
        children: true,
        props,
    }
}

const fn leaf(
    tag: &'static str,
    group: ComponentGroup,
    description: &'static str,
    props: &'static [&'static str],
) -> ComponentInfo {
    ComponentInfo {
        tag,
        group,
        description,
        children: false,
        props,
    }
}

/// Every known component, grouped in display order
pub const COMPONENTS: &[ComponentInfo] = &[
    // Layout
    layout("panel", "Titled container", &["title", "collapsible", "padding"]),
    layout("row", "Horizontal stack", &["gap", "align", "wrap"]),
    layout("column", "Vertical stack", &["gap", "align"]),
    layout("grid", "Fixed-column grid", &["columns", "gap"]),
    layout("stack", "Overlapping layers", &["align"]),
    layout("section", "Labelled group within a panel", &["title", "collapsed"]),
    leaf("divider", ComponentGroup::Layout, "Horizontal rule", &["label"]),
    leaf("spacer", ComponentGroup::Layout, "Flexible empty space", &["size"]),
    layout("tabs", "Tabbed pages; one child per tab", &["labels", "selected", "onChange"]),
    layout("scroll", "Scrollable region", &["height", "horizontal"]),
    // Display
    leaf("text", ComponentGroup::Display, "Body text", &["value", "color", "size", "weight"]),
    leaf("heading", ComponentGroup::Display, "Section heading", &["value", "level"]),
    leaf("image", ComponentGroup::Display, "Image from an asset path", &["src", "width", "height"]),
    leaf("icon", ComponentGroup::Display, "Named icon", &["name", "size", "color"]),
    leaf("badge", ComponentGroup::Display, "Small status label", &["value", "color"]),
    leaf("code", ComponentGroup::Display, "Monospace block", &["value", "language"]),
    // Input
    leaf("button", ComponentGroup::Input, "Clickable button", &["label", "variant", "disabled", "onClick"]),
    leaf("input", ComponentGroup::Input, "Single-line text field", &["value", "placeholder", "onChange"]),
    leaf("checkbox", ComponentGroup::Input, "Boolean toggle", &["label", "checked", "onChange"]),
    leaf("slider", ComponentGroup::Input, "Numeric range", &["value", "min", "max", "step", "onChange"]),
    leaf("select", ComponentGroup::Input, "Choice from options", &["value", "options", "onChange"]),
    leaf("colorPicker", ComponentGroup::Input, "Color chooser", &["value", "onChange"]),
    // Data
    leaf("table", ComponentGroup::Data, "Rows and columns", &["columns", "rows", "onSelect"]),
    leaf("list", ComponentGroup::Data, "Item list", &["items", "selected", "onSelect"]),
    leaf("keyValue", ComponentGroup::Data, "Label/value pairs", &["entries"]),
    // Feedback
    leaf("alert", ComponentGroup::Feedback, "Inline message", &["value", "level"]),
    leaf("progress", ComponentGroup::Feedback, "Progress bar", &["value", "max", "label"]),
    leaf("spinner", ComponentGroup::Feedback, "Busy indicator", &["label"]),
];

/// Look up a component by tag
pub fn component(tag: &str) -> Option<&'static ComponentInfo> {
    COMPONENTS.iter().find(|c| c.tag == tag)
}

/// All tags in catalogue order
pub fn component_tags() -> impl Iterator<Item = &'static str> {
    COMPONENTS.iter().map(|c| c.tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tags_unique() {
        let tags: HashSet<_> = component_tags().collect();
        assert_eq!(tags.len(), COMPONENTS.len());
    }

    #[test]
    fn test_lookup() {
        let button = component("button").unwrap();
        assert_eq!(button.group, ComponentGroup::Input);
        assert!(button.props.contains(&"onClick"));
        assert!(component("window").is_none());
    }

    #[test]
    fn test_info_value() {
        let info = component("panel").unwrap().to_value();
        assert_eq!(info.get("group"), Some(&Value::from("layout")));
        assert_eq!(info.get("children"), Some(&Value::Bool(true)));
    }
}
