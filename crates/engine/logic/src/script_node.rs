//! Script nodes and the contract their bodies are invoked with
//!
//! A script node is an instance of the `script` node type whose `data` is a
//! [`ScriptNodeData`] record. The registry schema for the type stays fixed
//! (one flow input, one flow output); each instance adds its own ports and
//! declares the signals it listens for and emits.
//!
//! The body is Lua source. It is invoked as a function of
//! `(inputs, ctx, entityId, emit, scene, events, timers)`; this module only
//! describes and validates that call, it does not run it.

use crate::node_type::check_unique_ports;
use crate::{Error, NodeInstance, NodePortDefinition, PortType, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DEFAULT_CODE: &str = "-- inputs: resolved input values\n\
-- emit(signal, data): broadcast a declared signal\n\
return {}\n";

/// Per-instance payload of a script node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptNodeData {
    /// Lua body, kept as opaque text
    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub custom_inputs: Vec<NodePortDefinition>,

    #[serde(default)]
    pub custom_outputs: Vec<NodePortDefinition>,

    /// Signals this node reacts to
    #[serde(default)]
    pub listen_signals: Vec<String>,

    /// Signals this node may emit
    #[serde(default)]
    pub emit_signals: Vec<String>,
}

impl Default for ScriptNodeData {
    fn default() -> Self {
        Self {
            code: DEFAULT_CODE.to_string(),
            custom_inputs: Vec::new(),
            custom_outputs: Vec::new(),
            listen_signals: Vec::new(),
            emit_signals: Vec::new(),
        }
    }
}

impl ScriptNodeData {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Default::default()
        }
    }

    pub fn with_input(mut self, port: NodePortDefinition) -> Self {
        self.custom_inputs.push(port);
        self
    }

    pub fn with_output(mut self, port: NodePortDefinition) -> Self {
        self.custom_outputs.push(port);
        self
    }

    pub fn listens(mut self, signal: impl Into<String>) -> Self {
        self.listen_signals.push(signal.into());
        self
    }

    pub fn emits(mut self, signal: impl Into<String>) -> Self {
        self.emit_signals.push(signal.into());
        self
    }

    /// Read the payload out of a node instance's free-form data
    ///
    /// `Ok(None)` when the instance carries no data at all.
    pub fn from_instance(node: &NodeInstance) -> Result<Option<Self>> {
        if node.data.is_null() {
            return Ok(None);
        }
        serde_json::from_value(node.data.clone())
            .map(Some)
            .map_err(|e| Error::InvalidNodeData {
                node: node.id.clone(),
                message: e.to_string(),
            })
    }

    /// Base flow input shared by every script node
    pub fn base_inputs() -> Vec<NodePortDefinition> {
        vec![NodePortDefinition::flow("in", "In")]
    }

    /// Base flow output shared by every script node
    pub fn base_outputs() -> Vec<NodePortDefinition> {
        vec![NodePortDefinition::flow("out", "Out")]
    }

    /// Base inputs followed by this instance's custom inputs
    pub fn merged_inputs(&self) -> Vec<NodePortDefinition> {
        self.inputs_over(&Self::base_inputs())
    }

    /// Base outputs followed by this instance's custom outputs
    pub fn merged_outputs(&self) -> Vec<NodePortDefinition> {
        self.outputs_over(&Self::base_outputs())
    }

    /// The given schema inputs followed by this instance's custom inputs
    pub fn inputs_over(&self, schema: &[NodePortDefinition]) -> Vec<NodePortDefinition> {
        merge_ports(schema.to_vec(), &self.custom_inputs)
    }

    /// The given schema outputs followed by this instance's custom outputs
    pub fn outputs_over(&self, schema: &[NodePortDefinition]) -> Vec<NodePortDefinition> {
        merge_ports(schema.to_vec(), &self.custom_outputs)
    }

    /// Check the instance's port ids are unique, including the base ports
    pub fn validate(&self) -> Result<()> {
        let inputs = Self::base_inputs();
        let outputs = Self::base_outputs();
        check_unique_ports(
            "script node",
            inputs
                .iter()
                .chain(outputs.iter())
                .chain(self.custom_inputs.iter())
                .chain(self.custom_outputs.iter()),
        )
    }

    pub fn declares_emit(&self, signal: &str) -> bool {
        self.emit_signals.iter().any(|s| s == signal)
    }

    pub fn listens_to(&self, signal: &str) -> bool {
        self.listen_signals.iter().any(|s| s == signal)
    }
}

/// Merge base and custom ports; custom ports that reuse a base id are skipped
fn merge_ports(
    mut base: Vec<NodePortDefinition>,
    custom: &[NodePortDefinition],
) -> Vec<NodePortDefinition> {
    for port in custom {
        if !base.iter().any(|p| p.id == port.id) {
            base.push(port.clone());
        }
    }
    base
}

/// Opaque per-run handle passed to a script body as `ctx`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextHandle(u64);

impl ContextHandle {
    pub fn new(run_id: u64) -> Self {
        Self(run_id)
    }

    pub fn run_id(&self) -> u64 {
        self.0
    }
}

/// Built-in service namespaces handed to every script body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceNamespace {
    /// Scene mutation
    Scene,
    /// Event bus
    Events,
    Timers,
}

impl ServiceNamespace {
    pub const ALL: [ServiceNamespace; 3] = [
        ServiceNamespace::Scene,
        ServiceNamespace::Events,
        ServiceNamespace::Timers,
    ];

    /// Name of the parameter the namespace is bound to
    pub fn name(&self) -> &'static str {
        match self {
            ServiceNamespace::Scene => "scene",
            ServiceNamespace::Events => "events",
            ServiceNamespace::Timers => "timers",
        }
    }
}

/// Parameter names of a script body, in call order
pub const SCRIPT_PARAMS: [&str; 7] = [
    "inputs", "ctx", "entityId", "emit", "scene", "events", "timers",
];

/// A signal emitted by a script body through `emit(signal, data?)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEmission {
    pub signal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Everything a single invocation of a script body receives
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptInvocation {
    /// Id of the node instance being invoked
    pub node_id: String,
    /// Resolved input values keyed by port id (read-only to the script)
    pub inputs: BTreeMap<String, serde_json::Value>,
    pub context: ContextHandle,
    /// Entity the node's graph is attached to
    pub entity_id: Option<String>,
}

impl ScriptInvocation {
    pub fn new(node_id: impl Into<String>, context: ContextHandle) -> Self {
        Self {
            node_id: node_id.into(),
            inputs: BTreeMap::new(),
            context,
            entity_id: None,
        }
    }

    pub fn with_input(mut self, port: impl Into<String>, value: serde_json::Value) -> Self {
        self.inputs.insert(port.into(), value);
        self
    }

    pub fn with_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Check the resolved inputs against the node's declared data inputs
    pub fn validate(&self, data: &ScriptNodeData) -> Result<()> {
        let ports = data.merged_inputs();
        for key in self.inputs.keys() {
            let declared = ports
                .iter()
                .any(|p| p.id == *key && p.port_type != PortType::Flow);
            if !declared {
                return Err(Error::UnknownInput(key.clone()));
            }
        }
        for port in ports.iter().filter(|p| p.is_required()) {
            if !self.inputs.contains_key(&port.id) {
                return Err(Error::MissingInput(port.id.clone()));
            }
        }
        Ok(())
    }
}

/// Check that a signal emitted by a body was declared in `emitSignals`
pub fn validate_emit(data: &ScriptNodeData, signal: &str) -> Result<()> {
    if data.declares_emit(signal) {
        Ok(())
    } else {
        Err(Error::UndeclaredSignal(signal.to_string()))
    }
}
