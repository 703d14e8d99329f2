//! Running script-node bodies through the bridge
//!
//! A body is compiled once per node instance into a Lua chunk whose varargs
//! are `(inputs, ctx, entityId, emit, scene, events, timers)` and can then
//! be invoked with resolved inputs. Scheduling (when a node fires, how outputs
//! propagate along edges) belongs to the graph executor, not to this module.

use crate::{Bridge, Callable, Error, Map, NativeFunction, Result, Value};
use logic::{
    validate_emit, PortType, ScriptInvocation, ScriptNodeData, ServiceNamespace, SignalEmission,
    SCRIPT_PARAMS,
};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

/// Host functions exposed to a body as `scene`, `events` and `timers`
#[derive(Debug, Clone, Default)]
pub struct ScriptServices {
    scene: Map,
    events: Map,
    timers: Map,
}

impl ScriptServices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function to one namespace
    pub fn with(
        mut self,
        namespace: ServiceNamespace,
        name: impl Into<String>,
        function: NativeFunction,
    ) -> Self {
        self.namespace_mut(namespace)
            .insert(name.into(), Value::Function(function));
        self
    }

    pub fn namespace(&self, namespace: ServiceNamespace) -> &Map {
        match namespace {
            ServiceNamespace::Scene => &self.scene,
            ServiceNamespace::Events => &self.events,
            ServiceNamespace::Timers => &self.timers,
        }
    }

    fn namespace_mut(&mut self, namespace: ServiceNamespace) -> &mut Map {
        match namespace {
            ServiceNamespace::Scene => &mut self.scene,
            ServiceNamespace::Events => &mut self.events,
            ServiceNamespace::Timers => &mut self.timers,
        }
    }
}

/// What one body invocation produced
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScriptNodeOutcome {
    /// Values for declared data outputs, keyed by port id
    pub outputs: Map,
    /// Signals emitted through `emit`, in call order
    pub emissions: Vec<SignalEmission>,
}

/// A compiled script-node body
///
/// The body is held as a function handle, so the bridge should not be shared
/// with a [`crate::UiRuntime`], which releases handles on every run.
pub struct ScriptNodeRunner {
    bridge: Bridge,
    node_id: String,
    data: Rc<ScriptNodeData>,
    body: Callable,
}

impl ScriptNodeRunner {
    /// Validate the node's declarations and compile its body
    pub fn compile(bridge: &Bridge, node_id: impl Into<String>, data: ScriptNodeData) -> Result<Self> {
        let node_id = node_id.into();
        data.validate()?;

        // The body is its own chunk taking the parameters as varargs.
        // Kept on the header line so reported line numbers match the source.
        let source = format!("local {} = ...; {}", SCRIPT_PARAMS.join(", "), data.code);
        let body = bridge.compile_named(&source, &format!("node:{}", node_id))?;

        debug!(node = %node_id, "compiled script node");
        Ok(Self {
            bridge: bridge.clone(),
            node_id,
            data: Rc::new(data),
            body,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn data(&self) -> &ScriptNodeData {
        &self.data
    }

    /// Run the body once
    pub fn invoke(
        &self,
        invocation: &ScriptInvocation,
        services: &ScriptServices,
    ) -> Result<ScriptNodeOutcome> {
        invocation.validate(&self.data)?;

        let emissions = Rc::new(RefCell::new(Vec::new()));
        let args = vec![
            Value::Map(
                invocation
                    .inputs
                    .iter()
                    .map(|(port, value)| (port.clone(), Value::from(value.clone())))
                    .collect(),
            ),
            self.context(invocation),
            Value::from(invocation.entity_id.clone()),
            Value::Function(self.emitter(Rc::clone(&emissions))),
            Value::Map(services.namespace(ServiceNamespace::Scene).clone()),
            Value::Map(services.namespace(ServiceNamespace::Events).clone()),
            Value::Map(services.namespace(ServiceNamespace::Timers).clone()),
        ];

        let result = self.bridge.invoke(&self.body, args)?;
        let outputs = self.collect_outputs(result)?;
        let emissions = emissions.take();

        debug!(
            node = %self.node_id,
            run_id = invocation.context.run_id(),
            outputs = outputs.len(),
            emissions = emissions.len(),
            "script node invoked"
        );
        Ok(ScriptNodeOutcome { outputs, emissions })
    }

    fn context(&self, invocation: &ScriptInvocation) -> Value {
        let mut ctx = Map::new();
        ctx.insert(
            "runId".to_string(),
            Value::Int(invocation.context.run_id() as i64),
        );
        ctx.insert("nodeId".to_string(), Value::from(invocation.node_id.as_str()));
        Value::Map(ctx)
    }

    /// `emit(signal, data?)`, checked against the declared signals
    fn emitter(&self, sink: Rc<RefCell<Vec<SignalEmission>>>) -> NativeFunction {
        let data = Rc::clone(&self.data);
        NativeFunction::new(move |args: Vec<Value>| -> Result<Value> {
            let signal = match args.first() {
                Some(Value::String(signal)) => signal.clone(),
                _ => return Err(Error::Runtime("emit: signal must be a string".to_string())),
            };
            validate_emit(&data, &signal)?;
            let payload = args.get(1).filter(|v| !v.is_nil()).map(Value::to_json);
            sink.borrow_mut().push(SignalEmission {
                signal,
                data: payload,
            });
            Ok(Value::Nil)
        })
    }

    /// Keep returned values for declared data outputs
    fn collect_outputs(&self, result: Value) -> Result<Map> {
        let returned = match result {
            Value::Nil => return Ok(Map::new()),
            Value::Map(map) => map,
            empty if empty.is_empty_table() => return Ok(Map::new()),
            other => {
                return Err(Error::Runtime(format!(
                    "script node '{}' must return a table of outputs, got {}",
                    self.node_id,
                    other.type_name()
                )))
            }
        };

        let declared = self.data.merged_outputs();
        let mut outputs = Map::new();
        for (port, value) in returned {
            let is_data_output = declared
                .iter()
                .any(|p| p.id == port && p.port_type != PortType::Flow);
            if is_data_output {
                outputs.insert(port, value);
            } else {
                warn!(node = %self.node_id, port = %port, "dropping undeclared script output");
            }
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use logic::{ContextHandle, NodePortDefinition};
    use serde_json::json;

    fn mover() -> ScriptNodeData {
        ScriptNodeData::new(
            "if inputs.speed > 0 then emit('moved', { by = inputs.speed }) end\n\
             return { distance = inputs.speed * 2, junk = 1 }",
        )
        .with_input(NodePortDefinition::new("speed", "Speed", PortType::Number).required())
        .with_output(NodePortDefinition::new("distance", "Distance", PortType::Number))
        .emits("moved")
    }

    #[test]
    fn test_invoke_collects_outputs_and_emissions() {
        let bridge = Bridge::new().unwrap();
        let runner = ScriptNodeRunner::compile(&bridge, "n1", mover()).unwrap();
        let invocation = ScriptInvocation::new("n1", ContextHandle::new(7)).with_input("speed", json!(3));

        let outcome = runner.invoke(&invocation, &ScriptServices::new()).unwrap();
        assert_eq!(outcome.outputs.get("distance"), Some(&Value::Int(6)));
        assert!(outcome.outputs.get("junk").is_none());
        assert_eq!(
            outcome.emissions,
            vec![SignalEmission {
                signal: "moved".to_string(),
                data: Some(json!({ "by": 3 })),
            }]
        );
    }

    #[test]
    fn test_syntax_error_at_compile() {
        let bridge = Bridge::new().unwrap();
        let err = ScriptNodeRunner::compile(&bridge, "bad", ScriptNodeData::new("retur 1")).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn test_undeclared_emit_fails() {
        let bridge = Bridge::new().unwrap();
        let data = ScriptNodeData::new("emit('other')");
        let runner = ScriptNodeRunner::compile(&bridge, "n2", data).unwrap();
        let err = runner
            .invoke(&ScriptInvocation::new("n2", ContextHandle::new(1)), &ScriptServices::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
        assert!(err.message().contains("other"));
    }

    #[test]
    fn test_missing_input_rejected_before_run() {
        let bridge = Bridge::new().unwrap();
        let runner = ScriptNodeRunner::compile(&bridge, "n1", mover()).unwrap();
        let err = runner
            .invoke(&ScriptInvocation::new("n1", ContextHandle::new(1)), &ScriptServices::new())
            .unwrap_err();
        assert!(matches!(err, Error::Graph(logic::Error::MissingInput(port)) if port == "speed"));
    }

    #[test]
    fn test_services_and_context() {
        let bridge = Bridge::new().unwrap();
        let data = ScriptNodeData::new("return { result = scene.find(entityId) .. ':' .. ctx.runId }")
            .with_output(NodePortDefinition::new("result", "", PortType::String));
        let runner = ScriptNodeRunner::compile(&bridge, "n3", data).unwrap();
        let services = ScriptServices::new().with(
            ServiceNamespace::Scene,
            "find",
            NativeFunction::new(|args: Vec<Value>| -> Result<Value> {
                Ok(Value::from(format!("found {}", args[0])))
            }),
        );
        let invocation = ScriptInvocation::new("n3", ContextHandle::new(4)).with_entity("door");

        let outcome = runner.invoke(&invocation, &services).unwrap();
        assert_eq!(outcome.outputs.get("result"), Some(&Value::from("found door:4")));
    }

    #[test]
    fn test_stray_end_cannot_escape_the_body() {
        let bridge = Bridge::new().unwrap();
        let data = ScriptNodeData::new("end escaped = true return function() end --");
        let err = ScriptNodeRunner::compile(&bridge, "n4", data).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(bridge.get_global("escaped").unwrap(), Value::Nil);
    }

    #[test]
    fn test_body_runs_on_every_invoke() {
        let bridge = Bridge::new().unwrap();
        let data = ScriptNodeData::new("runs = (runs or 0) + 1 return {}");
        let runner = ScriptNodeRunner::compile(&bridge, "n5", data).unwrap();
        assert_eq!(bridge.get_global("runs").unwrap(), Value::Nil);

        let invocation = ScriptInvocation::new("n5", ContextHandle::new(1));
        runner.invoke(&invocation, &ScriptServices::new()).unwrap();
        runner.invoke(&invocation, &ScriptServices::new()).unwrap();
        assert_eq!(bridge.get_global("runs").unwrap(), Value::Int(2));
    }
}
