use std::collections::BTreeMap;

pub type TaskId = i64;
pub type EventId = i64;

/// ACL/ownership annotation pair: literal names to add, and workitem field
/// names whose current values are concatenated in (spec §4.4).
#[derive(Clone, Debug, Default)]
pub struct AccessAnnotation {
    pub names: Vec<String>,
    pub fields: Vec<String>,
}

impl AccessAnnotation {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.fields.is_empty()
    }
}

/// The ACL annotation bag shared by Task and Event nodes (spec §3.2).
#[derive(Clone, Debug, Default)]
pub struct AclAnnotations {
    pub update_acl: bool,
    pub read_access: AccessAnnotation,
    pub write_access: AccessAnnotation,
    pub owner: AccessAnnotation,
}

/// A BPMN Task node — a resting state of a workitem (spec §3.2, GLOSSARY).
#[derive(Clone, Debug)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub workflow_group: String,
    pub workflow_status: String,
    pub acl: AclAnnotations,
    pub data_objects: BTreeMap<String, String>,
}

/// Where control flow goes after an Event or a gateway edge resolves.
#[derive(Clone, Debug)]
pub enum Successor {
    Task(TaskId),
    ConditionalGateway(String),
    SplitGateway(String),
}

/// A BPMN Event node — a transition out of a Task (spec §3.2, GLOSSARY).
#[derive(Clone, Debug)]
pub struct WorkflowEvent {
    pub task_id: TaskId,
    pub event_id: EventId,
    pub name: String,
    pub successor: Successor,
    /// Plugin names to run, in registration order on top of the kernel's
    /// globally registered chain (spec §4 GLOSSARY "Adapter").
    pub adapters: Vec<String>,
    pub mail_subject: Option<String>,
    pub mail_body: Option<String>,
    pub mail_inactive: bool,
    /// Embedded rule script, evaluated by the Rule Engine (spec §4.3).
    pub rule_script: Option<String>,
    pub acl: AclAnnotations,
    /// Event id to automatically chain via `ACTIVITYIDLIST` (spec §4.1 step 5).
    pub follow_up_event: Option<EventId>,
}

/// One outgoing branch of a gateway.
#[derive(Clone, Debug)]
pub struct GatewayEdge {
    /// `None` marks the mandatory else-branch of a conditional gateway.
    pub condition_script: Option<String>,
    pub target: Successor,
}

/// A conditional (exclusive) gateway: first true edge wins, else is
/// mandatory (spec §3.2).
#[derive(Clone, Debug)]
pub struct ConditionalGateway {
    pub id: String,
    pub edges: Vec<GatewayEdge>,
    pub else_edge: GatewayEdge,
}

/// An inclusive-split gateway: every true edge spawns a sibling workitem,
/// the main workitem follows `primary` (spec §3.2).
#[derive(Clone, Debug)]
pub struct SplitGateway {
    pub id: String,
    pub primary: GatewayEdge,
    pub siblings: Vec<GatewayEdge>,
}

/// Top-level model profile (spec §3.2).
#[derive(Clone, Debug)]
pub struct Definition {
    pub version: String,
    pub groups: Vec<String>,
}

/// A versioned BPMN graph (spec §3.2).
#[derive(Clone, Debug)]
pub struct BpmnModel {
    pub definition: Definition,
    pub tasks: BTreeMap<TaskId, Task>,
    pub events: BTreeMap<(TaskId, EventId), WorkflowEvent>,
    pub conditional_gateways: BTreeMap<String, ConditionalGateway>,
    pub split_gateways: BTreeMap<String, SplitGateway>,
}

impl BpmnModel {
    pub fn version(&self) -> &str {
        &self.definition.version
    }
}
