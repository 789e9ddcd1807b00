//! Streaming BPMN 2.0 XML reader with Imixs-style extension attributes
//! (spec §6.4), generalized from the teacher's `quick-xml` compiler
//! front-end. Accepts both prefixed (`bpmn:task`) and default-namespace
//! (`task`) element names.
//!
//! Recognized extension schema (namespace prefix `imixs:`, tolerant of a
//! missing prefix):
//!
//! ```xml
//! <imixs:definition version="1.0.0" groups="Ticket,Order" />
//! <bpmn:task id="t100" imixs:processid="100" imixs:workflowgroup="Ticket"
//!            imixs:workflowstatus="New">
//!   <bpmn:extensionElements>
//!     <imixs:item name="keyupdateacl">true</imixs:item>
//!     <imixs:item name="namaddreadaccess">joe,sam</imixs:item>
//!   </bpmn:extensionElements>
//!   <bpmn:dataObject id="do1" name="SLA">24h</bpmn:dataObject>
//! </bpmn:task>
//! <bpmn:intermediateCatchEvent id="e10" imixs:processid="100"
//!            imixs:activityid="10" imixs:nextprocessid="200" />
//! <bpmn:exclusiveGateway id="gw1">
//!   <imixs:edge condition="a==1" target="task:200" />
//!   <imixs:else target="task:900" />
//! </bpmn:exclusiveGateway>
//! <bpmn:inclusiveGateway id="gw2">
//!   <imixs:edge primary="true" target="task:210" />
//!   <imixs:edge target="task:220" />
//! </bpmn:inclusiveGateway>
//! ```

use super::types::*;
use crate::error::{ModelErrorCode, WorkflowError};
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::DiGraph;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::{BTreeMap, HashMap};

type ParseResult<T> = Result<T, WorkflowError>;

fn invalid(id: impl Into<String>, msg: impl std::fmt::Display) -> WorkflowError {
    WorkflowError::model(ModelErrorCode::InvalidModelEntry, format!("[{}] {}", id.into(), msg))
}

fn local_name(qualified: &[u8]) -> String {
    let s = String::from_utf8_lossy(qualified);
    match s.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => s.to_string(),
    }
}

fn attr_value(tag: &BytesStart, local: &str) -> Option<String> {
    tag.attributes().flatten().find_map(|a| {
        if local_name(a.key.as_ref()) == local {
            a.unescape_value().ok().map(|v| v.into_owned())
        } else {
            None
        }
    })
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

#[derive(Default)]
struct TaskDraft {
    id: TaskId,
    name: String,
    workflow_group: String,
    workflow_status: String,
    acl: AclAnnotations,
    data_objects: BTreeMap<String, String>,
}

#[derive(Default)]
struct EventDraft {
    task_id: TaskId,
    event_id: EventId,
    name: String,
    next_process_id: Option<TaskId>,
    adapters: Vec<String>,
    mail_subject: Option<String>,
    mail_body: Option<String>,
    mail_inactive: bool,
    rule_script: Option<String>,
    acl: AclAnnotations,
    follow_up_event: Option<EventId>,
}

/// A gateway edge as read off the wire: target is still a raw reference
/// (`"task:200"` or a gateway id) until `finish_model` resolves it against
/// the full set of gateway ids collected during the parse.
#[derive(Default, Clone)]
struct EdgeDraft {
    condition: Option<String>,
    target: Option<String>,
}

enum Context {
    None,
    Task(TaskDraft),
    Event(EventDraft),
    ConditionalGateway {
        id: String,
        edges: Vec<EdgeDraft>,
        else_edge: Option<EdgeDraft>,
    },
    SplitGateway {
        id: String,
        primary: Option<EdgeDraft>,
        siblings: Vec<EdgeDraft>,
    },
}

enum ItemTarget {
    Acl { slot: AclSlot, kind: AclKind },
    MailSubject,
    MailBody,
    MailInactive,
    Adapter,
    Rule,
    FollowUpEvent,
    Ignore,
}

#[derive(Clone, Copy)]
enum AclSlot {
    Read,
    Write,
    Owner,
}

#[derive(Clone, Copy)]
enum AclKind {
    UpdateFlag,
    Names,
    Fields,
}

fn classify_item(name: &str) -> ItemTarget {
    match name {
        "keyupdateacl" => ItemTarget::Acl { slot: AclSlot::Read, kind: AclKind::UpdateFlag },
        "namaddreadaccess" => ItemTarget::Acl { slot: AclSlot::Read, kind: AclKind::Names },
        "keyaddreadfields" => ItemTarget::Acl { slot: AclSlot::Read, kind: AclKind::Fields },
        "namaddwriteaccess" => ItemTarget::Acl { slot: AclSlot::Write, kind: AclKind::Names },
        "keyaddwritefields" => ItemTarget::Acl { slot: AclSlot::Write, kind: AclKind::Fields },
        "namownershipnames" => ItemTarget::Acl { slot: AclSlot::Owner, kind: AclKind::Names },
        "keyownershipfields" => ItemTarget::Acl { slot: AclSlot::Owner, kind: AclKind::Fields },
        "txtmailsubject" => ItemTarget::MailSubject,
        "txtmailbody" => ItemTarget::MailBody,
        "mailinactive" => ItemTarget::MailInactive,
        "adapter" => ItemTarget::Adapter,
        "rule" => ItemTarget::Rule,
        "followupevent" => ItemTarget::FollowUpEvent,
        _ => ItemTarget::Ignore,
    }
}

fn apply_acl_item(acl: &mut AclAnnotations, slot: AclSlot, kind: AclKind, text: &str) {
    let annotation = match slot {
        AclSlot::Read => &mut acl.read_access,
        AclSlot::Write => &mut acl.write_access,
        AclSlot::Owner => &mut acl.owner,
    };
    match kind {
        AclKind::UpdateFlag => acl.update_acl = text.eq_ignore_ascii_case("true") || text == "1",
        AclKind::Names => annotation.names.extend(split_csv(text)),
        AclKind::Fields => annotation.fields.extend(split_csv(text)),
    }
}

fn apply_item_text(ctx: &mut Context, name: &str, text: &str) {
    match classify_item(name) {
        ItemTarget::Acl { slot, kind } => {
            let acl = match ctx {
                Context::Task(d) => &mut d.acl,
                Context::Event(d) => &mut d.acl,
                _ => return,
            };
            apply_acl_item(acl, slot, kind, text);
        }
        ItemTarget::MailSubject => {
            if let Context::Event(d) = ctx {
                d.mail_subject = Some(text.to_string());
            }
        }
        ItemTarget::MailBody => {
            if let Context::Event(d) = ctx {
                d.mail_body = Some(text.to_string());
            }
        }
        ItemTarget::MailInactive => {
            if let Context::Event(d) = ctx {
                d.mail_inactive = text.eq_ignore_ascii_case("true");
            }
        }
        ItemTarget::Adapter => {
            if let Context::Event(d) = ctx {
                d.adapters.extend(split_csv(text));
            }
        }
        ItemTarget::Rule => {
            if let Context::Event(d) = ctx {
                d.rule_script = Some(text.to_string());
            }
        }
        ItemTarget::FollowUpEvent => {
            if let Context::Event(d) = ctx {
                d.follow_up_event = text.parse().ok();
            }
        }
        ItemTarget::Ignore => {}
    }
}

/// Raw gateway bodies collected during the streaming pass, resolved against
/// the full id set once parsing completes (`finish_model`).
struct ParseState {
    definition_version: Option<String>,
    definition_groups: Vec<String>,
    tasks: BTreeMap<TaskId, Task>,
    events: BTreeMap<(TaskId, EventId), WorkflowEvent>,
    conditional_raw: Vec<(String, Vec<EdgeDraft>, EdgeDraft)>,
    split_raw: Vec<(String, EdgeDraft, Vec<EdgeDraft>)>,
    conditional_ids: Vec<String>,
    split_ids: Vec<String>,
}

pub fn parse_bpmn(xml: &str) -> ParseResult<BpmnModel> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut state = ParseState {
        definition_version: None,
        definition_groups: Vec::new(),
        tasks: BTreeMap::new(),
        events: BTreeMap::new(),
        conditional_raw: Vec::new(),
        split_raw: Vec::new(),
        conditional_ids: Vec::new(),
        split_ids: Vec::new(),
    };

    let mut ctx = Context::None;
    let mut in_extension = false;
    let mut pending_item_name: Option<String> = None;
    let mut pending_data_object_name: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        let ev = reader.read_event_into(&mut buf).map_err(|e| invalid("xml", e))?;
        match ev {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let local = local_name(e.name().as_ref());
                handle_open(&local, e, &mut state, &mut ctx, &mut in_extension, &mut pending_item_name, &mut pending_data_object_name)?;
            }
            Event::Text(ref t) => {
                let text = t.unescape().map(|c| c.into_owned()).unwrap_or_default();
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                if let Some(name) = pending_item_name.clone() {
                    apply_item_text(&mut ctx, &name, text);
                }
                if let (Some(_), Context::Task(draft)) = (&pending_data_object_name, &mut ctx) {
                    let name = pending_data_object_name.clone().unwrap();
                    draft.data_objects.insert(name, text.to_string());
                }
            }
            Event::End(ref e) => {
                let local = local_name(e.name().as_ref());
                handle_close(&local, &mut state, &mut ctx, &mut in_extension, &mut pending_item_name, &mut pending_data_object_name)?;
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    finish_model(state)
}

#[allow(clippy::too_many_arguments)]
fn handle_open(
    local: &str,
    tag: &BytesStart,
    state: &mut ParseState,
    ctx: &mut Context,
    in_extension: &mut bool,
    pending_item_name: &mut Option<String>,
    pending_data_object_name: &mut Option<String>,
) -> ParseResult<()> {
    match local {
        "definition" => {
            state.definition_version = attr_value(tag, "version");
            if let Some(groups) = attr_value(tag, "groups") {
                state.definition_groups = split_csv(&groups);
            }
        }
        "task" | "userTask" | "serviceTask" | "manualTask" => {
            let id: TaskId = attr_value(tag, "processid")
                .ok_or_else(|| invalid("task", "missing imixs:processid"))?
                .parse()
                .map_err(|_| invalid("task", "processid must be numeric"))?;
            *ctx = Context::Task(TaskDraft {
                id,
                name: attr_value(tag, "name").unwrap_or_default(),
                workflow_group: attr_value(tag, "workflowgroup").unwrap_or_default(),
                workflow_status: attr_value(tag, "workflowstatus").unwrap_or_default(),
                acl: AclAnnotations::default(),
                data_objects: BTreeMap::new(),
            });
        }
        "intermediateCatchEvent" | "intermediateThrowEvent" | "sendTask" => {
            let task_id: TaskId = attr_value(tag, "processid")
                .ok_or_else(|| invalid("event", "missing imixs:processid"))?
                .parse()
                .map_err(|_| invalid("event", "processid must be numeric"))?;
            let event_id: EventId = attr_value(tag, "activityid")
                .ok_or_else(|| invalid("event", "missing imixs:activityid"))?
                .parse()
                .map_err(|_| invalid("event", "activityid must be numeric"))?;
            let next_process_id = attr_value(tag, "nextprocessid")
                .map(|v| v.parse::<TaskId>())
                .transpose()
                .map_err(|_| invalid("event", "nextprocessid must be numeric"))?;
            *ctx = Context::Event(EventDraft {
                task_id,
                event_id,
                name: attr_value(tag, "name").unwrap_or_default(),
                next_process_id,
                acl: AclAnnotations::default(),
                ..Default::default()
            });
        }
        "exclusiveGateway" => {
            let id = attr_value(tag, "id").ok_or_else(|| invalid("gateway", "missing id"))?;
            state.conditional_ids.push(id.clone());
            *ctx = Context::ConditionalGateway { id, edges: Vec::new(), else_edge: None };
        }
        "inclusiveGateway" => {
            let id = attr_value(tag, "id").ok_or_else(|| invalid("gateway", "missing id"))?;
            state.split_ids.push(id.clone());
            *ctx = Context::SplitGateway { id, primary: None, siblings: Vec::new() };
        }
        "extensionElements" => *in_extension = true,
        "item" if *in_extension => {
            *pending_item_name = attr_value(tag, "name").map(|n| n.to_ascii_lowercase());
        }
        "dataObject" => {
            *pending_data_object_name = attr_value(tag, "name");
        }
        "edge" => {
            let draft = EdgeDraft {
                condition: attr_value(tag, "condition"),
                target: attr_value(tag, "target"),
            };
            let is_primary = attr_value(tag, "primary").as_deref() == Some("true");
            match ctx {
                Context::ConditionalGateway { edges, .. } => edges.push(draft),
                Context::SplitGateway { primary, siblings, .. } => {
                    if is_primary {
                        *primary = Some(draft);
                    } else {
                        siblings.push(draft);
                    }
                }
                _ => {}
            }
        }
        "else" => {
            let draft = EdgeDraft { condition: None, target: attr_value(tag, "target") };
            if let Context::ConditionalGateway { else_edge, .. } = ctx {
                *else_edge = Some(draft);
            }
        }
        _ => {}
    }
    Ok(())
}

fn handle_close(
    local: &str,
    state: &mut ParseState,
    ctx: &mut Context,
    in_extension: &mut bool,
    pending_item_name: &mut Option<String>,
    pending_data_object_name: &mut Option<String>,
) -> ParseResult<()> {
    match local {
        "extensionElements" => *in_extension = false,
        "item" => *pending_item_name = None,
        "dataObject" => *pending_data_object_name = None,
        "task" | "userTask" | "serviceTask" | "manualTask" => {
            if let Context::Task(draft) = std::mem::replace(ctx, Context::None) {
                if state.tasks.contains_key(&draft.id) {
                    return Err(WorkflowError::model(
                        ModelErrorCode::InvalidModelEntry,
                        format!("duplicate task id {}", draft.id),
                    ));
                }
                state.tasks.insert(
                    draft.id,
                    Task {
                        id: draft.id,
                        name: draft.name,
                        workflow_group: draft.workflow_group,
                        workflow_status: draft.workflow_status,
                        acl: draft.acl,
                        data_objects: draft.data_objects,
                    },
                );
            }
        }
        "intermediateCatchEvent" | "intermediateThrowEvent" | "sendTask" => {
            if let Context::Event(draft) = std::mem::replace(ctx, Context::None) {
                let key = (draft.task_id, draft.event_id);
                if state.events.contains_key(&key) {
                    return Err(WorkflowError::model(
                        ModelErrorCode::DuplicateEventId,
                        format!("duplicate event ({}, {})", draft.task_id, draft.event_id),
                    ));
                }
                let successor = match draft.next_process_id {
                    Some(id) => Successor::Task(id),
                    None => return Err(invalid(format!("event {}/{}", draft.task_id, draft.event_id), "missing imixs:nextprocessid")),
                };
                state.events.insert(
                    key,
                    WorkflowEvent {
                        task_id: draft.task_id,
                        event_id: draft.event_id,
                        name: draft.name,
                        successor,
                        adapters: draft.adapters,
                        mail_subject: draft.mail_subject,
                        mail_body: draft.mail_body,
                        mail_inactive: draft.mail_inactive,
                        rule_script: draft.rule_script,
                        acl: draft.acl,
                        follow_up_event: draft.follow_up_event,
                    },
                );
            }
        }
        "exclusiveGateway" => {
            if let Context::ConditionalGateway { id, edges, else_edge } = std::mem::replace(ctx, Context::None) {
                let else_edge = else_edge.ok_or_else(|| invalid(&id, "conditional gateway missing mandatory else edge"))?;
                state.conditional_raw.push((id, edges, else_edge));
            }
        }
        "inclusiveGateway" => {
            if let Context::SplitGateway { id, primary, siblings } = std::mem::replace(ctx, Context::None) {
                let primary = primary.ok_or_else(|| invalid(&id, "split gateway missing primary edge"))?;
                state.split_raw.push((id, primary, siblings));
            }
        }
        _ => {}
    }
    Ok(())
}

fn raw_target_to_successor(raw: &str, conditional_ids: &[String], split_ids: &[String]) -> ParseResult<Successor> {
    if let Some(rest) = raw.strip_prefix("task:") {
        let id: TaskId = rest.parse().map_err(|_| invalid(raw, "task: target must be numeric"))?;
        return Ok(Successor::Task(id));
    }
    if conditional_ids.iter().any(|g| g == raw) {
        return Ok(Successor::ConditionalGateway(raw.to_string()));
    }
    if split_ids.iter().any(|g| g == raw) {
        return Ok(Successor::SplitGateway(raw.to_string()));
    }
    Err(invalid(raw, "unresolved gateway/task edge target"))
}

fn resolve_edge(draft: &EdgeDraft, conditional_ids: &[String], split_ids: &[String]) -> ParseResult<GatewayEdge> {
    let raw = draft.target.as_deref().unwrap_or_default();
    Ok(GatewayEdge {
        condition_script: draft.condition.clone(),
        target: raw_target_to_successor(raw, conditional_ids, split_ids)?,
    })
}

fn finish_model(state: ParseState) -> ParseResult<BpmnModel> {
    let version = state.definition_version.ok_or_else(|| invalid("definition", "missing imixs:definition version"))?;

    let mut conditional_gateways = BTreeMap::new();
    for (id, edge_drafts, else_draft) in &state.conditional_raw {
        let edges = edge_drafts
            .iter()
            .map(|d| resolve_edge(d, &state.conditional_ids, &state.split_ids))
            .collect::<ParseResult<Vec<_>>>()?;
        let else_edge = resolve_edge(else_draft, &state.conditional_ids, &state.split_ids)?;
        conditional_gateways.insert(id.clone(), ConditionalGateway { id: id.clone(), edges, else_edge });
    }

    let mut split_gateways = BTreeMap::new();
    for (id, primary_draft, sibling_drafts) in &state.split_raw {
        let primary = resolve_edge(primary_draft, &state.conditional_ids, &state.split_ids)?;
        let siblings = sibling_drafts
            .iter()
            .map(|d| resolve_edge(d, &state.conditional_ids, &state.split_ids))
            .collect::<ParseResult<Vec<_>>>()?;
        split_gateways.insert(id.clone(), SplitGateway { id: id.clone(), primary, siblings });
    }

    let model = BpmnModel {
        definition: Definition { version, groups: state.definition_groups },
        tasks: state.tasks,
        events: state.events,
        conditional_gateways,
        split_gateways,
    };
    validate_acyclic_follow_up(&model)?;
    Ok(model)
}

/// Every target task an event's successor could resolve to once gateway
/// conditions are evaluated at runtime — all edges, not just the one a
/// particular workitem would take, since this check must hold regardless
/// of which branch fires (spec §3.2 "the follow-up chain must be acyclic
/// from any entry").
fn possible_next_tasks(model: &BpmnModel, successor: &Successor) -> Vec<TaskId> {
    match successor {
        Successor::Task(id) => vec![*id],
        Successor::ConditionalGateway(id) => {
            let Some(gateway) = model.conditional_gateways.get(id) else {
                return Vec::new();
            };
            let mut tasks: Vec<TaskId> = gateway.edges.iter().flat_map(|e| possible_next_tasks(model, &e.target)).collect();
            tasks.extend(possible_next_tasks(model, &gateway.else_edge.target));
            tasks
        }
        Successor::SplitGateway(id) => {
            let Some(gateway) = model.split_gateways.get(id) else {
                return Vec::new();
            };
            let mut tasks = possible_next_tasks(model, &gateway.primary.target);
            for edge in &gateway.siblings {
                tasks.extend(possible_next_tasks(model, &edge.target));
            }
            tasks
        }
    }
}

/// Rejects a model whose automatic follow-up chain (spec §4.1 step 5's
/// `ACTIVITYIDLIST` auto-continuation) can revisit the same (task, event)
/// pair without new caller input — the static counterpart to the
/// `Kernel::process` runtime `visited` guard, generalized from the
/// teacher verifier's `petgraph`-backed graph walk (`compiler/verifier.rs`)
/// from a reachability check into a cycle check.
fn validate_acyclic_follow_up(model: &BpmnModel) -> ParseResult<()> {
    let mut graph = DiGraph::<(TaskId, EventId), ()>::new();
    let mut nodes = HashMap::new();
    for &key in model.events.keys() {
        nodes.insert(key, graph.add_node(key));
    }

    for event in model.events.values() {
        let Some(follow_up) = event.follow_up_event else {
            continue;
        };
        let source = nodes[&(event.task_id, event.event_id)];
        for next_task in possible_next_tasks(model, &event.successor) {
            if let Some(&target) = nodes.get(&(next_task, follow_up)) {
                graph.add_edge(source, target, ());
            }
        }
    }

    if is_cyclic_directed(&graph) {
        return Err(WorkflowError::model(
            ModelErrorCode::CyclicFollowUp,
            "automatic follow-up chain contains a cycle",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &str = r#"
    <bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL">
      <imixs:definition version="1.0.0" groups="Ticket" />
      <bpmn:task id="t100" imixs:processid="100" imixs:workflowgroup="Ticket" imixs:workflowstatus="New" name="New" />
      <bpmn:task id="t200" imixs:processid="200" imixs:workflowgroup="Ticket" imixs:workflowstatus="Submitted" name="Submitted" />
      <bpmn:intermediateCatchEvent id="e10" imixs:processid="100" imixs:activityid="10" imixs:nextprocessid="200" name="submit" />
    </bpmn:definitions>
    "#;

    #[test]
    fn parses_tasks_and_events() {
        let model = parse_bpmn(SIMPLE).unwrap();
        assert_eq!(model.version(), "1.0.0");
        assert_eq!(model.tasks.len(), 2);
        let event = model.events.get(&(100, 10)).unwrap();
        assert!(matches!(event.successor, Successor::Task(200)));
    }

    #[test]
    fn duplicate_event_id_is_rejected() {
        let xml = SIMPLE.trim_end().strip_suffix("</bpmn:definitions>").unwrap().to_string()
            + r#"<bpmn:intermediateCatchEvent id="e10b" imixs:processid="100" imixs:activityid="10" imixs:nextprocessid="200" /></bpmn:definitions>"#;
        let err = parse_bpmn(&xml).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Model { code: ModelErrorCode::DuplicateEventId, .. }
        ));
    }

    #[test]
    fn cyclic_follow_up_chain_is_rejected_at_load_time() {
        let xml = r#"
        <bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL">
          <imixs:definition version="1.0.0" />
          <bpmn:task id="t100" imixs:processid="100" imixs:workflowgroup="G" imixs:workflowstatus="A" name="A" />
          <bpmn:task id="t200" imixs:processid="200" imixs:workflowgroup="G" imixs:workflowstatus="B" name="B" />
          <bpmn:intermediateCatchEvent id="e10" imixs:processid="100" imixs:activityid="10" imixs:nextprocessid="200" name="to B">
            <bpmn:extensionElements>
              <imixs:item name="followupevent">20</imixs:item>
            </bpmn:extensionElements>
          </bpmn:intermediateCatchEvent>
          <bpmn:intermediateCatchEvent id="e20" imixs:processid="200" imixs:activityid="20" imixs:nextprocessid="100" name="to A">
            <bpmn:extensionElements>
              <imixs:item name="followupevent">10</imixs:item>
            </bpmn:extensionElements>
          </bpmn:intermediateCatchEvent>
        </bpmn:definitions>"#;
        let err = parse_bpmn(xml).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Model { code: ModelErrorCode::CyclicFollowUp, .. }
        ));
    }

    #[test]
    fn acyclic_follow_up_chain_is_accepted() {
        let xml = r#"
        <bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL">
          <imixs:definition version="1.0.0" />
          <bpmn:task id="t100" imixs:processid="100" imixs:workflowgroup="G" imixs:workflowstatus="A" name="A" />
          <bpmn:task id="t200" imixs:processid="200" imixs:workflowgroup="G" imixs:workflowstatus="B" name="B" />
          <bpmn:intermediateCatchEvent id="e10" imixs:processid="100" imixs:activityid="10" imixs:nextprocessid="200" name="to B">
            <bpmn:extensionElements>
              <imixs:item name="followupevent">20</imixs:item>
            </bpmn:extensionElements>
          </bpmn:intermediateCatchEvent>
          <bpmn:intermediateCatchEvent id="e20" imixs:processid="200" imixs:activityid="20" imixs:nextprocessid="200" name="done" />
        </bpmn:definitions>"#;
        assert!(parse_bpmn(xml).is_ok());
    }

    #[test]
    fn conditional_gateway_requires_else_edge() {
        let xml = r#"
        <bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL">
          <imixs:definition version="1.0.0" />
          <bpmn:exclusiveGateway id="gw1">
            <imixs:edge condition="a==1" target="task:200" />
          </bpmn:exclusiveGateway>
        </bpmn:definitions>"#;
        assert!(parse_bpmn(xml).is_err());
    }
}
