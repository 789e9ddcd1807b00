//! The workflow kernel: the state-transition interpreter that executes
//! exactly one process step per call (spec §4.1).

use crate::acl;
use crate::error::{ModelErrorCode, WorkflowError};
use crate::item::{
    ItemCollection, Value, ITEM_EVENTID, ITEM_LASTEVENTDATE, ITEM_LASTEVENTID, ITEM_TASKID,
    ITEM_UNIQUEID, ITEM_WORKFLOWGROUP, ITEM_WORKFLOWSTATUS, ITEM_WRITEACCESS,
};
use crate::model::{BpmnModel, EventId, ModelManager, Successor, Task, TaskId, WorkflowEvent};
use crate::plugins::{Plugin, WorkflowContext};
use crate::rules::RuleEngine;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Un-prefixed legacy queue item carrying follow-up event ids when a
/// workitem is presented with `$eventid = 0` (spec §4.1 inputs).
pub const ITEM_ACTIVITYIDLIST: &str = "activityidlist";

/// Observer of kernel lifecycle events, delivered synchronously in the
/// kernel's own thread before `process` returns (spec §4.1 steps 2/6,
/// §5 ordering guarantee).
pub trait LifecycleObserver: Send {
    fn before_process(&mut self, _workitem: &ItemCollection) {}
    fn after_process(&mut self, _workitem: &ItemCollection) {}
}

/// Output of a successful `Kernel::process` call: the main workitem plus
/// any siblings born at split gateways (spec §4.1).
#[derive(Debug)]
pub struct ProcessResult {
    workitem: ItemCollection,
    split_workitems: Vec<ItemCollection>,
}

impl ProcessResult {
    pub fn workitem(&self) -> &ItemCollection {
        &self.workitem
    }

    pub fn into_workitem(self) -> ItemCollection {
        self.workitem
    }

    pub fn split_workitems(&self) -> &[ItemCollection] {
        &self.split_workitems
    }
}

/// Executes one process step per call (spec §4.1). Owns the registered
/// plugin chain and rule engine; the model manager is a shared,
/// effectively-immutable collaborator (spec §5).
pub struct Kernel {
    models: Arc<ModelManager>,
    plugins: Vec<Box<dyn Plugin>>,
    rule_engine: RuleEngine,
    observers: Vec<Box<dyn LifecycleObserver>>,
}

impl Kernel {
    /// Registers every plugin (`init`) once, matching spec §6.2's
    /// registration-time contract.
    pub fn new(
        ctx: WorkflowContext,
        mut plugins: Vec<Box<dyn Plugin>>,
        rule_engine: RuleEngine,
        observers: Vec<Box<dyn LifecycleObserver>>,
    ) -> Result<Self, WorkflowError> {
        for plugin in &mut plugins {
            plugin.init(&ctx)?;
        }
        Ok(Self {
            models: ctx.models,
            plugins,
            rule_engine,
            observers,
        })
    }

    /// Runs the 7-step algorithm of spec §4.1 for `workitem`, driven by
    /// `caller`'s identity (used for the write-access check and
    /// `$participants`).
    pub fn process(
        &mut self,
        mut workitem: ItemCollection,
        caller: &str,
    ) -> Result<ProcessResult, WorkflowError> {
        if workitem.get_item_value_string(ITEM_UNIQUEID).is_empty() {
            workitem.set_item_value(ITEM_UNIQUEID, Value::Str(Uuid::now_v7().to_string()));
        }

        // Step 1: validate. Clone the Arc so later &mut self calls (the
        // plugin chain) don't overlap with borrows tied to `self.models`.
        let models = Arc::clone(&self.models);
        let model = models.get_model_by_workitem(&workitem)?;

        let mut current_task: TaskId = workitem.get_item_value_long(ITEM_TASKID);
        let mut current_event: EventId = workitem.get_item_value_long(ITEM_EVENTID);
        if current_event == 0 {
            current_event = dequeue_activity(&mut workitem).ok_or_else(|| {
                WorkflowError::Processing(
                    "$eventid is 0 and activityidlist carries no follow-up event".into(),
                )
            })?;
        }

        // Fail fast on an unresolvable event before any observer fires.
        models.get_event(model, current_task, current_event)?;

        if !check_write_access(&workitem, caller) {
            return Err(WorkflowError::AccessDenied(format!(
                "'{caller}' has no write access to this workitem"
            )));
        }

        // Step 2: before-process hook.
        for observer in &mut self.observers {
            observer.before_process(&workitem);
        }

        let mut visited: HashSet<(TaskId, EventId)> = HashSet::new();
        let mut split_workitems: Vec<ItemCollection> = Vec::new();

        loop {
            if !visited.insert((current_task, current_event)) {
                return Err(WorkflowError::model(
                    ModelErrorCode::CyclicFollowUp,
                    format!("cyclic follow-up: revisited ({current_task}, {current_event})"),
                ));
            }

            let event = models.get_event(model, current_task, current_event)?.clone();
            tracing::debug!(
                task_id = current_task,
                event_id = current_event,
                "process step: running plugin chain"
            );

            // Step 3: plugin chain.
            self.run_plugin_chain(&mut workitem, &event)?;

            // Step 4: gateway resolution.
            let (next_task_id, sibling_task_ids) =
                self.resolve_successor(model, &event.successor, &workitem, &event)?;
            let next_task = models.get_task(model, next_task_id)?;

            let delta = acl::resolve_acl(&workitem, &event, next_task);
            acl::apply_delta(&mut workitem, delta);
            acl::append_participant(&mut workitem, caller);

            // Step 5: commit transition.
            commit_transition(&mut workitem, current_event, next_task);

            for sibling_task_id in &sibling_task_ids {
                let sibling_task = models.get_task(model, *sibling_task_id)?;
                let mut sibling = workitem.deep_clone();
                sibling.set_item_value(ITEM_UNIQUEID, Value::Str(Uuid::now_v7().to_string()));
                commit_transition(&mut sibling, current_event, sibling_task);
                split_workitems.push(sibling);
            }

            current_task = next_task_id;
            match event.follow_up_event {
                Some(follow_up) => current_event = follow_up,
                None => break,
            }
        }

        // Step 6: after-process hook, for the main workitem and every sibling.
        for observer in &mut self.observers {
            observer.after_process(&workitem);
            for sibling in &split_workitems {
                observer.after_process(sibling);
            }
        }

        // Step 7: close, in reverse registration order. Failures are logged,
        // never propagated.
        self.close_chain(false);

        Ok(ProcessResult {
            workitem,
            split_workitems,
        })
    }

    fn run_plugin_chain(
        &mut self,
        workitem: &mut ItemCollection,
        event: &WorkflowEvent,
    ) -> Result<(), WorkflowError> {
        for i in 0..self.plugins.len() {
            if let Err(err) = self.plugins[i].run(workitem, event) {
                tracing::warn!(plugin = self.plugins[i].name(), error = %err, "plugin failed, rolling back");
                for plugin in self.plugins[..=i].iter_mut().rev() {
                    if let Err(close_err) = plugin.close(true) {
                        tracing::warn!(plugin = plugin.name(), error = %close_err, "rollback close failed");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn close_chain(&mut self, rollback: bool) {
        for plugin in self.plugins.iter_mut().rev() {
            if let Err(err) = plugin.close(rollback) {
                tracing::warn!(plugin = plugin.name(), error = %err, "close failed");
            }
        }
    }

    /// Walks a `Successor` chain through conditional/split gateways to its
    /// terminal Task ids: the main path and any split siblings spawned
    /// along the way (spec §3.2, §4.1 step 4).
    fn resolve_successor(
        &self,
        model: &BpmnModel,
        successor: &Successor,
        workitem: &ItemCollection,
        event: &WorkflowEvent,
    ) -> Result<(TaskId, Vec<TaskId>), WorkflowError> {
        match successor {
            Successor::Task(id) => Ok((*id, Vec::new())),
            Successor::ConditionalGateway(id) => {
                let gateway = model.conditional_gateways.get(id).ok_or_else(|| {
                    WorkflowError::model(
                        ModelErrorCode::InvalidModelEntry,
                        format!("undefined conditional gateway '{id}'"),
                    )
                })?;
                for edge in &gateway.edges {
                    let matched = match &edge.condition_script {
                        Some(script) => self.rule_engine.evaluate_condition(script, workitem, event)?,
                        None => true,
                    };
                    if matched {
                        return self.resolve_successor(model, &edge.target, workitem, event);
                    }
                }
                self.resolve_successor(model, &gateway.else_edge.target, workitem, event)
            }
            Successor::SplitGateway(id) => {
                let gateway = model.split_gateways.get(id).ok_or_else(|| {
                    WorkflowError::model(
                        ModelErrorCode::InvalidModelEntry,
                        format!("undefined split gateway '{id}'"),
                    )
                })?;
                let (main_id, mut splits) =
                    self.resolve_successor(model, &gateway.primary.target, workitem, event)?;
                for edge in &gateway.siblings {
                    let matched = match &edge.condition_script {
                        Some(script) => self.rule_engine.evaluate_condition(script, workitem, event)?,
                        None => true,
                    };
                    if !matched {
                        continue;
                    }
                    let (sibling_id, nested) =
                        self.resolve_successor(model, &edge.target, workitem, event)?;
                    splits.push(sibling_id);
                    splits.extend(nested);
                }
                Ok((main_id, splits))
            }
        }
    }
}

fn commit_transition(workitem: &mut ItemCollection, event_id: EventId, next_task: &Task) {
    workitem.set_item_value(ITEM_TASKID, Value::I64(next_task.id));
    workitem.set_item_value(ITEM_EVENTID, Value::I64(event_id));
    workitem.set_item_value(ITEM_LASTEVENTID, Value::I64(event_id));
    workitem.set_item_value(ITEM_LASTEVENTDATE, Value::Instant(Utc::now()));
    workitem.set_item_value(ITEM_WORKFLOWGROUP, Value::Str(next_task.workflow_group.clone()));
    workitem.set_item_value(ITEM_WORKFLOWSTATUS, Value::Str(next_task.workflow_status.clone()));
}

fn dequeue_activity(workitem: &mut ItemCollection) -> Option<EventId> {
    let mut queue = workitem.get_item_value(ITEM_ACTIVITYIDLIST);
    if queue.is_empty() {
        return None;
    }
    let next = queue.remove(0).as_i64()?;
    workitem.set_item_value_list(ITEM_ACTIVITYIDLIST, queue);
    Some(next)
}

/// Caller must appear in `$writeAccess`, or the list must be empty (no
/// restriction applied yet, e.g. a freshly created workitem), to proceed
/// (spec §4.1 step 1, §6.1).
fn check_write_access(workitem: &ItemCollection, caller: &str) -> bool {
    let write_access = workitem.get_item_value_string_list(ITEM_WRITEACCESS);
    write_access.is_empty() || write_access.iter().any(|a| a == caller)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ITEM_MODELVERSION;
    use crate::model::{
        AclAnnotations, ConditionalGateway, Definition, GatewayEdge, SplitGateway,
    };
    use crate::store::MemoryDocumentStore;
    use std::collections::BTreeMap;

    fn task(id: TaskId, group: &str, status: &str) -> Task {
        Task {
            id,
            name: status.to_string(),
            workflow_group: group.to_string(),
            workflow_status: status.to_string(),
            acl: AclAnnotations::default(),
            data_objects: BTreeMap::new(),
        }
    }

    fn event(task_id: TaskId, event_id: EventId, successor: Successor) -> WorkflowEvent {
        WorkflowEvent {
            task_id,
            event_id,
            name: "submit".into(),
            successor,
            adapters: vec![],
            mail_subject: None,
            mail_body: None,
            mail_inactive: false,
            rule_script: None,
            acl: AclAnnotations::default(),
            follow_up_event: None,
        }
    }

    fn ctx(models: Arc<ModelManager>) -> WorkflowContext {
        WorkflowContext {
            caller: "joe".into(),
            models,
            store: Arc::new(MemoryDocumentStore::new()),
        }
    }

    fn simple_input(version: &str, task_id: TaskId, event_id: EventId) -> ItemCollection {
        let mut w = ItemCollection::new();
        w.set_item_value(ITEM_MODELVERSION, Value::Str(version.into()));
        w.set_item_value(ITEM_TASKID, Value::I64(task_id));
        w.set_item_value(ITEM_EVENTID, Value::I64(event_id));
        w
    }

    // S1: simple transition.
    #[test]
    fn simple_transition_moves_task_and_records_last_event() {
        let mut model = BpmnModel {
            definition: Definition { version: "1.0.0".into(), groups: vec![] },
            tasks: BTreeMap::new(),
            events: BTreeMap::new(),
            conditional_gateways: BTreeMap::new(),
            split_gateways: BTreeMap::new(),
        };
        model.tasks.insert(100, task(100, "Ticket", "New"));
        model.tasks.insert(200, task(200, "Ticket", "Submitted"));
        model.events.insert((100, 10), event(100, 10, Successor::Task(200)));

        let mut manager = ModelManager::new();
        manager.add_model(model);
        let models = Arc::new(manager);

        let mut kernel = Kernel::new(ctx(models), vec![], RuleEngine::new(), vec![]).unwrap();
        let result = kernel.process(simple_input("1.0.0", 100, 10), "joe").unwrap();
        assert_eq!(result.workitem().get_item_value_long(ITEM_TASKID), 200);
        assert_eq!(result.workitem().get_item_value_long(ITEM_LASTEVENTID), 10);
        assert!(result.split_workitems().is_empty());
    }

    // S2: conditional gateway.
    #[test]
    fn conditional_gateway_picks_branch_and_keeps_eventid() {
        let mut model = BpmnModel {
            definition: Definition { version: "1.0.0".into(), groups: vec![] },
            tasks: BTreeMap::new(),
            events: BTreeMap::new(),
            conditional_gateways: BTreeMap::new(),
            split_gateways: BTreeMap::new(),
        };
        model.tasks.insert(100, task(100, "Ticket", "New"));
        model.tasks.insert(200, task(200, "Ticket", "Accepted"));
        model.tasks.insert(900, task(900, "Ticket", "Rejected"));
        model.events.insert(
            (100, 10),
            event(100, 10, Successor::ConditionalGateway("gw1".into())),
        );
        model.conditional_gateways.insert(
            "gw1".into(),
            ConditionalGateway {
                id: "gw1".into(),
                edges: vec![GatewayEdge {
                    condition_script: Some(
                        r#"workitem.getItemValueLong("a") == 1 && workitem.getItemValueString("b") == "DE""#.into(),
                    ),
                    target: Successor::Task(200),
                }],
                else_edge: GatewayEdge { condition_script: None, target: Successor::Task(900) },
            },
        );

        let mut manager = ModelManager::new();
        manager.add_model(model);
        let models = Arc::new(manager);

        let mut kernel = Kernel::new(ctx(models), vec![], RuleEngine::new(), vec![]).unwrap();

        let mut de = simple_input("1.0.0", 100, 10);
        de.set_item_value("a", Value::I64(1));
        de.set_item_value("b", Value::Str("DE".into()));
        let de_result = kernel.process(de, "joe").unwrap();
        assert_eq!(de_result.workitem().get_item_value_long(ITEM_TASKID), 200);
        assert_eq!(de_result.workitem().get_item_value_long(ITEM_EVENTID), 10);

        let mut it = simple_input("1.0.0", 100, 10);
        it.set_item_value("a", Value::I64(1));
        it.set_item_value("b", Value::Str("IT".into()));
        let it_result = kernel.process(it, "joe").unwrap();
        assert_eq!(it_result.workitem().get_item_value_long(ITEM_TASKID), 900);
    }

    // S3: plugin rollback.
    #[test]
    fn plugin_failure_rolls_back_without_running_later_plugins() {
        struct SetX;
        impl Plugin for SetX {
            fn name(&self) -> &str { "set-x" }
            fn run(&mut self, w: &mut ItemCollection, _e: &WorkflowEvent) -> Result<(), WorkflowError> {
                w.set_item_value("x", Value::I64(1));
                Ok(())
            }
            fn close(&mut self, rollback: bool) -> Result<(), WorkflowError> {
                if rollback {
                    CLOSED_WITH_ROLLBACK.with(|c| c.set(true));
                }
                Ok(())
            }
        }
        struct Fail;
        impl Plugin for Fail {
            fn name(&self) -> &str { "fail" }
            fn run(&mut self, _w: &mut ItemCollection, _e: &WorkflowEvent) -> Result<(), WorkflowError> {
                Err(WorkflowError::plugin("fail", "BOOM", "synthetic failure"))
            }
        }
        struct NeverRuns;
        impl Plugin for NeverRuns {
            fn name(&self) -> &str { "never" }
            fn run(&mut self, _w: &mut ItemCollection, _e: &WorkflowEvent) -> Result<(), WorkflowError> {
                NEVER_RAN.with(|c| c.set(true));
                Ok(())
            }
        }

        thread_local! {
            static CLOSED_WITH_ROLLBACK: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
            static NEVER_RAN: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
        }

        let mut model = BpmnModel {
            definition: Definition { version: "1.0.0".into(), groups: vec![] },
            tasks: BTreeMap::new(),
            events: BTreeMap::new(),
            conditional_gateways: BTreeMap::new(),
            split_gateways: BTreeMap::new(),
        };
        model.tasks.insert(100, task(100, "Ticket", "New"));
        model.tasks.insert(200, task(200, "Ticket", "Submitted"));
        model.events.insert((100, 10), event(100, 10, Successor::Task(200)));
        let mut manager = ModelManager::new();
        manager.add_model(model);
        let models = Arc::new(manager);

        let plugins: Vec<Box<dyn Plugin>> = vec![Box::new(SetX), Box::new(Fail), Box::new(NeverRuns)];
        let mut kernel = Kernel::new(ctx(models), plugins, RuleEngine::new(), vec![]).unwrap();
        let err = kernel.process(simple_input("1.0.0", 100, 10), "joe").unwrap_err();
        assert!(matches!(err, WorkflowError::Plugin { .. }));
        assert!(CLOSED_WITH_ROLLBACK.with(|c| c.get()));
        assert!(!NEVER_RAN.with(|c| c.get()));
    }

    // S4: split workitem.
    #[test]
    fn split_gateway_spawns_sibling_with_fresh_id() {
        let mut model = BpmnModel {
            definition: Definition { version: "1.0.0".into(), groups: vec![] },
            tasks: BTreeMap::new(),
            events: BTreeMap::new(),
            conditional_gateways: BTreeMap::new(),
            split_gateways: BTreeMap::new(),
        };
        model.tasks.insert(100, task(100, "Ticket", "New"));
        model.tasks.insert(210, task(210, "Ticket", "Primary"));
        model.tasks.insert(220, task(220, "Ticket", "Sibling"));
        model.events.insert((100, 10), event(100, 10, Successor::SplitGateway("gw1".into())));
        model.split_gateways.insert(
            "gw1".into(),
            SplitGateway {
                id: "gw1".into(),
                primary: GatewayEdge { condition_script: None, target: Successor::Task(210) },
                siblings: vec![GatewayEdge { condition_script: None, target: Successor::Task(220) }],
            },
        );
        let mut manager = ModelManager::new();
        manager.add_model(model);
        let models = Arc::new(manager);

        let mut kernel = Kernel::new(ctx(models), vec![], RuleEngine::new(), vec![]).unwrap();
        let result = kernel.process(simple_input("1.0.0", 100, 10), "joe").unwrap();
        assert_eq!(result.workitem().get_item_value_long(ITEM_TASKID), 210);
        assert_eq!(result.split_workitems().len(), 1);
        let sibling = &result.split_workitems()[0];
        assert_eq!(sibling.get_item_value_long(ITEM_TASKID), 220);
        assert_ne!(
            sibling.get_item_value_string(ITEM_UNIQUEID),
            result.workitem().get_item_value_string(ITEM_UNIQUEID)
        );
    }

    // S5: access recompute (replacement, not merge).
    #[test]
    fn access_resolver_replaces_write_access_on_commit() {
        let mut model = BpmnModel {
            definition: Definition { version: "1.0.0".into(), groups: vec![] },
            tasks: BTreeMap::new(),
            events: BTreeMap::new(),
            conditional_gateways: BTreeMap::new(),
            split_gateways: BTreeMap::new(),
        };
        model.tasks.insert(100, task(100, "Ticket", "New"));
        let mut t300 = task(300, "Ticket", "Approved");
        t300.acl = AclAnnotations {
            update_acl: true,
            write_access: crate::model::AccessAnnotation {
                names: vec!["joe".into(), "sam".into()],
                fields: vec![],
            },
            ..Default::default()
        };
        model.tasks.insert(300, t300);
        model.events.insert((100, 10), event(100, 10, Successor::Task(300)));
        let mut manager = ModelManager::new();
        manager.add_model(model);
        let models = Arc::new(manager);

        let mut kernel = Kernel::new(ctx(models), vec![], RuleEngine::new(), vec![]).unwrap();
        let mut w = simple_input("1.0.0", 100, 10);
        w.set_item_value_list(
            "$writeaccess",
            vec![Value::Str("kevin".into()), Value::Str("julian".into())],
        );
        let result = kernel.process(w, "joe").unwrap();
        assert_eq!(
            result.workitem().get_item_value_string_list("$writeaccess"),
            vec!["joe".to_string(), "sam".to_string()]
        );
    }

    #[test]
    fn access_denied_when_caller_not_in_write_access() {
        let mut model = BpmnModel {
            definition: Definition { version: "1.0.0".into(), groups: vec![] },
            tasks: BTreeMap::new(),
            events: BTreeMap::new(),
            conditional_gateways: BTreeMap::new(),
            split_gateways: BTreeMap::new(),
        };
        model.tasks.insert(100, task(100, "Ticket", "New"));
        model.tasks.insert(200, task(200, "Ticket", "Submitted"));
        model.events.insert((100, 10), event(100, 10, Successor::Task(200)));
        let mut manager = ModelManager::new();
        manager.add_model(model);
        let models = Arc::new(manager);

        let mut kernel = Kernel::new(ctx(models), vec![], RuleEngine::new(), vec![]).unwrap();
        let mut w = simple_input("1.0.0", 100, 10);
        w.set_item_value_list("$writeaccess", vec![Value::Str("sam".into())]);
        let err = kernel.process(w, "joe").unwrap_err();
        assert!(matches!(err, WorkflowError::AccessDenied(_)));
    }
}
