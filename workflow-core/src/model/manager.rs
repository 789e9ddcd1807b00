use super::types::*;
use crate::error::{ModelErrorCode, WorkflowError};
use crate::item::{ItemCollection, ITEM_MODELVERSION, ITEM_WORKFLOWGROUP};
use std::collections::BTreeMap;

type Result<T> = std::result::Result<T, WorkflowError>;

/// Owns the set of BPMN models indexed by `$modelversion` and resolves a
/// model for a workitem (spec §4.2).
///
/// Effectively immutable after `add_model` — callers that need to swap a
/// model under load should build a new `ModelManager` and hand out `Arc`s to
/// it (spec §5 "copy-on-write").
#[derive(Default)]
pub struct ModelManager {
    models: BTreeMap<String, BpmnModel>,
}

impl ModelManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_model(&mut self, model: BpmnModel) {
        self.models.insert(model.version().to_string(), model);
    }

    pub fn remove_model(&mut self, version: &str) {
        self.models.remove(version);
    }

    pub fn get_model(&self, version: &str) -> Result<&BpmnModel> {
        self.models.get(version).ok_or_else(|| {
            WorkflowError::model(ModelErrorCode::UndefinedModelEntry, format!("no model for version '{version}'"))
        })
    }

    /// Resolves a model for a workitem per spec §4.2:
    /// - `$modelversion` starting with `(` or `^` is a regex pattern; pick
    ///   the highest-sorted matching version.
    /// - otherwise try an exact match.
    /// - otherwise, if `$workflowgroup` is set, pick the highest version
    ///   whose `Definition.groups` contains it.
    /// - otherwise fail.
    pub fn get_model_by_workitem(&self, workitem: &ItemCollection) -> Result<&BpmnModel> {
        let version_spec = workitem.get_item_value_string(ITEM_MODELVERSION);

        if version_spec.starts_with('(') || version_spec.starts_with('^') {
            let pattern = regex::Regex::new(&version_spec)
                .map_err(|e| WorkflowError::model(ModelErrorCode::UndefinedModelEntry, format!("invalid model version regex '{version_spec}': {e}")))?;
            let mut matches: Vec<&String> = self.models.keys().filter(|v| pattern.is_match(v)).collect();
            matches.sort();
            let best = matches.last().ok_or_else(|| {
                WorkflowError::model(ModelErrorCode::UndefinedModelEntry, format!("no model version matches pattern '{version_spec}'"))
            })?;
            return Ok(self.models.get(*best).expect("matched key must exist"));
        }

        if let Ok(model) = self.get_model(&version_spec) {
            return Ok(model);
        }

        let group = workitem.get_item_value_string(ITEM_WORKFLOWGROUP);
        if !group.is_empty() {
            let mut matches: Vec<&BpmnModel> = self.models.values().filter(|m| m.definition.groups.iter().any(|g| g == &group)).collect();
            matches.sort_by(|a, b| a.version().cmp(b.version()));
            if let Some(best) = matches.last() {
                return Ok(best);
            }
        }

        Err(WorkflowError::model(
            ModelErrorCode::UndefinedModelEntry,
            format!("cannot resolve model: version='{version_spec}', group='{group}'"),
        ))
    }

    pub fn get_task<'a>(&'a self, model: &'a BpmnModel, task_id: TaskId) -> Result<&'a Task> {
        model
            .tasks
            .get(&task_id)
            .ok_or_else(|| WorkflowError::model(ModelErrorCode::UndefinedTask, format!("no task {task_id}")))
    }

    pub fn get_event<'a>(&'a self, model: &'a BpmnModel, task_id: TaskId, event_id: EventId) -> Result<&'a WorkflowEvent> {
        model
            .events
            .get(&(task_id, event_id))
            .ok_or_else(|| WorkflowError::model(ModelErrorCode::UndefinedEvent, format!("no event ({task_id}, {event_id})")))
    }

    pub fn find_all_events_by_task<'a>(&self, model: &'a BpmnModel, task_id: TaskId) -> Vec<&'a WorkflowEvent> {
        model.events.values().filter(|e| e.task_id == task_id).collect()
    }

    pub fn find_tasks_by_group<'a>(&self, model: &'a BpmnModel, group: &str) -> Vec<&'a Task> {
        model.tasks.values().filter(|t| t.workflow_group == group).collect()
    }

    /// Literal value of a BPMN DataObject named `name` associated with a
    /// Task (spec §4.2).
    pub fn get_data_object<'a>(&self, task: &'a Task, name: &str) -> Option<&'a str> {
        task.data_objects.get(name).map(String::as_str)
    }
}
