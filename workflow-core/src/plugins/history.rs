use super::{Plugin, WorkflowContext};
use crate::error::WorkflowError;
use crate::item::{ItemCollection, Value, ITEM_SNAPSHOT_HISTORY};
use crate::model::WorkflowEvent;
use chrono::Utc;

/// Appends a human-readable audit line to `$snapshot.history` on every
/// step, analogous to the teacher's `RuntimeEvent` audit trail but written
/// directly onto the workitem rather than a separate event log (spec
/// §3.1 reserves `$snapshot.history`; the kernel itself only maintains the
/// minimal `$lasteventid`/`$lasteventdate` bookkeeping required by spec §4.1
/// step 5). Captures the step's caller identity off `WorkflowContext` at
/// registration so the audit line records who triggered it.
#[derive(Default)]
pub struct HistoryPlugin {
    caller: String,
}

impl Plugin for HistoryPlugin {
    fn name(&self) -> &str {
        "history"
    }

    fn init(&mut self, ctx: &WorkflowContext) -> Result<(), WorkflowError> {
        self.caller = ctx.caller.clone();
        Ok(())
    }

    fn run(&mut self, workitem: &mut ItemCollection, event: &WorkflowEvent) -> Result<(), WorkflowError> {
        let line = format!("{}@{} by {}: {}", event.event_id, Utc::now().to_rfc3339(), self.caller, event.name);
        workitem.append_item_value(ITEM_SNAPSHOT_HISTORY, Value::Str(line));
        Ok(())
    }
}
