use crate::item::{ItemCollection, ITEM_OWNER, ITEM_PARTICIPANTS, ITEM_READACCESS, ITEM_WRITEACCESS};
use crate::model::{AccessAnnotation, Task, WorkflowEvent};
use crate::plugins::util::dedupe_preserve_order;
use crate::text;
use crate::item::Value;

/// Outcome of an ACL recomputation (spec §4.4): either nothing changes, or
/// all three lists are replaced wholesale — never merged with the prior
/// value.
pub enum AclDelta {
    Unchanged,
    Replace {
        read_access: Vec<String>,
        write_access: Vec<String>,
        owner: Vec<String>,
    },
}

/// Recomputes `$readAccess`/`$writeAccess`/`$owner` from the event's or the
/// next Task's ACL annotations (spec §4.4). Event and Task annotations
/// never merge: if the event declares `keyupdateacl=true` it wins outright,
/// otherwise the next Task's annotation is used if it declares the flag,
/// otherwise the ACL is left untouched.
pub fn resolve_acl(workitem: &ItemCollection, event: &WorkflowEvent, next_task: &Task) -> AclDelta {
    let acl = if event.acl.update_acl {
        &event.acl
    } else if next_task.acl.update_acl {
        &next_task.acl
    } else {
        return AclDelta::Unchanged;
    };

    AclDelta::Replace {
        read_access: resolve_annotation(&acl.read_access, workitem),
        write_access: resolve_annotation(&acl.write_access, workitem),
        owner: resolve_annotation(&acl.owner, workitem),
    }
}

fn resolve_annotation(annotation: &AccessAnnotation, workitem: &ItemCollection) -> Vec<String> {
    let mut names = Vec::new();
    for literal in &annotation.names {
        let adapted = text::adapt_text(literal, workitem);
        names.extend(adapted.split(',').map(|s| s.trim().to_string()));
    }
    for field in &annotation.fields {
        match inline_list(field) {
            Some(values) => names.extend(values),
            None => names.extend(workitem.get_item_value_string_list(field)),
        }
    }
    dedupe_preserve_order(&names)
}

/// A field spec in `[a,b]` or `{a,b}` form is a literal inline list rather
/// than a reference to a workitem item (spec §4.4).
fn inline_list(field: &str) -> Option<Vec<String>> {
    let trimmed = field.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .or_else(|| trimmed.strip_prefix('{').and_then(|s| s.strip_suffix('}')))?;
    Some(inner.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
}

pub fn apply_delta(workitem: &mut ItemCollection, delta: AclDelta) {
    if let AclDelta::Replace { read_access, write_access, owner } = delta {
        workitem.set_item_value_list(ITEM_READACCESS, read_access.into_iter().map(Value::Str).collect());
        workitem.set_item_value_list(ITEM_WRITEACCESS, write_access.into_iter().map(Value::Str).collect());
        // mirrors to the legacy `namowner` alias automatically (item::collection).
        workitem.set_item_value_list(ITEM_OWNER, owner.into_iter().map(Value::Str).collect());
    }
}

/// `$participants` is an append-only set of every caller identity that has
/// ever stepped this workitem (spec §4.4).
pub fn append_participant(workitem: &mut ItemCollection, caller: &str) {
    if caller.is_empty() {
        return;
    }
    let mut participants = workitem.get_item_value_string_list(ITEM_PARTICIPANTS);
    participants.push(caller.to_string());
    let deduped = dedupe_preserve_order(&participants);
    workitem.set_item_value_list(ITEM_PARTICIPANTS, deduped.into_iter().map(Value::Str).collect());
}
