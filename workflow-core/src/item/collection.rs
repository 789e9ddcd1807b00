use super::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ─── Reserved workflow items (spec §3.1) ───────────────────────

pub const ITEM_UNIQUEID: &str = "$uniqueid";
pub const ITEM_MODELVERSION: &str = "$modelversion";
pub const ITEM_TASKID: &str = "$taskid";
pub const ITEM_EVENTID: &str = "$eventid";
pub const ITEM_WORKFLOWGROUP: &str = "$workflowgroup";
pub const ITEM_WORKFLOWSTATUS: &str = "$workflowstatus";
pub const ITEM_READACCESS: &str = "$readaccess";
pub const ITEM_WRITEACCESS: &str = "$writeaccess";
pub const ITEM_OWNER: &str = "$owner";
pub const ITEM_PARTICIPANTS: &str = "$participants";
pub const ITEM_LASTEVENTDATE: &str = "$lasteventdate";
pub const ITEM_LASTEVENTID: &str = "$lasteventid";
pub const ITEM_CREATOR: &str = "$creator";
pub const ITEM_CREATED: &str = "$created";
pub const ITEM_MODIFIED: &str = "$modified";
pub const ITEM_SNAPSHOT_HISTORY: &str = "$snapshot.history";
pub const ITEM_FILE: &str = "$file";
pub const ITEM_FILE_COUNT: &str = "$file.count";
pub const ITEM_FILE_NAMES: &str = "$file.names";

/// Deprecated alias pairs that must be accepted on read and mirror-written
/// on write for one major version (spec §3.1).
const DEPRECATED_ALIASES: &[(&str, &str)] = &[
    ("$processid", "$taskid"),
    ("$activityid", "$eventid"),
    ("txtname", "name"),
    ("namowner", "$owner"),
];

fn normalize_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Resolve a deprecated alias to its canonical name, if any, and vice versa.
fn alias_pair(key: &str) -> Option<(&'static str, &'static str)> {
    DEPRECATED_ALIASES.iter().find_map(|&(dep, canon)| {
        if key == dep {
            Some((dep, canon))
        } else if key == canon {
            Some((dep, canon))
        } else {
            None
        }
    })
}

/// Schemaless document: item name (case-folded, trimmed) -> ordered list of
/// typed values (spec §3.1). Every reader must cope with empty lists.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ItemCollection {
    items: BTreeMap<String, Vec<Value>>,
}

impl ItemCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single value, replacing any prior value list. `null`-like
    /// removal isn't modeled directly here — callers wanting "null -> remove"
    /// semantics (spec §8 invariant 5) should call `remove_item` instead.
    pub fn set_item_value(&mut self, name: &str, value: Value) {
        self.set_item_value_list(name, vec![value]);
    }

    /// Set the full ordered value list for an item, mirroring any
    /// deprecated alias (spec §3.1).
    pub fn set_item_value_list(&mut self, name: &str, values: Vec<Value>) {
        let key = normalize_key(name);
        self.items.insert(key.clone(), values.clone());
        if let Some((dep, canon)) = alias_pair(&key) {
            let mirror = if key == normalize_key(dep) { canon } else { dep };
            self.items.insert(normalize_key(mirror), values);
        }
    }

    /// Always returns a list, empty if the item is absent (spec §3.1
    /// invariant: "readers must handle empty lists").
    pub fn get_item_value(&self, name: &str) -> Vec<Value> {
        self.items
            .get(&normalize_key(name))
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_item_value_string(&self, name: &str) -> String {
        self.get_item_value(name)
            .first()
            .map(Value::to_display_string)
            .unwrap_or_default()
    }

    pub fn get_item_value_long(&self, name: &str) -> i64 {
        self.get_item_value(name)
            .first()
            .and_then(Value::as_i64)
            .unwrap_or(0)
    }

    pub fn get_item_value_double(&self, name: &str) -> f64 {
        self.get_item_value(name)
            .first()
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
    }

    pub fn get_item_value_bool(&self, name: &str) -> bool {
        self.get_item_value(name)
            .first()
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn get_item_value_string_list(&self, name: &str) -> Vec<String> {
        self.get_item_value(name)
            .iter()
            .map(Value::to_display_string)
            .collect()
    }

    pub fn has_item(&self, name: &str) -> bool {
        self.items.contains_key(&normalize_key(name))
    }

    /// Remove an item, mirroring removal onto its deprecated alias if any.
    pub fn remove_item(&mut self, name: &str) {
        let key = normalize_key(name);
        self.items.remove(&key);
        if let Some((dep, canon)) = alias_pair(&key) {
            let mirror = if key == normalize_key(dep) { canon } else { dep };
            self.items.remove(&normalize_key(mirror));
        }
    }

    pub fn item_names(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    /// Append a value onto an item's list rather than replacing it (used by
    /// history logging and `$participants`).
    pub fn append_item_value(&mut self, name: &str, value: Value) {
        let key = normalize_key(name);
        self.items.entry(key).or_default().push(value);
    }

    /// Merge `other`'s items into `self`, item-by-item replacement
    /// (spec §3.1 "merge"). Used when forking split workitems and when
    /// rule-engine scripts return a `result` bag (spec §4.3).
    pub fn merge_item_collection(&mut self, other: &ItemCollection) {
        for (k, v) in other.items.iter() {
            self.items.insert(k.clone(), v.clone());
        }
    }

    /// Structural deep clone (spec §9: "as a structural walk ... not via
    /// byte-level round-trip"). `Value` itself is always owned, so a plain
    /// `Clone` already produces a fully independent graph — no shared
    /// sub-structure survives because `Vec`/`BTreeMap`/`String` clone deep.
    pub fn deep_clone(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_case_insensitive_and_trimmed() {
        let mut w = ItemCollection::new();
        w.set_item_value("  $TaskID ", Value::I64(100));
        assert_eq!(w.get_item_value_long("$taskid"), 100);
    }

    #[test]
    fn missing_item_returns_empty_list_not_panic() {
        let w = ItemCollection::new();
        assert!(w.get_item_value("nope").is_empty());
    }

    #[test]
    fn deprecated_alias_mirrors_both_directions() {
        let mut w = ItemCollection::new();
        w.set_item_value("$taskid", Value::I64(200));
        assert_eq!(w.get_item_value_long("$processid"), 200);

        let mut w2 = ItemCollection::new();
        w2.set_item_value("$processid", Value::I64(300));
        assert_eq!(w2.get_item_value_long("$taskid"), 300);
    }

    #[test]
    fn deep_clone_does_not_share_structure() {
        let mut w = ItemCollection::new();
        w.set_item_value_list("tags", vec![Value::Str("a".into())]);
        let mut cloned = w.deep_clone();
        cloned.append_item_value("tags", Value::Str("b".into()));
        assert_eq!(w.get_item_value("tags").len(), 1);
        assert_eq!(cloned.get_item_value("tags").len(), 2);
    }
}
