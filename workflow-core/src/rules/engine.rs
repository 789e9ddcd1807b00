use super::legacy;
use crate::error::WorkflowError;
use crate::item::{ItemCollection, Value};
use crate::model::WorkflowEvent;
use rhai::{Engine, Scope};
use std::cell::RefCell;
use std::rc::Rc;

/// Evaluates embedded scripts/boolean expressions against a workitem+event
/// context (spec §4.3). `rhai` stands in for the Nashorn/GraalJS engine the
/// original system embeds — see DESIGN.md.
pub struct RuleEngine {
    engine: Engine,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        engine.set_max_expr_depths(64, 64);
        register_accessors(&mut engine);
        Self { engine }
    }

    /// Expression flavor: returns a boolean; used for gateway edges
    /// (spec §4.3 "Expression").
    pub fn evaluate_condition(&self, script: &str, workitem: &ItemCollection, event: &WorkflowEvent) -> Result<bool, WorkflowError> {
        let script = self.normalize(script);
        let mut scope = self.bind_scope(workitem, event);
        self.engine
            .eval_with_scope::<bool>(&mut scope, &script)
            .map_err(|e| WorkflowError::rule_error("rules", format!("condition eval failed: {e}")))
    }

    /// Script flavor: mutates a `result` bag whose items are merged back
    /// onto the workitem on return (spec §4.3 "Script").
    pub fn evaluate_script(&self, script: &str, workitem: &ItemCollection, event: &WorkflowEvent) -> Result<ItemCollection, WorkflowError> {
        let script = self.normalize(script);
        let result = Rc::new(RefCell::new(ItemCollection::new()));
        let mut scope = self.bind_scope(workitem, event);
        scope.push("result", result.clone());

        self.engine
            .eval_with_scope::<()>(&mut scope, &script)
            .map_err(|e| WorkflowError::rule_error("rules", format!("script eval failed: {e}")))?;

        Ok(Rc::try_unwrap(result).map(RefCell::into_inner).unwrap_or_else(|rc| rc.borrow().clone()))
    }

    /// Transparently rewrites a script written against the pre-typed-accessor
    /// API (spec §4.3, §9) before handing it to `rhai`.
    fn normalize(&self, script: &str) -> String {
        if legacy::is_deprecated_script(script) {
            legacy::rewrite(script)
        } else {
            script.to_string()
        }
    }

    /// Binds `workitem` (a read-only clone; condition scripts must not have
    /// side effects on the routed-over workitem) and `taskID`/`eventID`
    /// constants into a fresh scope.
    fn bind_scope<'e>(&self, workitem: &ItemCollection, event: &WorkflowEvent) -> Scope<'e> {
        let mut scope = Scope::new();
        scope.push("workitem", workitem.clone());
        scope.push("taskID", event.task_id);
        scope.push("eventID", event.event_id);
        scope
    }
}

/// Typed accessor surface exposed to scripts as methods on `ItemCollection`
/// (`workitem.hasItem("x")`, `workitem.getItemValueString("x")`, …) — the
/// canonical surface the legacy-script shim (`rules::legacy`) rewrites
/// deprecated accessors into (spec §4.3).
fn register_accessors(engine: &mut Engine) {
    engine.register_type_with_name::<ItemCollection>("ItemCollection");
    engine.register_fn("hasItem", |w: &mut ItemCollection, name: &str| w.has_item(name));
    engine.register_fn("getItemValueString", |w: &mut ItemCollection, name: &str| w.get_item_value_string(name));
    engine.register_fn("getItemValueDouble", |w: &mut ItemCollection, name: &str| w.get_item_value_double(name));
    engine.register_fn("getItemValueLong", |w: &mut ItemCollection, name: &str| w.get_item_value_long(name));
    engine.register_fn("getItemValueBool", |w: &mut ItemCollection, name: &str| w.get_item_value_bool(name));

    engine.register_type_with_name::<Rc<RefCell<ItemCollection>>>("ResultBag");
    engine.register_fn("setItemValue", |r: &mut Rc<RefCell<ItemCollection>>, name: &str, value: &str| {
        r.borrow_mut().set_item_value(name, Value::Str(value.to_string()));
    });
    engine.register_fn("setItemValue", |r: &mut Rc<RefCell<ItemCollection>>, name: &str, value: i64| {
        r.borrow_mut().set_item_value(name, Value::I64(value));
    });
    engine.register_fn("setItemValue", |r: &mut Rc<RefCell<ItemCollection>>, name: &str, value: bool| {
        r.borrow_mut().set_item_value(name, Value::Bool(value));
    });
}
