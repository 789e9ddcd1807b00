use super::Plugin;
use crate::error::WorkflowError;
use crate::item::{ItemCollection, Value};
use crate::model::WorkflowEvent;
use crate::text;

/// Pre-resolves the Event's mail subject/body templates against the
/// workitem and writes the resolved text onto `$mailsubject`/`$mailbody`
/// (spec §4.6), for external collaborators (REST/JSF, out of scope here)
/// that need the rendered text without re-implementing the directive
/// grammar themselves.
pub struct TextSubstitutionPlugin;

impl Plugin for TextSubstitutionPlugin {
    fn name(&self) -> &str {
        "text-substitution"
    }

    fn run(&mut self, workitem: &mut ItemCollection, event: &WorkflowEvent) -> Result<(), WorkflowError> {
        if let Some(subject) = &event.mail_subject {
            let resolved = text::adapt_text(subject, workitem);
            workitem.set_item_value("$mailsubject", Value::Str(resolved));
        }
        if let Some(body) = &event.mail_body {
            let resolved = text::adapt_text(body, workitem);
            workitem.set_item_value("$mailbody", Value::Str(resolved));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Successor;

    #[test]
    fn resolves_templates_onto_dollar_mail_items() {
        let mut plugin = TextSubstitutionPlugin;
        let mut w = ItemCollection::new();
        w.set_item_value("txtname", Value::Str("X-1".into()));
        let event = WorkflowEvent {
            task_id: 100,
            event_id: 10,
            name: "submit".into(),
            successor: Successor::Task(200),
            adapters: vec![],
            mail_subject: Some("Ticket <itemvalue>txtname</itemvalue>".into()),
            mail_body: Some("<itemvalue>txtname</itemvalue> was submitted".into()),
            mail_inactive: false,
            rule_script: None,
            acl: Default::default(),
            follow_up_event: None,
        };
        plugin.run(&mut w, &event).unwrap();
        assert_eq!(w.get_item_value_string("$mailsubject"), "Ticket X-1");
        assert_eq!(w.get_item_value_string("$mailbody"), "X-1 was submitted");
    }
}
