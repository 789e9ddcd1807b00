use super::Plugin;
use crate::error::WorkflowError;
use crate::item::{ItemCollection, ITEM_OWNER};
use crate::model::WorkflowEvent;
use crate::text;
use std::sync::Arc;

/// A resolved, ready-to-send message. The kernel never delivers mail
/// itself (spec §1 Non-goals) — this is the narrow handoff shape to an
/// external transport.
#[derive(Clone, Debug, PartialEq)]
pub struct MailMessage {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}

/// The external mail-transport collaborator boundary (spec §1: "Mail
/// delivery ... out of scope"). `MailPlugin` only ever stages messages onto
/// this trait object, never sends over SMTP directly.
pub trait MailSink: Send + Sync {
    fn send(&self, message: MailMessage) -> anyhow::Result<()>;
}

/// Stages a `MailMessage` per step from the Event's `mail_subject`/
/// `mail_body` templates, and flushes them to the `MailSink` at `close`
/// time (spec §4.1 step 7: deferred I/O, discarded on rollback).
pub struct MailPlugin {
    sink: Arc<dyn MailSink>,
    pending: Vec<MailMessage>,
}

impl MailPlugin {
    pub fn new(sink: Arc<dyn MailSink>) -> Self {
        Self { sink, pending: Vec::new() }
    }
}

impl Plugin for MailPlugin {
    fn name(&self) -> &str {
        "mail"
    }

    fn run(&mut self, workitem: &mut ItemCollection, event: &WorkflowEvent) -> Result<(), WorkflowError> {
        if event.mail_inactive {
            return Ok(());
        }
        let (Some(subject_tpl), Some(body_tpl)) = (&event.mail_subject, &event.mail_body) else {
            return Ok(());
        };
        self.pending.push(MailMessage {
            subject: text::adapt_text(subject_tpl, workitem),
            body: text::adapt_text(body_tpl, workitem),
            recipients: workitem.get_item_value_string_list(ITEM_OWNER),
        });
        Ok(())
    }

    fn close(&mut self, rollback: bool) -> Result<(), WorkflowError> {
        if rollback {
            self.pending.clear();
            return Ok(());
        }
        for message in self.pending.drain(..) {
            self.sink.send(message).map_err(|e| WorkflowError::plugin("mail", "MAIL_SEND_FAILED", e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Value;
    use crate::model::Successor;
    use std::sync::Mutex;

    struct RecordingSink(Mutex<Vec<MailMessage>>);

    impl MailSink for RecordingSink {
        fn send(&self, message: MailMessage) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn test_event(mail_inactive: bool) -> WorkflowEvent {
        WorkflowEvent {
            task_id: 100,
            event_id: 10,
            name: "submit".into(),
            successor: Successor::Task(200),
            adapters: vec![],
            mail_subject: Some("Ticket <itemvalue>txtname</itemvalue>".into()),
            mail_body: Some("Body".into()),
            mail_inactive,
            rule_script: None,
            acl: Default::default(),
            follow_up_event: None,
        }
    }

    #[test]
    fn flushes_staged_mail_on_close_not_on_run() {
        let sink = Arc::new(RecordingSink(Mutex::new(Vec::new())));
        let mut plugin = MailPlugin::new(sink.clone());
        let mut w = ItemCollection::new();
        w.set_item_value("txtname", Value::Str("X-1".into()));

        plugin.run(&mut w, &test_event(false)).unwrap();
        assert!(sink.0.lock().unwrap().is_empty());

        plugin.close(false).unwrap();
        let sent = sink.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Ticket X-1");
    }

    #[test]
    fn rollback_discards_pending_mail() {
        let sink = Arc::new(RecordingSink(Mutex::new(Vec::new())));
        let mut plugin = MailPlugin::new(sink.clone());
        let mut w = ItemCollection::new();
        plugin.run(&mut w, &test_event(false)).unwrap();
        plugin.close(true).unwrap();
        assert!(sink.0.lock().unwrap().is_empty());
    }

    #[test]
    fn mail_inactive_flag_skips_staging() {
        let sink = Arc::new(RecordingSink(Mutex::new(Vec::new())));
        let mut plugin = MailPlugin::new(sink.clone());
        let mut w = ItemCollection::new();
        plugin.run(&mut w, &test_event(true)).unwrap();
        plugin.close(false).unwrap();
        assert!(sink.0.lock().unwrap().is_empty());
    }
}
