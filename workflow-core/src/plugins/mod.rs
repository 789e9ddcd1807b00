pub mod history;
pub mod mail;
pub mod text_substitution;
pub mod util;

use crate::error::WorkflowError;
use crate::item::ItemCollection;
use crate::model::{ModelManager, WorkflowEvent};
use crate::store::DocumentStore;
use std::sync::Arc;

pub use history::HistoryPlugin;
pub use mail::{MailMessage, MailPlugin, MailSink};
pub use text_substitution::TextSubstitutionPlugin;

/// Handle a plugin receives once at registration (spec §6.2): caller
/// identity plus the long-lived collaborators (model manager, document
/// store). `caller` is consulted by plugins that need to attribute a step
/// to its actor — `HistoryPlugin` captures it in `init` and records it on
/// every audit line. The caller identity for *this particular step* is
/// passed separately to `Kernel::process` since it varies per call while
/// the collaborator handles are fixed for the kernel's lifetime — an Open
/// Question resolution, see DESIGN.md.
pub struct WorkflowContext {
    pub caller: String,
    pub models: Arc<ModelManager>,
    pub store: Arc<dyn DocumentStore>,
}

/// A registered side-effect unit run on every process step (spec §6.2,
/// §9 "interface + vtable, not inheritance"). Plugins are owned by the
/// kernel as `Box<dyn Plugin>` in registration order.
pub trait Plugin: Send {
    fn name(&self) -> &str;

    fn init(&mut self, _ctx: &WorkflowContext) -> Result<(), WorkflowError> {
        Ok(())
    }

    fn run(&mut self, workitem: &mut ItemCollection, event: &WorkflowEvent) -> Result<(), WorkflowError>;

    /// Called once per step, in reverse registration order, after the
    /// kernel has committed the transition. `rollback` is `true` only when
    /// a later plugin in the chain failed (spec §4.1 step 3/7).
    fn close(&mut self, _rollback: bool) -> Result<(), WorkflowError> {
        Ok(())
    }
}
