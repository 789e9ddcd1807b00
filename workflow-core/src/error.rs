use thiserror::Error;

/// Error taxonomy for the kernel and its immediate collaborators (spec §7).
///
/// `RuleError` is carried as a `PluginError` sub-code rather than its own
/// variant, matching spec §7's "a sub-kind of PluginError".
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("model error [{code}]: {message}")]
    Model { code: ModelErrorCode, message: String },

    #[error("processing error: {0}")]
    Processing(String),

    #[error("plugin '{plugin}' failed [{code}]: {message}")]
    Plugin {
        plugin: String,
        code: String,
        message: String,
    },

    #[error("scheduler error [{code}]: {message}")]
    Scheduler {
        code: SchedulerErrorCode,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelErrorCode {
    UndefinedModelEntry,
    InvalidModelEntry,
    DuplicateEventId,
    CyclicFollowUp,
    UndefinedTask,
    UndefinedEvent,
}

impl std::fmt::Display for ModelErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ModelErrorCode::UndefinedModelEntry => "UNDEFINED_MODEL_ENTRY",
            ModelErrorCode::InvalidModelEntry => "INVALID_MODEL_ENTRY",
            ModelErrorCode::DuplicateEventId => "DUPLICATE_EVENT_ID",
            ModelErrorCode::CyclicFollowUp => "CYCLIC_FOLLOWUP",
            ModelErrorCode::UndefinedTask => "UNDEFINED_TASK",
            ModelErrorCode::UndefinedEvent => "UNDEFINED_EVENT",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerErrorCode {
    InvalidCalendarExpression,
    ImplementationNotFound,
    StorageFailure,
}

impl std::fmt::Display for SchedulerErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SchedulerErrorCode::InvalidCalendarExpression => "INVALID_CALENDAR_EXPRESSION",
            SchedulerErrorCode::ImplementationNotFound => "IMPLEMENTATION_NOT_FOUND",
            SchedulerErrorCode::StorageFailure => "STORAGE_FAILURE",
        };
        write!(f, "{s}")
    }
}

impl WorkflowError {
    pub fn model(code: ModelErrorCode, message: impl Into<String>) -> Self {
        WorkflowError::Model {
            code,
            message: message.into(),
        }
    }

    pub fn plugin(plugin: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        WorkflowError::Plugin {
            plugin: plugin.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn rule_error(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        WorkflowError::Plugin {
            plugin: plugin.into(),
            code: "RULE_ERROR".to_string(),
            message: message.into(),
        }
    }

    pub fn scheduler(code: SchedulerErrorCode, message: impl Into<String>) -> Self {
        WorkflowError::Scheduler {
            code,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
