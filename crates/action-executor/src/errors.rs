//! Error types for action command execution

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::types::SelectorRole;

/// Typed failures raised while resolving and validating command elements
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    /// Primary selector did not match any element within the budget
    #[error("The specified selector does not match any element in the DOM tree.")]
    ElementNotFound,

    /// Primary element exists but never became visible
    #[error("The element that matches the specified selector is not visible.")]
    ElementIsInvisible,

    /// Secondary selector did not match any element within the budget
    #[error("The specified \"{0}\" does not match any element in the DOM tree.")]
    AdditionalElementNotFound(SelectorRole),

    /// Secondary element exists but never became visible
    #[error("The element that matches the specified \"{0}\" is not visible.")]
    AdditionalElementIsInvisible(SelectorRole),

    #[error("The action element is expected to be editable (an input, textarea or element with the contentEditable attribute).")]
    ElementNonEditable,

    #[error("The action element is expected to be a <textarea>.")]
    ElementNotTextArea,

    #[error("The \"{0}\" is expected to be a contentEditable element.")]
    ElementNonContentEditable(SelectorRole),

    #[error("Content between the action elements cannot be selected because the root container for the selection range cannot be found.")]
    RootContainerNotFound,
}

impl ActionError {
    /// Stable machine-readable code reported to the test runner
    pub fn code(&self) -> &'static str {
        match self {
            ActionError::ElementNotFound => "E_ACTION_ELEMENT_NOT_FOUND",
            ActionError::ElementIsInvisible => "E_ACTION_ELEMENT_IS_INVISIBLE",
            ActionError::AdditionalElementNotFound(_) => "E_ACTION_ADDITIONAL_ELEMENT_NOT_FOUND",
            ActionError::AdditionalElementIsInvisible(_) => {
                "E_ACTION_ADDITIONAL_ELEMENT_IS_INVISIBLE"
            }
            ActionError::ElementNonEditable => "E_ACTION_ELEMENT_NON_EDITABLE",
            ActionError::ElementNotTextArea => "E_ACTION_ELEMENT_NOT_TEXT_AREA",
            ActionError::ElementNonContentEditable(_) => {
                "E_ACTION_ELEMENT_NON_CONTENT_EDITABLE"
            }
            ActionError::RootContainerNotFound => "E_ACTION_ROOT_CONTAINER_NOT_FOUND",
        }
    }

    /// Name of the command argument the error refers to, if any
    pub fn argument_name(&self) -> Option<&'static str> {
        match self {
            ActionError::AdditionalElementNotFound(role)
            | ActionError::AdditionalElementIsInvisible(role)
            | ActionError::ElementNonContentEditable(role) => Some(role.argument_name()),
            _ => None,
        }
    }
}

/// Failure reported by an automation strategy run
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("automation '{automation}' failed: {reason}")]
pub struct AutomationError {
    pub automation: String,
    pub reason: String,
}

impl AutomationError {
    pub fn new(automation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            automation: automation.into(),
            reason: reason.into(),
        }
    }
}

/// Failure reported by a settlement barrier
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BarrierError {
    #[error("barrier '{0}' was torn down before becoming quiescent")]
    Closed(String),

    #[error("barrier '{barrier}' failed: {reason}")]
    Failed { barrier: String, reason: String },
}

/// Any error that can end up in a terminal status
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Automation(#[from] AutomationError),

    #[error("settlement failed: {0}")]
    Settlement(#[from] BarrierError),

    /// Execution task ended without producing a status
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExecutionError {
    pub fn code(&self) -> &'static str {
        match self {
            ExecutionError::Action(err) => err.code(),
            ExecutionError::Automation(_) => "E_AUTOMATION_FAILED",
            ExecutionError::Settlement(_) => "E_SETTLEMENT_FAILED",
            ExecutionError::Internal(_) => "E_INTERNAL",
        }
    }

    pub fn argument_name(&self) -> Option<&'static str> {
        match self {
            ExecutionError::Action(err) => err.argument_name(),
            _ => None,
        }
    }

    /// Returns the resolution error, if this is one
    pub fn as_action(&self) -> Option<&ActionError> {
        match self {
            ExecutionError::Action(err) => Some(err),
            _ => None,
        }
    }
}

impl Serialize for ExecutionError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let argument = self.argument_name();
        let fields = if argument.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("ExecutionError", fields)?;
        state.serialize_field("code", self.code())?;
        state.serialize_field("message", &self.to_string())?;
        if let Some(name) = argument {
            state.serialize_field("argumentName", name)?;
        }
        state.end()
    }
}

/// Errors raised while assembling a [`crate::CommandExecutor`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("{0} port is required")]
    MissingPort(&'static str),
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn additional_errors_name_their_argument() {
        let err = ActionError::AdditionalElementNotFound(SelectorRole::Destination);
        assert_eq!(err.argument_name(), Some("destinationSelector"));
        assert!(err.to_string().contains("destinationSelector"));

        let err = ActionError::ElementNonContentEditable(SelectorRole::End);
        assert_eq!(err.argument_name(), Some("endSelector"));
        assert_eq!(ActionError::ElementNotFound.argument_name(), None);
    }

    #[test]
    fn execution_error_serializes_code_and_argument() {
        let err = ExecutionError::from(ActionError::AdditionalElementIsInvisible(
            SelectorRole::Start,
        ));
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["code"], "E_ACTION_ADDITIONAL_ELEMENT_IS_INVISIBLE");
        assert_eq!(value["argumentName"], "startSelector");

        let err = ExecutionError::from(AutomationError::new("click", "detached"));
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["code"], "E_AUTOMATION_FAILED");
        assert!(value.get("argumentName").is_none());
    }
}
