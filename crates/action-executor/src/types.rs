//! Core data types for action commands

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ExecutionError;

/// Opaque reference to a live element produced by the selector evaluator.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(pub String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Logical position a selector occupies within a command
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SelectorRole {
    Primary,
    Start,
    End,
    Destination,
}

impl SelectorRole {
    /// Command argument carrying the selector for this role
    pub fn argument_name(&self) -> &'static str {
        match self {
            SelectorRole::Primary => "selector",
            SelectorRole::Start => "startSelector",
            SelectorRole::End => "endSelector",
            SelectorRole::Destination => "destinationSelector",
        }
    }

    pub fn is_primary(&self) -> bool {
        matches!(self, SelectorRole::Primary)
    }
}

impl fmt::Display for SelectorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.argument_name())
    }
}

/// Keyboard modifiers held during a pointer or keyboard action
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MouseOptions {
    pub offset_x: Option<i32>,
    pub offset_y: Option<i32>,
    pub modifiers: Modifiers,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClickOptions {
    #[serde(flatten)]
    pub mouse: MouseOptions,
    pub caret_pos: Option<usize>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TypeOptions {
    #[serde(flatten)]
    pub click: ClickOptions,
    /// Clear the current value before typing
    pub replace: bool,
}

/// Fieldless discriminator of [`ActionCommand`], used for logging and dispatch
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Click,
    RightClick,
    DoubleClick,
    Hover,
    Drag,
    DragToElement,
    TypeText,
    SelectText,
    SelectTextAreaContent,
    SelectEditableContent,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::RightClick => "right-click",
            ActionKind::DoubleClick => "double-click",
            ActionKind::Hover => "hover",
            ActionKind::Drag => "drag",
            ActionKind::DragToElement => "drag-to-element",
            ActionKind::TypeText => "type-text",
            ActionKind::SelectText => "select-text",
            ActionKind::SelectTextAreaContent => "select-text-area-content",
            ActionKind::SelectEditableContent => "select-editable-content",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative request to perform one UI action against page elements.
///
/// Deserialized from the test runner's JSON payload, discriminated by `type`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActionCommand {
    Click {
        selector: String,
        #[serde(default)]
        options: ClickOptions,
    },
    RightClick {
        selector: String,
        #[serde(default)]
        options: ClickOptions,
    },
    DoubleClick {
        selector: String,
        #[serde(default)]
        options: ClickOptions,
    },
    Hover {
        selector: String,
        #[serde(default)]
        options: MouseOptions,
    },
    #[serde(rename_all = "camelCase")]
    Drag {
        selector: String,
        drag_offset_x: i32,
        drag_offset_y: i32,
        #[serde(default)]
        options: MouseOptions,
    },
    #[serde(rename_all = "camelCase")]
    DragToElement {
        selector: String,
        destination_selector: String,
        #[serde(default)]
        options: MouseOptions,
    },
    TypeText {
        selector: String,
        text: String,
        #[serde(default)]
        options: TypeOptions,
    },
    #[serde(rename_all = "camelCase")]
    SelectText {
        selector: String,
        #[serde(default)]
        start_pos: Option<usize>,
        #[serde(default)]
        end_pos: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    SelectTextAreaContent {
        selector: String,
        #[serde(default)]
        start_line: Option<usize>,
        #[serde(default)]
        start_pos: Option<usize>,
        #[serde(default)]
        end_line: Option<usize>,
        #[serde(default)]
        end_pos: Option<usize>,
    },
    #[serde(rename_all = "camelCase")]
    SelectEditableContent {
        start_selector: String,
        #[serde(default)]
        end_selector: Option<String>,
    },
}

impl ActionCommand {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionCommand::Click { .. } => ActionKind::Click,
            ActionCommand::RightClick { .. } => ActionKind::RightClick,
            ActionCommand::DoubleClick { .. } => ActionKind::DoubleClick,
            ActionCommand::Hover { .. } => ActionKind::Hover,
            ActionCommand::Drag { .. } => ActionKind::Drag,
            ActionCommand::DragToElement { .. } => ActionKind::DragToElement,
            ActionCommand::TypeText { .. } => ActionKind::TypeText,
            ActionCommand::SelectText { .. } => ActionKind::SelectText,
            ActionCommand::SelectTextAreaContent { .. } => ActionKind::SelectTextAreaContent,
            ActionCommand::SelectEditableContent { .. } => ActionKind::SelectEditableContent,
        }
    }

    /// Primary target selector, for commands that have one
    pub fn selector(&self) -> Option<&str> {
        match self {
            ActionCommand::Click { selector, .. }
            | ActionCommand::RightClick { selector, .. }
            | ActionCommand::DoubleClick { selector, .. }
            | ActionCommand::Hover { selector, .. }
            | ActionCommand::Drag { selector, .. }
            | ActionCommand::DragToElement { selector, .. }
            | ActionCommand::TypeText { selector, .. }
            | ActionCommand::SelectText { selector, .. }
            | ActionCommand::SelectTextAreaContent { selector, .. } => Some(selector),
            ActionCommand::SelectEditableContent { .. } => None,
        }
    }

    /// Selectors that must resolve before the action can run, in element-set order.
    ///
    /// An empty primary selector counts as absent, which shifts any secondary
    /// role to position 0. A drag-to-element without a primary selector then
    /// lacks its destination position and ends with an internal error. For
    /// editable-content selection the end selector falls back to the start
    /// selector.
    pub fn required_selectors(&self) -> Vec<(SelectorRole, &str)> {
        let mut roles = Vec::with_capacity(2);
        if let Some(selector) = self.selector().filter(|s| !s.is_empty()) {
            roles.push((SelectorRole::Primary, selector));
        }
        match self {
            ActionCommand::DragToElement {
                destination_selector,
                ..
            } => roles.push((SelectorRole::Destination, destination_selector.as_str())),
            ActionCommand::SelectEditableContent {
                start_selector,
                end_selector,
            } => {
                let end = end_selector
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .unwrap_or(start_selector);
                roles.push((SelectorRole::Start, start_selector.as_str()));
                roles.push((SelectorRole::End, end));
            }
            _ => {}
        }
        roles
    }
}

/// Ordered elements resolved for one command: index 0 is the primary (or start)
/// target, index 1 the secondary (destination or end) target.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedElements(Vec<ElementHandle>);

impl ResolvedElements {
    pub fn new(elements: Vec<ElementHandle>) -> Self {
        Self(elements)
    }

    pub fn get(&self, index: usize) -> Option<&ElementHandle> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Terminal outcome of one command, reported back to the test runner
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverStatus {
    pub is_command_result: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_error: Option<ExecutionError>,
}

impl DriverStatus {
    pub fn success() -> Self {
        Self {
            is_command_result: true,
            execution_error: None,
        }
    }

    pub fn failure(error: impl Into<ExecutionError>) -> Self {
        Self {
            is_command_result: true,
            execution_error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.execution_error.is_none()
    }
}
