//! Automation factory - maps a command and its resolved elements to a runnable automation

use tracing::debug;

use crate::errors::{AutomationError, ExecutionError};
use crate::ports::{AutomationDriver, DomInspector};
use crate::types::{
    ActionCommand, ClickOptions, ElementHandle, MouseOptions, ResolvedElements, TypeOptions,
};

/// A fully parameterised automation, ready to run against an [`AutomationDriver`].
#[derive(Clone, Debug, PartialEq)]
pub enum Automation {
    Click {
        element: ElementHandle,
        options: ClickOptions,
    },
    RightClick {
        element: ElementHandle,
        options: ClickOptions,
    },
    DoubleClick {
        element: ElementHandle,
        options: ClickOptions,
    },
    Hover {
        element: ElementHandle,
        options: MouseOptions,
    },
    DragToOffset {
        element: ElementHandle,
        offset_x: i32,
        offset_y: i32,
        options: MouseOptions,
    },
    DragToElement {
        element: ElementHandle,
        destination: ElementHandle,
        options: MouseOptions,
    },
    TypeText {
        element: ElementHandle,
        text: String,
        options: TypeOptions,
    },
    SelectText {
        element: ElementHandle,
        start_pos: usize,
        end_pos: usize,
    },
    SelectEditableContent {
        start: ElementHandle,
        end: ElementHandle,
    },
}

impl Automation {
    pub fn name(&self) -> &'static str {
        match self {
            Automation::Click { .. } => "click",
            Automation::RightClick { .. } => "right-click",
            Automation::DoubleClick { .. } => "double-click",
            Automation::Hover { .. } => "hover",
            Automation::DragToOffset { .. } => "drag-to-offset",
            Automation::DragToElement { .. } => "drag-to-element",
            Automation::TypeText { .. } => "type",
            Automation::SelectText { .. } => "select-text",
            Automation::SelectEditableContent { .. } => "select-editable-content",
        }
    }

    pub async fn run(&self, driver: &dyn AutomationDriver) -> Result<(), AutomationError> {
        debug!(automation = self.name(), "Running automation");
        match self {
            Automation::Click { element, options } => driver.click(element, options).await,
            Automation::RightClick { element, options } => {
                driver.right_click(element, options).await
            }
            Automation::DoubleClick { element, options } => {
                driver.double_click(element, options).await
            }
            Automation::Hover { element, options } => driver.hover(element, options).await,
            Automation::DragToOffset {
                element,
                offset_x,
                offset_y,
                options,
            } => {
                driver
                    .drag_to_offset(element, (*offset_x, *offset_y), options)
                    .await
            }
            Automation::DragToElement {
                element,
                destination,
                options,
            } => driver.drag_to_element(element, destination, options).await,
            Automation::TypeText {
                element,
                text,
                options,
            } => driver.type_text(element, text, options).await,
            Automation::SelectText {
                element,
                start_pos,
                end_pos,
            } => driver.select_text(element, *start_pos, *end_pos).await,
            Automation::SelectEditableContent { start, end } => {
                driver.select_editable_content(start, end).await
            }
        }
    }
}

/// Build the automation for `command` from the elements the resolver produced.
///
/// Fails only when `elements` does not hold the positions the command kind
/// needs, which the resolver guarantees never happens.
pub fn create_automation(
    elements: &ResolvedElements,
    command: &ActionCommand,
    dom: &dyn DomInspector,
) -> Result<Automation, ExecutionError> {
    let automation = match command {
        ActionCommand::Click { options, .. } => Automation::Click {
            element: element_at(elements, 0)?,
            options: options.clone(),
        },
        ActionCommand::RightClick { options, .. } => Automation::RightClick {
            element: element_at(elements, 0)?,
            options: options.clone(),
        },
        ActionCommand::DoubleClick { options, .. } => Automation::DoubleClick {
            element: element_at(elements, 0)?,
            options: options.clone(),
        },
        ActionCommand::Hover { options, .. } => Automation::Hover {
            element: element_at(elements, 0)?,
            options: options.clone(),
        },
        ActionCommand::Drag {
            drag_offset_x,
            drag_offset_y,
            options,
            ..
        } => Automation::DragToOffset {
            element: element_at(elements, 0)?,
            offset_x: *drag_offset_x,
            offset_y: *drag_offset_y,
            options: options.clone(),
        },
        ActionCommand::DragToElement { options, .. } => Automation::DragToElement {
            element: element_at(elements, 0)?,
            destination: element_at(elements, 1)?,
            options: options.clone(),
        },
        ActionCommand::TypeText { text, options, .. } => Automation::TypeText {
            element: element_at(elements, 0)?,
            text: text.clone(),
            options: options.clone(),
        },
        ActionCommand::SelectText {
            start_pos, end_pos, ..
        } => {
            let element = element_at(elements, 0)?;
            let value = dom.element_value(&element);
            let (start_pos, end_pos) = select_text_positions(&value, *start_pos, *end_pos);
            Automation::SelectText {
                element,
                start_pos,
                end_pos,
            }
        }
        ActionCommand::SelectTextAreaContent {
            start_line,
            start_pos,
            end_line,
            end_pos,
            ..
        } => {
            let element = element_at(elements, 0)?;
            let value = dom.element_value(&element);
            let (start_pos, end_pos) = text_area_positions(
                &value,
                TextAreaRange {
                    start_line: *start_line,
                    start_pos: *start_pos,
                    end_line: *end_line,
                    end_pos: *end_pos,
                },
            );
            Automation::SelectText {
                element,
                start_pos,
                end_pos,
            }
        }
        ActionCommand::SelectEditableContent { .. } => Automation::SelectEditableContent {
            start: element_at(elements, 0)?,
            end: element_at(elements, 1)?,
        },
    };
    Ok(automation)
}

fn element_at(elements: &ResolvedElements, index: usize) -> Result<ElementHandle, ExecutionError> {
    elements.get(index).cloned().ok_or_else(|| {
        ExecutionError::Internal(format!(
            "resolved element set has {} element(s), position {} required",
            elements.len(),
            index
        ))
    })
}

/// Selection bounds for a plain text field.
///
/// A zero or missing start selects from the beginning, a missing end selects to
/// the end of the value; both are clamped to the value length. A start past the
/// end is kept so the selection runs backwards.
pub fn select_text_positions(
    value: &str,
    start_pos: Option<usize>,
    end_pos: Option<usize>,
) -> (usize, usize) {
    let last = value.chars().count();
    let start = match start_pos {
        Some(pos) if pos > 0 => pos.min(last),
        _ => 0,
    };
    let end = end_pos.map_or(last, |pos| pos.min(last));
    (start, end)
}

/// Line/offset selection arguments for a text area
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextAreaRange {
    pub start_line: Option<usize>,
    pub start_pos: Option<usize>,
    pub end_line: Option<usize>,
    pub end_pos: Option<usize>,
}

/// Convert line/offset arguments into absolute offsets within `value`.
pub fn text_area_positions(value: &str, range: TextAreaRange) -> (usize, usize) {
    let lines: Vec<usize> = value.split('\n').map(|line| line.chars().count()).collect();
    let last_line = lines.len().saturating_sub(1);

    let start_line = range.start_line.unwrap_or(0).min(last_line);
    let start_offset = range.start_pos.unwrap_or(0).min(lines[start_line]);

    let end_line = range.end_line.map_or(last_line, |line| line.min(last_line));
    let end_offset = range
        .end_pos
        .map_or(lines[end_line], |pos| pos.min(lines[end_line]));

    (
        line_start(&lines, start_line) + start_offset,
        line_start(&lines, end_line) + end_offset,
    )
}

fn line_start(lines: &[usize], line: usize) -> usize {
    lines[..line].iter().map(|len| len + 1).sum()
}
