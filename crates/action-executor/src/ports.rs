//! Collaborator interfaces consumed by the executor.
//!
//! Concrete browser plumbing (selector evaluation, DOM predicates, pointer and
//! keyboard automation, request and unload tracking) lives behind these traits.

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::{AutomationError, BarrierError};
use crate::types::{ClickOptions, ElementHandle, MouseOptions, TypeOptions};

/// Evaluates a selector expression against the current document.
pub trait SelectorEvaluator: Send + Sync {
    fn resolve(&self, selector: &str) -> Option<ElementHandle>;
}

/// Low-level DOM predicates.
pub trait DomInspector: Send + Sync {
    fn is_visible(&self, element: &ElementHandle) -> bool;
    fn is_editable(&self, element: &ElementHandle) -> bool;
    fn is_text_area(&self, element: &ElementHandle) -> bool;
    fn is_content_editable(&self, element: &ElementHandle) -> bool;
    fn nearest_common_ancestor(
        &self,
        first: &ElementHandle,
        second: &ElementHandle,
    ) -> Option<ElementHandle>;
    /// Current text value used to compute selection bounds
    fn element_value(&self, element: &ElementHandle) -> String;
}

/// On-page "waiting for element" indicator.
pub trait WaitingIndicator: Send + Sync {
    fn show(&self, message: &str, timeout: Duration);
    fn close(&self, succeeded: bool);
}

/// Tracks in-flight activity and resolves once nothing is pending.
#[async_trait]
pub trait Barrier: Send + Sync {
    async fn wait_until_quiescent(&self) -> Result<(), BarrierError>;
}

/// Opens a fresh network barrier for each command.
pub trait NetworkBarrierFactory: Send + Sync {
    fn open(&self) -> Box<dyn Barrier>;
}

/// Performs the actual pointer, keyboard and selection automation.
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    async fn click(
        &self,
        element: &ElementHandle,
        options: &ClickOptions,
    ) -> Result<(), AutomationError>;

    async fn right_click(
        &self,
        element: &ElementHandle,
        options: &ClickOptions,
    ) -> Result<(), AutomationError>;

    async fn double_click(
        &self,
        element: &ElementHandle,
        options: &ClickOptions,
    ) -> Result<(), AutomationError>;

    async fn hover(
        &self,
        element: &ElementHandle,
        options: &MouseOptions,
    ) -> Result<(), AutomationError>;

    async fn drag_to_offset(
        &self,
        element: &ElementHandle,
        offset: (i32, i32),
        options: &MouseOptions,
    ) -> Result<(), AutomationError>;

    async fn drag_to_element(
        &self,
        element: &ElementHandle,
        destination: &ElementHandle,
        options: &MouseOptions,
    ) -> Result<(), AutomationError>;

    async fn type_text(
        &self,
        element: &ElementHandle,
        text: &str,
        options: &TypeOptions,
    ) -> Result<(), AutomationError>;

    async fn select_text(
        &self,
        element: &ElementHandle,
        start_pos: usize,
        end_pos: usize,
    ) -> Result<(), AutomationError>;

    async fn select_editable_content(
        &self,
        start: &ElementHandle,
        end: &ElementHandle,
    ) -> Result<(), AutomationError>;
}
