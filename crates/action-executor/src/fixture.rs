//! Scripted in-memory page.
//!
//! Implements every executor port on top of a static element description whose
//! time-dependent behaviour (late insertion, delayed visibility, pending
//! requests) is measured on the tokio clock. Used by the dry-run CLI and tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::errors::{AutomationError, BarrierError};
use crate::ports::{
    AutomationDriver, Barrier, DomInspector, NetworkBarrierFactory, SelectorEvaluator,
    WaitingIndicator,
};
use crate::types::{ClickOptions, ElementHandle, MouseOptions, TypeOptions};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElementSpec {
    pub id: String,
    /// Selector matching this element; `#<id>` when absent
    pub selector: Option<String>,
    pub parent: Option<String>,
    pub tag: String,
    pub value: String,
    pub content_editable: bool,
    pub appear_after_ms: u64,
    pub visible_after_ms: u64,
    /// Never becomes visible
    pub hidden: bool,
}

impl ElementSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tag: "div".to_string(),
            ..Self::default()
        }
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn content_editable(mut self) -> Self {
        self.content_editable = true;
        self
    }

    pub fn appear_after(mut self, ms: u64) -> Self {
        self.appear_after_ms = ms;
        self
    }

    pub fn visible_after(mut self, ms: u64) -> Self {
        self.visible_after_ms = ms;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    fn matches(&self, selector: &str) -> bool {
        match &self.selector {
            Some(own) => own == selector,
            None => selector.strip_prefix('#') == Some(self.id.as_str()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PageSpec {
    pub elements: Vec<ElementSpec>,
    /// How long the action's requests stay in flight after a barrier opens
    pub pending_requests_ms: u64,
    /// How long a triggered unload stays pending
    pub pending_navigation_ms: u64,
    /// Duration of every automation run
    pub automation_ms: u64,
    /// When set, every automation run fails with this reason
    pub automation_failure: Option<String>,
    /// When set, network and navigation barriers fail with this reason
    pub settlement_failure: Option<String>,
}

impl PageSpec {
    pub fn with_elements(elements: Vec<ElementSpec>) -> Self {
        Self {
            elements,
            ..Self::default()
        }
    }
}

/// Observable side effect recorded by the page, in order of occurrence
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum PageEvent {
    IndicatorShown { message: String, timeout_ms: u64 },
    IndicatorClosed { succeeded: bool },
    Automation { description: String },
    NetworkBarrierOpened,
    Settled { barrier: String },
}

pub struct FixturePage {
    spec: PageSpec,
    by_id: HashMap<String, usize>,
    origin: Instant,
    journal: Arc<Mutex<Vec<PageEvent>>>,
}

impl FixturePage {
    pub fn new(spec: PageSpec) -> Arc<Self> {
        let by_id = spec
            .elements
            .iter()
            .enumerate()
            .map(|(index, element)| (element.id.clone(), index))
            .collect();
        Arc::new(Self {
            spec,
            by_id,
            origin: Instant::now(),
            journal: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn events(&self) -> Vec<PageEvent> {
        self.journal.lock().clone()
    }

    pub fn indicator_events(&self) -> Vec<PageEvent> {
        self.events()
            .into_iter()
            .filter(|event| {
                matches!(
                    event,
                    PageEvent::IndicatorShown { .. } | PageEvent::IndicatorClosed { .. }
                )
            })
            .collect()
    }

    pub fn indicator_closes(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PageEvent::IndicatorClosed { succeeded } => Some(succeeded),
                _ => None,
            })
            .collect()
    }

    pub fn automations(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PageEvent::Automation { description } => Some(description),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: PageEvent) {
        self.journal.lock().push(event);
    }

    fn element(&self, handle: &ElementHandle) -> Option<&ElementSpec> {
        self.by_id
            .get(handle.id())
            .map(|index| &self.spec.elements[*index])
    }

    fn elapsed_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn exists(&self, element: &ElementSpec) -> bool {
        self.elapsed_ms() >= element.appear_after_ms
    }

    /// The element followed by its ancestors, nearest first
    fn lineage(&self, handle: &ElementHandle) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = self.element(handle);
        while let Some(element) = current {
            if chain.contains(&element.id) {
                break;
            }
            chain.push(element.id.clone());
            current = element
                .parent
                .as_ref()
                .and_then(|parent| self.by_id.get(parent))
                .map(|index| &self.spec.elements[*index]);
        }
        chain
    }

    async fn perform(&self, description: String) -> Result<(), AutomationError> {
        if self.spec.automation_ms > 0 {
            sleep(Duration::from_millis(self.spec.automation_ms)).await;
        }
        debug!(%description, "Fixture automation");
        self.record(PageEvent::Automation {
            description: description.clone(),
        });
        match &self.spec.automation_failure {
            Some(reason) => Err(AutomationError::new(description, reason.clone())),
            None => Ok(()),
        }
    }
}

impl SelectorEvaluator for FixturePage {
    fn resolve(&self, selector: &str) -> Option<ElementHandle> {
        self.spec
            .elements
            .iter()
            .find(|element| element.matches(selector) && self.exists(element))
            .map(|element| ElementHandle::new(element.id.clone()))
    }
}

impl DomInspector for FixturePage {
    fn is_visible(&self, handle: &ElementHandle) -> bool {
        self.element(handle).is_some_and(|element| {
            self.exists(element)
                && !element.hidden
                && self.elapsed_ms() >= element.visible_after_ms
        })
    }

    fn is_editable(&self, handle: &ElementHandle) -> bool {
        self.element(handle)
            .is_some_and(|element| matches!(element.tag.as_str(), "input" | "textarea"))
            || self.is_content_editable(handle)
    }

    fn is_text_area(&self, handle: &ElementHandle) -> bool {
        self.element(handle)
            .is_some_and(|element| element.tag == "textarea")
    }

    fn is_content_editable(&self, handle: &ElementHandle) -> bool {
        self.lineage(handle).iter().any(|id| {
            self.by_id
                .get(id)
                .is_some_and(|index| self.spec.elements[*index].content_editable)
        })
    }

    fn nearest_common_ancestor(
        &self,
        first: &ElementHandle,
        second: &ElementHandle,
    ) -> Option<ElementHandle> {
        let second_lineage = self.lineage(second);
        self.lineage(first)
            .into_iter()
            .find(|id| second_lineage.contains(id))
            .map(ElementHandle::new)
    }

    fn element_value(&self, handle: &ElementHandle) -> String {
        self.element(handle)
            .map(|element| element.value.clone())
            .unwrap_or_default()
    }
}

impl WaitingIndicator for FixturePage {
    fn show(&self, message: &str, timeout: Duration) {
        self.record(PageEvent::IndicatorShown {
            message: message.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        });
    }

    fn close(&self, succeeded: bool) {
        self.record(PageEvent::IndicatorClosed { succeeded });
    }
}

/// Barrier that becomes quiescent, or fails, a fixed time after it starts waiting
pub struct FixtureBarrier {
    name: String,
    pending: Duration,
    failure: Option<String>,
    journal: Arc<Mutex<Vec<PageEvent>>>,
}

impl FixtureBarrier {
    /// Process-wide navigation barrier for `page`
    pub fn navigation(page: &FixturePage) -> Self {
        Self {
            name: "navigation".to_string(),
            pending: Duration::from_millis(page.spec.pending_navigation_ms),
            failure: page.spec.settlement_failure.clone(),
            journal: page.journal.clone(),
        }
    }
}

#[async_trait]
impl Barrier for FixtureBarrier {
    async fn wait_until_quiescent(&self) -> Result<(), BarrierError> {
        if !self.pending.is_zero() {
            sleep(self.pending).await;
        }
        if let Some(reason) = &self.failure {
            return Err(BarrierError::Failed {
                barrier: self.name.clone(),
                reason: reason.clone(),
            });
        }
        self.journal.lock().push(PageEvent::Settled {
            barrier: self.name.clone(),
        });
        Ok(())
    }
}

impl NetworkBarrierFactory for FixturePage {
    fn open(&self) -> Box<dyn Barrier> {
        self.record(PageEvent::NetworkBarrierOpened);
        Box::new(FixtureBarrier {
            name: "network".to_string(),
            pending: Duration::from_millis(self.spec.pending_requests_ms),
            failure: self.spec.settlement_failure.clone(),
            journal: self.journal.clone(),
        })
    }
}

fn describe_mouse(options: &MouseOptions) -> String {
    match (options.offset_x, options.offset_y) {
        (None, None) => String::new(),
        (x, y) => format!(" @({},{})", x.unwrap_or(0), y.unwrap_or(0)),
    }
}

#[async_trait]
impl AutomationDriver for FixturePage {
    async fn click(
        &self,
        element: &ElementHandle,
        options: &ClickOptions,
    ) -> Result<(), AutomationError> {
        self.perform(format!("click {}{}", element, describe_mouse(&options.mouse)))
            .await
    }

    async fn right_click(
        &self,
        element: &ElementHandle,
        options: &ClickOptions,
    ) -> Result<(), AutomationError> {
        self.perform(format!(
            "right-click {}{}",
            element,
            describe_mouse(&options.mouse)
        ))
        .await
    }

    async fn double_click(
        &self,
        element: &ElementHandle,
        options: &ClickOptions,
    ) -> Result<(), AutomationError> {
        self.perform(format!(
            "double-click {}{}",
            element,
            describe_mouse(&options.mouse)
        ))
        .await
    }

    async fn hover(
        &self,
        element: &ElementHandle,
        options: &MouseOptions,
    ) -> Result<(), AutomationError> {
        self.perform(format!("hover {}{}", element, describe_mouse(options)))
            .await
    }

    async fn drag_to_offset(
        &self,
        element: &ElementHandle,
        offset: (i32, i32),
        _options: &MouseOptions,
    ) -> Result<(), AutomationError> {
        self.perform(format!("drag {} by ({},{})", element, offset.0, offset.1))
            .await
    }

    async fn drag_to_element(
        &self,
        element: &ElementHandle,
        destination: &ElementHandle,
        _options: &MouseOptions,
    ) -> Result<(), AutomationError> {
        self.perform(format!("drag {} to {}", element, destination))
            .await
    }

    async fn type_text(
        &self,
        element: &ElementHandle,
        text: &str,
        options: &TypeOptions,
    ) -> Result<(), AutomationError> {
        let mode = if options.replace { " (replace)" } else { "" };
        self.perform(format!("type {:?} into {}{}", text, element, mode))
            .await
    }

    async fn select_text(
        &self,
        element: &ElementHandle,
        start_pos: usize,
        end_pos: usize,
    ) -> Result<(), AutomationError> {
        self.perform(format!("select {} {}..{}", element, start_pos, end_pos))
            .await
    }

    async fn select_editable_content(
        &self,
        start: &ElementHandle,
        end: &ElementHandle,
    ) -> Result<(), AutomationError> {
        self.perform(format!("select-editable {}..{}", start, end))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Arc<FixturePage> {
        FixturePage::new(PageSpec::with_elements(vec![
            ElementSpec::new("body"),
            ElementSpec::new("editor").parent("body").content_editable(),
            ElementSpec::new("p1").parent("editor"),
            ElementSpec::new("p2").parent("editor"),
            ElementSpec::new("frame-body"),
            ElementSpec::new("other").parent("frame-body"),
        ]))
    }

    #[tokio::test(start_paused = true)]
    async fn late_elements_resolve_after_their_delay() {
        let page = FixturePage::new(PageSpec::with_elements(vec![
            ElementSpec::new("late").selector(".late").appear_after(300),
        ]));
        assert_eq!(page.resolve(".late"), None);
        tokio::time::advance(Duration::from_millis(300)).await;
        assert_eq!(page.resolve(".late"), Some(ElementHandle::new("late")));
        assert_eq!(page.resolve("#late"), None);
    }

    #[test]
    fn content_editable_is_inherited() {
        let page = tree();
        assert!(page.is_content_editable(&ElementHandle::new("p1")));
        assert!(!page.is_content_editable(&ElementHandle::new("body")));
        assert!(page.is_editable(&ElementHandle::new("p2")));
    }

    #[test]
    fn common_ancestor_walks_parents() {
        let page = tree();
        assert_eq!(
            page.nearest_common_ancestor(&ElementHandle::new("p1"), &ElementHandle::new("p2")),
            Some(ElementHandle::new("editor"))
        );
        assert_eq!(
            page.nearest_common_ancestor(&ElementHandle::new("p1"), &ElementHandle::new("p1")),
            Some(ElementHandle::new("p1"))
        );
        assert_eq!(
            page.nearest_common_ancestor(&ElementHandle::new("p1"), &ElementHandle::new("other")),
            None
        );
    }

    #[test]
    fn page_spec_reads_from_yaml() {
        let spec: PageSpec = serde_yaml::from_str(
            "elements:\n  - id: area\n    tag: textarea\n    value: \"a\\nb\"\n    visibleAfterMs: 50\npendingRequestsMs: 120\n",
        )
        .unwrap();
        assert_eq!(spec.elements[0].tag, "textarea");
        assert_eq!(spec.elements[0].value, "a\nb");
        assert_eq!(spec.elements[0].visible_after_ms, 50);
        assert_eq!(spec.pending_requests_ms, 120);
    }
}
