//! Element resolution for action commands.
//!
//! Every selector a command needs is polled for existence and then visibility
//! within one shared budget. Type-specific checks run on the resolved set once
//! all roles are ready.

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::ExecutorConfig;
use crate::errors::ActionError;
use crate::ports::{DomInspector, SelectorEvaluator, WaitingIndicator};
use crate::types::{ActionCommand, ElementHandle, ResolvedElements, SelectorRole};
use crate::waiting::wait_for;

pub struct ElementResolver {
    selectors: Arc<dyn SelectorEvaluator>,
    dom: Arc<dyn DomInspector>,
    indicator: Arc<dyn WaitingIndicator>,
    check_delay: Duration,
    indicator_message: String,
}

impl ElementResolver {
    pub fn new(
        selectors: Arc<dyn SelectorEvaluator>,
        dom: Arc<dyn DomInspector>,
        indicator: Arc<dyn WaitingIndicator>,
        config: &ExecutorConfig,
    ) -> Self {
        Self {
            selectors,
            dom,
            indicator,
            check_delay: config.check_element_delay(),
            indicator_message: config.indicator_message.clone(),
        }
    }

    /// Resolve and validate every element `command` targets.
    ///
    /// The waiting indicator is shown for the whole budget and closed exactly
    /// once before this returns.
    pub async fn ensure_command_elements(
        &self,
        command: &ActionCommand,
        budget: Duration,
    ) -> Result<ResolvedElements, ActionError> {
        let started = Instant::now();
        self.indicator.show(&self.indicator_message, budget);

        let result = self.resolve_and_validate(command, budget, started).await;
        match &result {
            Ok(elements) => {
                debug!(
                    kind = %command.kind(),
                    count = elements.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Command elements ready"
                );
                self.indicator.close(true);
            }
            Err(err) => {
                warn!(
                    kind = %command.kind(),
                    code = err.code(),
                    "Element resolution failed: {}",
                    err
                );
                self.indicator.close(false);
            }
        }
        result
    }

    async fn resolve_and_validate(
        &self,
        command: &ActionCommand,
        budget: Duration,
        started: Instant,
    ) -> Result<ResolvedElements, ActionError> {
        let waits = command
            .required_selectors()
            .into_iter()
            .map(|(role, selector)| self.ensure_element(role, selector, budget, started));
        let elements = ResolvedElements::new(try_join_all(waits).await?);

        self.validate(command, &elements)?;
        Ok(elements)
    }

    async fn ensure_element(
        &self,
        role: SelectorRole,
        selector: &str,
        budget: Duration,
        started: Instant,
    ) -> Result<ElementHandle, ActionError> {
        let element = wait_for(|| self.selectors.resolve(selector), self.check_delay, budget)
            .await
            .map_err(|_| not_found_error(role))?;
        debug!(role = %role, selector, element = %element, "Element found");

        // The visibility wait only gets what is left of the shared budget.
        let remaining = budget.saturating_sub(started.elapsed());
        let element = wait_for(
            || self.dom.is_visible(&element).then(|| element.clone()),
            self.check_delay,
            remaining,
        )
        .await
        .map_err(|_| invisible_error(role))?;
        debug!(role = %role, element = %element, "Element visible");

        Ok(element)
    }

    fn validate(
        &self,
        command: &ActionCommand,
        elements: &ResolvedElements,
    ) -> Result<(), ActionError> {
        match command {
            ActionCommand::SelectText { .. } => self.ensure(
                elements.get(0),
                |el| self.dom.is_editable(el),
                ActionError::ElementNonEditable,
            ),
            ActionCommand::SelectTextAreaContent { .. } => self.ensure(
                elements.get(0),
                |el| self.dom.is_text_area(el),
                ActionError::ElementNotTextArea,
            ),
            ActionCommand::SelectEditableContent { .. } => {
                let start = elements.get(0);
                let end = elements.get(1);
                self.ensure(
                    start,
                    |el| self.dom.is_content_editable(el),
                    ActionError::ElementNonContentEditable(SelectorRole::Start),
                )?;
                self.ensure(
                    end,
                    |el| self.dom.is_content_editable(el),
                    ActionError::ElementNonContentEditable(SelectorRole::End),
                )?;
                match (start, end) {
                    (Some(start), Some(end))
                        if self.dom.nearest_common_ancestor(start, end).is_some() =>
                    {
                        Ok(())
                    }
                    _ => Err(ActionError::RootContainerNotFound),
                }
            }
            ActionCommand::Click { .. }
            | ActionCommand::RightClick { .. }
            | ActionCommand::DoubleClick { .. }
            | ActionCommand::Hover { .. }
            | ActionCommand::Drag { .. }
            | ActionCommand::DragToElement { .. }
            | ActionCommand::TypeText { .. } => Ok(()),
        }
    }

    fn ensure<F>(
        &self,
        element: Option<&ElementHandle>,
        predicate: F,
        error: ActionError,
    ) -> Result<(), ActionError>
    where
        F: Fn(&ElementHandle) -> bool,
    {
        match element {
            Some(el) if predicate(el) => Ok(()),
            _ => Err(error),
        }
    }
}

fn not_found_error(role: SelectorRole) -> ActionError {
    if role.is_primary() {
        ActionError::ElementNotFound
    } else {
        ActionError::AdditionalElementNotFound(role)
    }
}

fn invisible_error(role: SelectorRole) -> ActionError {
    if role.is_primary() {
        ActionError::ElementIsInvisible
    } else {
        ActionError::AdditionalElementIsInvisible(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{ElementSpec, FixturePage, PageEvent, PageSpec};
    use crate::types::{ClickOptions, MouseOptions};

    fn resolver_for(page: &Arc<FixturePage>) -> ElementResolver {
        ElementResolver::new(
            page.clone(),
            page.clone(),
            page.clone(),
            &ExecutorConfig::default(),
        )
    }

    fn click(selector: &str) -> ActionCommand {
        ActionCommand::Click {
            selector: selector.to_string(),
            options: ClickOptions::default(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_visible_primary_element() {
        let page = FixturePage::new(PageSpec::with_elements(vec![ElementSpec::new("btn")]));
        let elements = resolver_for(&page)
            .ensure_command_elements(&click("#btn"), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(elements.get(0), Some(&ElementHandle::new("btn")));
        assert_eq!(
            page.indicator_events(),
            vec![
                PageEvent::IndicatorShown {
                    message: ExecutorConfig::default().indicator_message,
                    timeout_ms: 1000,
                },
                PageEvent::IndicatorClosed { succeeded: true },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_primary_element_reports_not_found() {
        let page = FixturePage::new(PageSpec::default());
        let start = Instant::now();
        let err = resolver_for(&page)
            .ensure_command_elements(&click("#nope"), Duration::from_millis(1000))
            .await
            .unwrap_err();

        assert_eq!(err, ActionError::ElementNotFound);
        assert!(start.elapsed() <= Duration::from_millis(1200));
        assert_eq!(page.indicator_closes(), vec![false]);
    }

    #[tokio::test(start_paused = true)]
    async fn visibility_wait_uses_remaining_budget() {
        let page = FixturePage::new(PageSpec::with_elements(vec![ElementSpec::new("late")
            .appear_after(600)
            .hidden()]));
        let start = Instant::now();
        let err = resolver_for(&page)
            .ensure_command_elements(&click("#late"), Duration::from_millis(1000))
            .await
            .unwrap_err();

        assert_eq!(err, ActionError::ElementIsInvisible);
        // Found at 600ms, gave up when the shared 1000ms budget ran out.
        assert_eq!(start.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn element_becoming_visible_later_is_accepted() {
        let page = FixturePage::new(PageSpec::with_elements(vec![ElementSpec::new("fade")
            .visible_after(300)]));
        let elements = resolver_for(&page)
            .ensure_command_elements(&click("#fade"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(elements.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn destination_role_is_named_in_errors() {
        let page = FixturePage::new(PageSpec::with_elements(vec![ElementSpec::new("src")]));
        let command = ActionCommand::DragToElement {
            selector: "#src".into(),
            destination_selector: "#dst".into(),
            options: MouseOptions::default(),
        };
        let err = resolver_for(&page)
            .ensure_command_elements(&command, Duration::from_millis(400))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ActionError::AdditionalElementNotFound(SelectorRole::Destination)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn select_text_requires_editable_target() {
        let page = FixturePage::new(PageSpec::with_elements(vec![ElementSpec::new("label")]));
        let command = ActionCommand::SelectText {
            selector: "#label".into(),
            start_pos: None,
            end_pos: None,
        };
        let err = resolver_for(&page)
            .ensure_command_elements(&command, Duration::from_secs(1))
            .await
            .unwrap_err();

        assert_eq!(err, ActionError::ElementNonEditable);
        assert_eq!(page.indicator_closes(), vec![false]);
    }

    #[tokio::test(start_paused = true)]
    async fn select_text_area_content_requires_textarea() {
        let page = FixturePage::new(PageSpec::with_elements(vec![
            ElementSpec::new("field").tag("input"),
            ElementSpec::new("area").tag("textarea"),
        ]));
        let command = |selector: &str| ActionCommand::SelectTextAreaContent {
            selector: selector.into(),
            start_line: None,
            start_pos: None,
            end_line: None,
            end_pos: None,
        };
        let resolver = resolver_for(&page);

        let err = resolver
            .ensure_command_elements(&command("#field"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, ActionError::ElementNotTextArea);

        assert!(resolver
            .ensure_command_elements(&command("#area"), Duration::from_secs(1))
            .await
            .is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn editable_content_end_must_be_content_editable() {
        let page = FixturePage::new(PageSpec::with_elements(vec![
            ElementSpec::new("root"),
            ElementSpec::new("p1").parent("root").content_editable(),
            ElementSpec::new("p2").parent("root"),
        ]));
        let command = ActionCommand::SelectEditableContent {
            start_selector: "#p1".into(),
            end_selector: Some("#p2".into()),
        };
        let err = resolver_for(&page)
            .ensure_command_elements(&command, Duration::from_secs(1))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ActionError::ElementNonContentEditable(SelectorRole::End)
        );
    }

    fn select_editable(start: &str, end: &str) -> ActionCommand {
        ActionCommand::SelectEditableContent {
            start_selector: start.into(),
            end_selector: Some(end.into()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn editable_content_start_must_be_content_editable() {
        let page = FixturePage::new(PageSpec::with_elements(vec![
            ElementSpec::new("root"),
            ElementSpec::new("p1").parent("root"),
            ElementSpec::new("p2").parent("root").content_editable(),
        ]));
        let err = resolver_for(&page)
            .ensure_command_elements(&select_editable("#p1", "#p2"), Duration::from_secs(1))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ActionError::ElementNonContentEditable(SelectorRole::Start)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn start_and_end_roles_are_named_in_resolution_errors() {
        let cases = vec![
            (
                vec![
                    ElementSpec::new("p1").hidden(),
                    ElementSpec::new("p2").content_editable(),
                ],
                ActionError::AdditionalElementIsInvisible(SelectorRole::Start),
            ),
            (
                vec![
                    ElementSpec::new("p1").content_editable(),
                    ElementSpec::new("p2").hidden(),
                ],
                ActionError::AdditionalElementIsInvisible(SelectorRole::End),
            ),
            (
                vec![ElementSpec::new("p1").content_editable()],
                ActionError::AdditionalElementNotFound(SelectorRole::End),
            ),
        ];

        for (elements, expected) in cases {
            let page = FixturePage::new(PageSpec::with_elements(elements));
            let err = resolver_for(&page)
                .ensure_command_elements(
                    &select_editable("#p1", "#p2"),
                    Duration::from_millis(600),
                )
                .await
                .unwrap_err();

            assert_eq!(err, expected);
            assert_eq!(page.indicator_closes(), vec![false]);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn zero_selector_command_resolves_empty_set() {
        let page = FixturePage::new(PageSpec::default());
        let command = ActionCommand::Hover {
            selector: String::new(),
            options: MouseOptions::default(),
        };
        let start = Instant::now();
        let elements = resolver_for(&page)
            .ensure_command_elements(&command, Duration::from_secs(1))
            .await
            .unwrap();

        assert!(elements.is_empty());
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(page.indicator_closes(), vec![true]);
    }
}
