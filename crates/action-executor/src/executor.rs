//! Command executor - resolve, run, settle, report.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::ExecutorConfig;
use crate::errors::{BuildError, ExecutionError};
use crate::factory::create_automation;
use crate::ports::{
    AutomationDriver, Barrier, DomInspector, NetworkBarrierFactory, SelectorEvaluator,
    WaitingIndicator,
};
use crate::resolver::ElementResolver;
use crate::types::{ActionCommand, DriverStatus};

/// Lifecycle of one command execution
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionPhase {
    Resolving,
    Running,
    Settling,
    Done,
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionPhase::Resolving => "resolving",
            ExecutionPhase::Running => "running",
            ExecutionPhase::Settling => "settling",
            ExecutionPhase::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("command concluded without starting its action")]
pub struct NotStarted;

/// Resolves once the target elements are ready and the action is about to run.
///
/// Yields [`NotStarted`] if the command ends before that point.
#[derive(Debug)]
pub struct StartSignal(oneshot::Receiver<()>);

impl Future for StartSignal {
    type Output = Result<(), NotStarted>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0)
            .poll(cx)
            .map(|result| result.map_err(|_| NotStarted))
    }
}

/// Resolves with the terminal status of the command. Never fails.
#[derive(Debug)]
pub struct CompletionSignal(oneshot::Receiver<DriverStatus>);

impl Future for CompletionSignal {
    type Output = DriverStatus;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx).map(|result| {
            result.unwrap_or_else(|_| {
                DriverStatus::failure(ExecutionError::Internal(
                    "command execution ended without reporting a status".to_string(),
                ))
            })
        })
    }
}

/// Independent start and completion signals for one accepted command
#[derive(Debug)]
pub struct CommandHandle {
    pub action_id: String,
    pub start: StartSignal,
    pub completion: CompletionSignal,
}

struct ExecutorInner {
    resolver: ElementResolver,
    dom: Arc<dyn DomInspector>,
    automation: Arc<dyn AutomationDriver>,
    network: Arc<dyn NetworkBarrierFactory>,
    navigation: Arc<dyn Barrier>,
}

#[derive(Clone)]
pub struct CommandExecutor {
    inner: Arc<ExecutorInner>,
    default_budget: Duration,
}

impl CommandExecutor {
    pub fn builder() -> CommandExecutorBuilder {
        CommandExecutorBuilder::new(ExecutorConfig::default())
    }

    pub fn default_budget(&self) -> Duration {
        self.default_budget
    }

    /// Accept `command` for execution and return its signals immediately.
    ///
    /// The pipeline runs on a task spawned on the current tokio runtime. Outside
    /// a runtime the command is not started and completion reports an internal
    /// error.
    pub fn execute(&self, command: ActionCommand, budget: Duration) -> CommandHandle {
        let (start_tx, start_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let action_id = Uuid::new_v4().to_string();

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                warn!(action_id = %action_id, "Cannot execute action command: {}", err);
                drop(start_tx);
                let status = DriverStatus::failure(ExecutionError::Internal(format!(
                    "no async runtime to execute the command: {}",
                    err
                )));
                // The receiver is still held locally, so this cannot fail.
                let _ = done_tx.send(status);
                return CommandHandle {
                    action_id,
                    start: StartSignal(start_rx),
                    completion: CompletionSignal(done_rx),
                };
            }
        };

        let inner = Arc::clone(&self.inner);
        let id = action_id.clone();
        runtime.spawn(async move {
            let status = inner.run(&id, &command, budget, start_tx).await;
            if done_tx.send(status).is_err() {
                debug!(action_id = %id, "Completion signal dropped before status was delivered");
            }
        });

        CommandHandle {
            action_id,
            start: StartSignal(start_rx),
            completion: CompletionSignal(done_rx),
        }
    }

    /// Execute `command` and wait for its terminal status.
    pub async fn run_to_completion(&self, command: ActionCommand, budget: Duration) -> DriverStatus {
        self.execute(command, budget).completion.await
    }
}

impl ExecutorInner {
    #[instrument(name = "action_command", skip_all, fields(action_id = %action_id, kind = %command.kind()))]
    async fn run(
        &self,
        action_id: &str,
        command: &ActionCommand,
        budget: Duration,
        start: oneshot::Sender<()>,
    ) -> DriverStatus {
        let mut phase = ExecutionPhase::Resolving;
        let outcome = self.drive(command, budget, start, &mut phase).await;

        match outcome {
            Ok(()) => {
                info!(phase = %ExecutionPhase::Done, "Action command completed");
                DriverStatus::success()
            }
            Err(err) => {
                warn!(failed_in = %phase, code = err.code(), "Action command failed: {}", err);
                DriverStatus::failure(err)
            }
        }
    }

    async fn drive(
        &self,
        command: &ActionCommand,
        budget: Duration,
        start: oneshot::Sender<()>,
        phase: &mut ExecutionPhase,
    ) -> Result<(), ExecutionError> {
        debug!(phase = %phase, budget_ms = budget.as_millis() as u64, "Resolving command elements");
        let elements = self.resolver.ensure_command_elements(command, budget).await?;

        *phase = ExecutionPhase::Running;
        if start.send(()).is_err() {
            debug!("Start signal dropped by caller");
        }
        let network = self.network.open();
        let automation = create_automation(&elements, command, self.dom.as_ref())?;
        debug!(phase = %phase, automation = automation.name(), "Running automation");
        automation.run(self.automation.as_ref()).await?;

        *phase = ExecutionPhase::Settling;
        debug!(phase = %phase, "Waiting for network and navigation to settle");
        tokio::try_join!(
            network.wait_until_quiescent(),
            self.navigation.wait_until_quiescent()
        )?;

        *phase = ExecutionPhase::Done;
        Ok(())
    }
}

/// Wires the executor's ports together
pub struct CommandExecutorBuilder {
    config: ExecutorConfig,
    selectors: Option<Arc<dyn SelectorEvaluator>>,
    dom: Option<Arc<dyn DomInspector>>,
    indicator: Option<Arc<dyn WaitingIndicator>>,
    automation: Option<Arc<dyn AutomationDriver>>,
    network: Option<Arc<dyn NetworkBarrierFactory>>,
    navigation: Option<Arc<dyn Barrier>>,
}

impl CommandExecutorBuilder {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            selectors: None,
            dom: None,
            indicator: None,
            automation: None,
            network: None,
            navigation: None,
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_selectors(mut self, port: Arc<dyn SelectorEvaluator>) -> Self {
        self.selectors = Some(port);
        self
    }

    pub fn with_dom(mut self, port: Arc<dyn DomInspector>) -> Self {
        self.dom = Some(port);
        self
    }

    pub fn with_indicator(mut self, port: Arc<dyn WaitingIndicator>) -> Self {
        self.indicator = Some(port);
        self
    }

    pub fn with_automation(mut self, port: Arc<dyn AutomationDriver>) -> Self {
        self.automation = Some(port);
        self
    }

    pub fn with_network(mut self, port: Arc<dyn NetworkBarrierFactory>) -> Self {
        self.network = Some(port);
        self
    }

    pub fn with_navigation(mut self, port: Arc<dyn Barrier>) -> Self {
        self.navigation = Some(port);
        self
    }

    /// Use one object for every page-side port except navigation.
    pub fn with_page<P>(self, page: Arc<P>) -> Self
    where
        P: SelectorEvaluator
            + DomInspector
            + WaitingIndicator
            + AutomationDriver
            + NetworkBarrierFactory
            + 'static,
    {
        self.with_selectors(page.clone())
            .with_dom(page.clone())
            .with_indicator(page.clone())
            .with_automation(page.clone())
            .with_network(page)
    }

    pub fn build(self) -> Result<CommandExecutor, BuildError> {
        let selectors = self.selectors.ok_or(BuildError::MissingPort("selector"))?;
        let dom = self.dom.ok_or(BuildError::MissingPort("dom"))?;
        let indicator = self.indicator.ok_or(BuildError::MissingPort("indicator"))?;
        let automation = self.automation.ok_or(BuildError::MissingPort("automation"))?;
        let network = self.network.ok_or(BuildError::MissingPort("network"))?;
        let navigation = self.navigation.ok_or(BuildError::MissingPort("navigation"))?;

        let resolver = ElementResolver::new(selectors, dom.clone(), indicator, &self.config);
        Ok(CommandExecutor {
            inner: Arc::new(ExecutorInner {
                resolver,
                dom,
                automation,
                network,
                navigation,
            }),
            default_budget: self.config.default_budget(),
        })
    }
}
