use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use action_executor::fixture::{FixtureBarrier, FixturePage, PageSpec};
use action_executor::{ActionCommand, CommandExecutor, ExecutorConfig};
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;
use tracing::info;

use crate::runtime::read_input;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Page fixture describing the elements (YAML or JSON)
    #[arg(long, value_name = "FILE")]
    pub page: PathBuf,

    /// Action command as JSON; `-` reads stdin
    #[arg(long, value_name = "FILE")]
    pub command: PathBuf,

    /// Element availability budget in milliseconds
    #[arg(long)]
    pub budget_ms: Option<u64>,

    /// Include the page's event journal in the output
    #[arg(long)]
    pub events: bool,

    #[arg(long, value_enum, default_value = "json")]
    pub output: OutputFormat,
}

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Action command as JSON; `-` reads stdin
    #[arg(long, value_name = "FILE")]
    pub command: PathBuf,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunOutput<'a> {
    action_id: &'a str,
    status: &'a action_executor::DriverStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<Vec<action_executor::fixture::PageEvent>>,
}

#[derive(Serialize)]
struct RoleOutput<'a> {
    role: &'static str,
    selector: &'a str,
}

async fn read_command(path: &PathBuf) -> Result<ActionCommand> {
    let raw = read_input(path).await?;
    serde_json::from_str(&raw).context("Invalid action command")
}

pub async fn cmd_run(args: RunArgs, config: &ExecutorConfig) -> Result<ExitCode> {
    let page_source = read_input(&args.page).await?;
    let spec: PageSpec = serde_yaml::from_str(&page_source).context("Invalid page fixture")?;
    let command = read_command(&args.command).await?;

    let page = FixturePage::new(spec);
    let executor = CommandExecutor::builder()
        .with_config(config.clone())
        .with_page(page.clone())
        .with_navigation(Arc::new(FixtureBarrier::navigation(&page)))
        .build()?;

    let budget = args
        .budget_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| executor.default_budget());
    info!(kind = %command.kind(), budget_ms = budget.as_millis() as u64, "Executing action command");

    let handle = executor.execute(command, budget);
    let status = handle.completion.await;

    let output = RunOutput {
        action_id: &handle.action_id,
        status: &status,
        events: args.events.then(|| page.events()),
    };
    print_output(&output, args.output)?;

    Ok(if status.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

pub async fn cmd_validate(args: ValidateArgs) -> Result<ExitCode> {
    let command = read_command(&args.command).await?;
    let roles: Vec<_> = command
        .required_selectors()
        .into_iter()
        .map(|(role, selector)| RoleOutput {
            role: role.argument_name(),
            selector,
        })
        .collect();

    println!("{}", command.kind());
    println!("{}", serde_json::to_string_pretty(&roles)?);
    Ok(ExitCode::SUCCESS)
}

fn print_output<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", rendered);
    Ok(())
}
