//! Action command executor for the in-page automation driver
//!
//! Turns a declarative action command into a single terminal status:
//! - Resolves the command's target elements within one shared timeout budget
//! - Validates them per command kind (editable, text area, selection root)
//! - Builds and runs the matching automation
//! - Waits for network and navigation activity to settle
//!
//! Browser plumbing is injected through the traits in [`ports`].

pub mod config;
pub mod errors;
pub mod executor;
pub mod factory;
pub mod fixture;
pub mod ports;
pub mod resolver;
pub mod types;
pub mod waiting;

pub use config::ExecutorConfig;
pub use errors::*;
pub use executor::{
    CommandExecutor, CommandExecutorBuilder, CommandHandle, CompletionSignal, ExecutionPhase,
    NotStarted, StartSignal,
};
pub use factory::{create_automation, Automation};
pub use resolver::ElementResolver;
pub use types::*;
