//! Command orchestration layer
//!
//! Engine commands own their transaction scopes; callers never pass one in.

pub mod deploy;
pub mod engine_command;

pub use deploy::{deploy, DeployMode, DeployOutcome};
pub use engine_command::{apply_engine_command, EngineCommand, EngineCommandResult};
