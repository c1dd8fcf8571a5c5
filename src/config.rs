//! Run configuration.
//!
//! Invalid values or combinations are rejected up front, before any work
//! begins.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("entry function name is empty")]
    EmptyEntry,

    #[error("show-graph level {0} out of range (0-3)")]
    ShowGraphLevel(u8),

    #[error("verbosity {0} out of range (0-3)")]
    Verbosity(u8),

    #[error("graph display is enabled but the viewer command is empty")]
    MissingViewer,

    #[error("execution requires a lifted program; enable the lifting pass")]
    ExecutionWithoutLifting,
}

/// Execution configuration.
///
/// `show_graph_level`: 0 = no snapshots, 1 = one snapshot per delivered
/// result, 2 = one per reduction step, 3 = per step with node-level detail.
#[derive(Debug, Clone)]
pub struct ExecConfig {
    pub entry: String,
    pub show_graph_level: u8,
    pub viewer_command: String,
    pub interactive: bool,
    pub verbosity: u8,
    /// Diagnostic guard against runaway reductions; `usize::MAX` disables.
    pub step_limit: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        ExecConfig {
            entry: "main".to_string(),
            show_graph_level: 0,
            viewer_command: "dot".to_string(),
            interactive: false,
            verbosity: 1,
            step_limit: usize::MAX,
        }
    }
}

impl ExecConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entry.is_empty() {
            return Err(ConfigError::EmptyEntry);
        }
        if self.show_graph_level > 3 {
            return Err(ConfigError::ShowGraphLevel(self.show_graph_level));
        }
        if self.verbosity > 3 {
            return Err(ConfigError::Verbosity(self.verbosity));
        }
        if self.show_graph_level > 0 && self.viewer_command.is_empty() {
            return Err(ConfigError::MissingViewer);
        }
        Ok(())
    }
}

/// Which stages the driver runs.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub lift: bool,
    pub execute: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            lift: true,
            execute: true,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.execute && !self.lift {
            return Err(ConfigError::ExecutionWithoutLifting);
        }
        Ok(())
    }
}
