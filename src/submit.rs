//! Hand the finished DAG to the scheduler

use std::path::Path;
use std::process::Command;

use tracing::info;

use crate::constants::DEFAULT_SUBMIT_CMD;
use crate::error::AllInOneError;

/// Anything that can submit a DAG file
pub trait Submitter {
    fn submit(&self, dag: &Path) -> Result<(), AllInOneError>;
}

/// Runs a command line with the DAG path appended, `condor_submit_dag` by default
#[derive(Debug, Clone)]
pub struct CondorSubmitter {
    command: String,
}

impl CondorSubmitter {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Default for CondorSubmitter {
    fn default() -> Self {
        Self::new(DEFAULT_SUBMIT_CMD)
    }
}

impl Submitter for CondorSubmitter {
    fn submit(&self, dag: &Path) -> Result<(), AllInOneError> {
        let mut words = self.command.split_whitespace();
        let program = words.next().ok_or_else(|| AllInOneError::SubmitSpawn {
            command: self.command.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
        })?;

        info!(command = %self.command, dag = %dag.display(), "Submitting");
        let status = Command::new(program)
            .args(words)
            .arg(dag)
            .status()
            .map_err(|source| AllInOneError::SubmitSpawn {
                command: self.command.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(AllInOneError::SubmitFailed {
                command: self.command.clone(),
                // killed by a signal: no code
                code: status.code().unwrap_or(1),
            })
        }
    }
}
