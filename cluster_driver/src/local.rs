//! Runs the engine on the submitting machine, one process over the whole input.

use crate::DriverError;
use log::{info, warn};
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalExecutor {
    pub program: String,
    pub args: Vec<String>,
}

impl LocalExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        LocalExecutor {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Engine invocation reading the side files of a run.
    pub fn for_engine(engine_binary: &str, table_data: &Path, command_dict: &Path) -> Self {
        LocalExecutor::new(engine_binary)
            .arg("--table_data_filename")
            .arg(table_data.to_string_lossy())
            .arg("--command_dict_filename")
            .arg(command_dict.to_string_lossy())
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Feeds `input` on stdin and captures stdout into `output`.
    /// Returns whether the engine exited successfully.
    pub fn run(&self, input: &Path, output: &Path) -> Result<bool, DriverError> {
        let stdin = File::open(input)?;
        let stdout = File::create(output)?;
        info!(
            "Running {} {} < {} > {}",
            self.program,
            self.args.join(" "),
            input.display(),
            output.display()
        );
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::from(stdout))
            .status()
            .map_err(|source| DriverError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !status.success() {
            warn!("{} exited with {}", self.program, status);
        }
        Ok(status.success())
    }
}
