/** Submission of job input files: Hadoop streaming on a cluster, or the engine
run locally over the whole input.
*/
pub mod command;
pub mod config;
pub mod engine;
pub mod hadoop;
pub mod local;

pub use command::{hadoop_command, HadoopCommand, JobFiles};
pub use config::HadoopConfig;
pub use engine::{ClusterEngine, JobHandle};
pub use hadoop::HadoopEngine;
pub use local::LocalExecutor;

use std::fmt::{Display, Formatter};
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid cluster configuration: {0}")]
    Config(String),
    #[error("could not parse cluster configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("could not write cluster configuration: {0}")]
    ConfigWrite(#[from] toml::ser::Error),
    #[error("could not start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("`{command}` failed with {status}")]
    CommandFailed { command: String, status: ExitStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Local,
    Remote,
    /// Writes nothing, prints what would be submitted.
    DryRun,
}

impl ExecutionMode {
    /// Local wins if both are requested; the CLI rejects that combination anyway.
    pub fn from_flags(do_local: bool, do_remote: bool) -> Self {
        match (do_local, do_remote) {
            (true, _) => ExecutionMode::Local,
            (false, true) => ExecutionMode::Remote,
            (false, false) => ExecutionMode::DryRun,
        }
    }
}

impl Display for ExecutionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExecutionMode::Local => "local",
            ExecutionMode::Remote => "remote",
            ExecutionMode::DryRun => "dry-run",
        };
        write!(f, "{}", name)
    }
}
