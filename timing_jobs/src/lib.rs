/*!
Job generation for engine timing runs: the parameter grid, the kernels to time,
and the line-oriented job-input file consumed by the engine's line processor.
*/

pub mod descriptor;
pub mod grid;
pub mod kernels;
pub mod line_format;
pub mod writer;

pub use descriptor::{JobArgs, JobDescriptor, JobTemplate};
pub use grid::{ParameterCombination, ParameterGrid};
pub use kernels::{FixedKernels, KernelFile, KernelProvider, DEFAULT_KERNELS};
pub use writer::{read_job_input, write_grid_jobs, JobInputWriter, WriteMode};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("job key {0:?} contains a line or key separator")]
    InvalidKey(String),
    #[error("malformed job line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },
    #[error("job is missing integer field {0:?}")]
    MissingField(String),
}
