/*!
Runtime analysis of the inference engine kernels.

A run expands a grid of dataset sizes into one engine job per size and kernel,
executes the job-input file locally or on a Hadoop cluster, parses the timing
output and appends one least-squares runtime model per kernel to an append-only
coefficient log.
*/

pub mod pipeline;
pub mod run_dir;
pub mod state;

pub use pipeline::{RunReport, RunStatus, TimingRun};
pub use run_dir::{RunDirectory, DEFAULT_BASE_DIR};
pub use state::{EngineState, StateError};

use cluster_driver::DriverError;
use thiserror::Error;
use timing_analysis::{AnalysisError, FitOutcome};
use timing_jobs::JobError;
use timing_results::ResultsError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Jobs(#[from] JobError),
    #[error(transparent)]
    Results(#[from] ResultsError),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("single-state jobs cannot be appended to {}", .0.display())]
    AppendState(std::path::PathBuf),
}

pub fn init_logging() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// Operator summary of a finished run, on stdout.
pub fn print_report(report: &RunReport) {
    match report.status {
        RunStatus::DryRun => {
            if let Some(command) = &report.command {
                println!("{}", command);
            }
            return;
        }
        RunStatus::NothingToRun => {
            println!("no valid parameter combination, nothing submitted");
            return;
        }
        RunStatus::Completed | RunStatus::JobFailed => {}
    }
    println!("using dir: {}", report.run_dir.display());
    println!("n_tasks: {}", report.n_tasks);
    for warning in &report.warnings {
        println!("warning: {}", warning);
    }
    for fit in &report.fits {
        match &fit.outcome {
            FitOutcome::Fitted(f) => println!("{}: {:?}", fit.kernel, f.coefficients),
            FitOutcome::Insufficient { points, rank } => println!(
                "{}: insufficient data ({} points, rank {}), not logged",
                fit.kernel, points, rank
            ),
        }
    }
}
