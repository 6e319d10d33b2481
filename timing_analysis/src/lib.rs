/*!
Runtime models of the engine kernels: one least-squares fit per kernel over the
sizes of the timing grid.
*/

pub mod aggregate;
pub mod regression;

pub use aggregate::{fit_kernels, kernel_design, regression_results, KernelFit};
pub use regression::{design_row, fit_least_squares, mean_only_rss, FitOutcome, LeastSquaresFit};

use std::path::Path;
use thiserror::Error;
use timing_jobs::ParameterGrid;
use timing_results::{append_regression_results, read_timing_csv, timestamp_now, ResultsError};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Results(#[from] ResultsError),
    #[error("design matrix has {rows} rows but {targets} targets")]
    DimensionMismatch { rows: usize, targets: usize },
    #[error("least squares solver failed: {0}")]
    Solver(String),
}

/// Fits every kernel from a parsed timing CSV and appends the fitted ones to
/// the coefficient log. Kernels with too little data are only reported.
pub fn find_regression_coeff(
    parsed_filename: impl AsRef<Path>,
    grid: &ParameterGrid,
    kernels: &[String],
    regression_file: impl AsRef<Path>,
) -> Result<Vec<KernelFit>, AnalysisError> {
    let table = read_timing_csv(parsed_filename)?;
    let fits = fit_kernels(grid, &table.records, kernels)?;
    for fit in fits.iter() {
        match &fit.outcome {
            FitOutcome::Fitted(f) => log::info!(
                "{}: {} points, coefficients {:?}, rss {} (mean only {})",
                fit.kernel,
                f.points,
                f.coefficients,
                f.residual_sum_of_squares,
                f.mean_only_rss
            ),
            FitOutcome::Insufficient { points, rank } => log::warn!(
                "{}: insufficient data ({} points, rank {}), coefficients not logged",
                fit.kernel,
                points,
                rank
            ),
        }
    }
    let results = regression_results(&fits, &timestamp_now());
    if !results.is_empty() {
        append_regression_results(regression_file, &results)?;
    }
    Ok(fits)
}
