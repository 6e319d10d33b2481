use crate::regression::{design_row, fit_least_squares, DesignRow, FitOutcome};
use crate::AnalysisError;
use itertools::Itertools;
use timing_jobs::ParameterGrid;
use timing_results::{RegressionResult, TimingRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct KernelFit {
    pub kernel: String,
    pub outcome: FitOutcome,
}

/// Design rows and targets for one kernel, in grid order.
/// Records whose sizes are not in the grid are never matched.
pub fn kernel_design(
    grid: &ParameterGrid,
    records: &[TimingRecord],
    kernel: &str,
) -> (Vec<DesignRow>, Vec<f64>) {
    let kernel_records: Vec<&TimingRecord> =
        records.iter().filter(|r| r.kernel == kernel).collect();
    let mut rows = Vec::new();
    let mut targets = Vec::new();
    for combination in grid.product() {
        for record in kernel_records
            .iter()
            .filter(|r| r.combination == combination)
        {
            rows.push(design_row(&combination));
            targets.push(record.elapsed_secs);
        }
    }
    (rows, targets)
}

/// Kernels without any matching record are left out, a repeated kernel is
/// fitted once.
pub fn fit_kernels(
    grid: &ParameterGrid,
    records: &[TimingRecord],
    kernels: &[String],
) -> Result<Vec<KernelFit>, AnalysisError> {
    let mut fits = Vec::new();
    for kernel in kernels.iter().unique() {
        let (rows, targets) = kernel_design(grid, records, kernel);
        if rows.is_empty() {
            log::debug!("no timing for kernel {}", kernel);
            continue;
        }
        fits.push(KernelFit {
            kernel: kernel.clone(),
            outcome: fit_least_squares(&rows, &targets)?,
        });
    }
    Ok(fits)
}

pub fn regression_results(fits: &[KernelFit], timestamp: &str) -> Vec<RegressionResult> {
    fits.iter()
        .filter_map(|fit| {
            fit.outcome.fitted().map(|f| RegressionResult {
                timestamp: timestamp.to_owned(),
                kernel: fit.kernel.clone(),
                coefficients: f.coefficients,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use timing_jobs::ParameterCombination;

    fn record(c: (u64, u64, u64, u64), t: f64, kernel: &str) -> TimingRecord {
        TimingRecord {
            combination: ParameterCombination::new(c.0, c.1, c.2, c.3),
            elapsed_secs: t,
            kernel: kernel.to_owned(),
            extra: Vec::new(),
        }
    }

    #[test]
    fn design_follows_grid_order_and_kernel() {
        let grid = ParameterGrid::new(vec![100, 400], vec![8], vec![10, 20], vec![2]);
        let records = vec![
            record((400, 8, 10, 2), 1.1, "row_partition_hyperparameters"),
            record((100, 8, 10, 2), 0.5, "row_partition_hyperparameters"),
            record((100, 8, 10, 2), 9.0, "column_hyperparameters"),
            // not part of the grid
            record((200, 8, 10, 2), 0.7, "row_partition_hyperparameters"),
        ];
        let (rows, targets) = kernel_design(&grid, &records, "row_partition_hyperparameters");
        assert_eq!(targets, vec![0.5, 1.1]);
        assert_eq!(rows[0][1], 100.0);
        assert_eq!(rows[1][1], 400.0);
    }

    #[test]
    fn repeated_sizes_do_not_weigh_a_record_twice() {
        let grid = ParameterGrid::new(vec![100, 100], vec![8], vec![10], vec![2, 2]);
        let records = vec![record((100, 8, 10, 2), 0.5, "column_hyperparameters")];
        let (rows, targets) = kernel_design(&grid, &records, "column_hyperparameters");
        assert_eq!(rows.len(), 1);
        assert_eq!(targets, vec![0.5]);
    }

    #[test]
    fn two_points_are_flagged_and_not_logged() {
        let grid = ParameterGrid::new(vec![100, 400], vec![8], vec![10, 20], vec![2]);
        let records = vec![
            record((100, 8, 10, 2), 0.5, "row_partition_hyperparameters"),
            record((400, 8, 10, 2), 1.1, "row_partition_hyperparameters"),
        ];
        let kernels = vec![
            "row_partition_hyperparameters".to_owned(),
            "column_hyperparameters".to_owned(),
        ];
        let fits = fit_kernels(&grid, &records, &kernels).unwrap();
        assert_eq!(fits.len(), 1);
        assert_eq!(fits[0].kernel, "row_partition_hyperparameters");
        assert!(matches!(
            fits[0].outcome,
            FitOutcome::Insufficient { points: 2, .. }
        ));
        assert!(regression_results(&fits, "now").is_empty());

        let repeated = vec![kernels[0].clone(), kernels[0].clone()];
        assert_eq!(fit_kernels(&grid, &records, &repeated).unwrap().len(), 1);
    }

    #[test]
    fn fitted_kernels_become_log_rows() {
        let grid = ParameterGrid::new(vec![100, 400, 1000], vec![4, 8], vec![10, 20], vec![2, 4]);
        let mut records = Vec::new();
        for c in grid.valid_combinations() {
            let row = design_row(&c);
            records.push(TimingRecord {
                combination: c,
                elapsed_secs: 0.1 + 1e-3 * row[1] + 1e-6 * row[3] + 1e-5 * row[4],
                kernel: "column_partition_assignments".to_owned(),
                extra: Vec::new(),
            });
        }
        let kernels = vec!["column_partition_assignments".to_owned()];
        let fits = fit_kernels(&grid, &records, &kernels).unwrap();
        let results = regression_results(&fits, "Mon Oct 19 14:03:27 2026");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].kernel, "column_partition_assignments");
        assert!((results[0].coefficients[0] - 0.1).abs() < 1e-6);
        assert!((results[0].coefficients[1] - 1e-3).abs() < 1e-8);
    }
}
