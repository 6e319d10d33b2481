use crate::AnalysisError;
use nalgebra::{DMatrix, DVector};
use timing_jobs::ParameterCombination;
use timing_results::COEFFICIENT_COUNT;

pub const FEATURE_COUNT: usize = COEFFICIENT_COUNT;

pub type DesignRow = [f64; FEATURE_COUNT];

/// Regression basis: `[1, r, c·k, r·c·k, v·r·c]` for rows `r`, columns `c`,
/// clusters `k` and views `v`.
pub fn design_row(combination: &ParameterCombination) -> DesignRow {
    let r = combination.num_rows as f64;
    let c = combination.num_cols as f64;
    let k = combination.num_clusters as f64;
    let v = combination.num_views as f64;
    [1.0, r, c * k, r * c * k, v * r * c]
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquaresFit {
    pub coefficients: [f64; FEATURE_COUNT],
    pub points: usize,
    pub rank: usize,
    pub residual_sum_of_squares: f64,
    /// Residual sum of squares of the mean alone, for comparison.
    pub mean_only_rss: f64,
}

impl LeastSquaresFit {
    pub fn predict(&self, row: &DesignRow) -> f64 {
        row.iter()
            .zip(self.coefficients.iter())
            .map(|(x, c)| x * c)
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    Fitted(LeastSquaresFit),
    /// Fewer points than coefficients, or a rank-deficient design: any
    /// coefficients would be one arbitrary solution among many.
    Insufficient { points: usize, rank: usize },
}

impl FitOutcome {
    pub fn fitted(&self) -> Option<&LeastSquaresFit> {
        match self {
            FitOutcome::Fitted(fit) => Some(fit),
            FitOutcome::Insufficient { .. } => None,
        }
    }
}

/// Minimizes `|A·x - b|²` through a singular value decomposition of `A`.
pub fn fit_least_squares(rows: &[DesignRow], targets: &[f64]) -> Result<FitOutcome, AnalysisError> {
    if rows.len() != targets.len() {
        return Err(AnalysisError::DimensionMismatch {
            rows: rows.len(),
            targets: targets.len(),
        });
    }
    let points = rows.len();
    if points == 0 {
        return Ok(FitOutcome::Insufficient { points, rank: 0 });
    }

    let a = DMatrix::from_fn(points, FEATURE_COUNT, |i, j| rows[i][j]);
    let b = DVector::from_column_slice(targets);
    let svd = a.svd(true, true);

    // same cutoff as LAPACK-style lstsq: largest singular value scaled by size and epsilon
    let eps = svd.singular_values.max() * (points.max(FEATURE_COUNT) as f64) * f64::EPSILON;
    let rank = svd.rank(eps);
    if points < FEATURE_COUNT || rank < FEATURE_COUNT {
        return Ok(FitOutcome::Insufficient { points, rank });
    }

    let x = svd
        .solve(&b, eps)
        .map_err(|e| AnalysisError::Solver(e.to_owned()))?;

    let mut fit = LeastSquaresFit {
        coefficients: [0.0; FEATURE_COUNT],
        points,
        rank,
        residual_sum_of_squares: 0.0,
        mean_only_rss: mean_only_rss(targets),
    };
    fit.coefficients.copy_from_slice(x.as_slice());
    fit.residual_sum_of_squares = rows
        .iter()
        .zip(targets)
        .map(|(row, t)| (fit.predict(row) - t).powi(2))
        .sum();
    Ok(FitOutcome::Fitted(fit))
}

/// Residual sum of squares of the intercept-only model.
pub fn mean_only_rss(targets: &[f64]) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }
    let mean = targets.iter().sum::<f64>() / targets.len() as f64;
    targets.iter().map(|t| (t - mean) * (t - mean)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use timing_jobs::ParameterGrid;

    const TRUE_COEFFICIENTS: [f64; FEATURE_COUNT] = [0.5, 1e-3, 1e-2, 1e-5, 2e-5];

    fn rank_five_grid() -> ParameterGrid {
        ParameterGrid::new(vec![100, 400, 1000], vec![4, 8], vec![10, 20], vec![2, 4])
    }

    fn design(grid: &ParameterGrid) -> Vec<DesignRow> {
        grid.valid_combinations().iter().map(design_row).collect()
    }

    #[test]
    fn basis() {
        let row = design_row(&ParameterCombination::new(100, 8, 10, 2));
        assert_eq!(row, [1.0, 100.0, 80.0, 8000.0, 1600.0]);
    }

    #[test]
    fn recovers_exact_model() {
        let rows = design(&rank_five_grid());
        assert_eq!(rows.len(), 24);
        let truth = LeastSquaresFit {
            coefficients: TRUE_COEFFICIENTS,
            points: 0,
            rank: 0,
            residual_sum_of_squares: 0.0,
            mean_only_rss: 0.0,
        };
        let targets: Vec<f64> = rows.iter().map(|r| truth.predict(r)).collect();
        let fit = match fit_least_squares(&rows, &targets).unwrap() {
            FitOutcome::Fitted(fit) => fit,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(fit.rank, FEATURE_COUNT);
        assert_eq!(fit.points, 24);
        for (found, expected) in fit.coefficients.iter().zip(TRUE_COEFFICIENTS.iter()) {
            assert!(
                (found - expected).abs() <= 1e-4 * expected.abs(),
                "{} != {}",
                found,
                expected
            );
        }
        assert!(fit.residual_sum_of_squares < 1e-12);
    }

    #[test]
    fn deterministic_and_no_worse_than_the_mean() {
        let rows = design(&rank_five_grid());
        let targets: Vec<f64> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let noise = ((i * 7919) % 13) as f64 * 0.01 - 0.06;
                0.2 + 3e-4 * r[1] + 2e-6 * r[3] + noise
            })
            .collect();
        let first = fit_least_squares(&rows, &targets).unwrap();
        let second = fit_least_squares(&rows, &targets).unwrap();
        assert_eq!(first, second);
        let fit = first.fitted().unwrap();
        assert_eq!(fit.mean_only_rss, mean_only_rss(&targets));
        assert!(fit.residual_sum_of_squares <= fit.mean_only_rss + 1e-9);
    }

    #[test]
    fn two_points_are_insufficient() {
        let rows = vec![
            design_row(&ParameterCombination::new(100, 8, 10, 2)),
            design_row(&ParameterCombination::new(400, 8, 10, 2)),
        ];
        let outcome = fit_least_squares(&rows, &[0.5, 1.1]).unwrap();
        match outcome {
            FitOutcome::Insufficient { points, rank } => {
                assert_eq!(points, 2);
                assert!(rank <= 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn collinear_design_is_insufficient() {
        // a single column and view count makes v·r·c proportional to r
        let grid = ParameterGrid::new(vec![100, 400, 1000, 4000], vec![8], vec![10, 20, 50], vec![2]);
        let rows = design(&grid);
        assert!(rows.len() >= FEATURE_COUNT);
        let targets: Vec<f64> = rows.iter().map(|r| 1e-3 * r[1] + 0.1).collect();
        match fit_least_squares(&rows, &targets).unwrap() {
            FitOutcome::Insufficient { points, rank } => {
                assert_eq!(points, rows.len());
                assert!(rank < FEATURE_COUNT);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn mismatched_lengths() {
        let rows = vec![design_row(&ParameterCombination::new(100, 8, 10, 2))];
        assert!(matches!(
            fit_least_squares(&rows, &[]),
            Err(AnalysisError::DimensionMismatch { rows: 1, targets: 0 })
        ));
    }

    #[test]
    fn mean_only() {
        assert_eq!(mean_only_rss(&[]), 0.0);
        assert!((mean_only_rss(&[1.0, 2.0, 3.0]) - 2.0).abs() < 1e-12);
    }
}
