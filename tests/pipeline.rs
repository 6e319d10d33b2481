use cluster_driver::{ClusterEngine, DriverError, JobFiles, JobHandle};
use runtime_analysis::{EngineState, RunStatus, TimingRun};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use timing_analysis::{design_row, FitOutcome};
use timing_jobs::line_format::encode_line;
use timing_jobs::{read_job_input, FixedKernels, ParameterGrid};
use timing_results::{read_regression_log, read_timing_csv, RunManifest};

const FAST: [f64; 5] = [0.5, 1e-3, 2e-3, 1e-6, 3e-6];
const SLOW: [f64; 5] = [2.0, 4e-3, 1e-3, 5e-6, 1e-6];

/// Stands in for the cluster: answers every job line with an elapsed time that
/// follows a known linear model of the sizes.
struct FakeCluster {
    succeed: bool,
    output: String,
    submitted: Vec<usize>,
}

impl FakeCluster {
    fn new(succeed: bool) -> Self {
        FakeCluster {
            succeed,
            output: String::new(),
            submitted: Vec::new(),
        }
    }
}

fn elapsed(kernel: &str, row: &[f64; 5]) -> f64 {
    let coefficients = if kernel == "slow" { SLOW } else { FAST };
    coefficients.iter().zip(row.iter()).map(|(c, x)| c * x).sum()
}

impl ClusterEngine for FakeCluster {
    fn submit(&mut self, files: &JobFiles, n_tasks: usize) -> Result<JobHandle, DriverError> {
        self.submitted.push(n_tasks);
        for job in read_job_input(&files.input_filename).unwrap() {
            let mut args = job.args().clone();
            if let Ok(combination) = job.combination() {
                let t = elapsed(job.kernel().unwrap(), &design_row(&combination));
                args.insert(String::from("elapsed_secs"), Value::from(t));
            } else {
                // state jobs carry no sizes, the engine reports the state's own
                let sizes = [("num_rows", 4), ("num_cols", 2), ("num_clusters", 2), ("num_views", 2)];
                for (name, size) in sizes {
                    args.insert(String::from(name), Value::from(size));
                }
                args.insert(String::from("elapsed_secs"), Value::from(0.25));
            }
            self.output.push_str(&encode_line(job.key(), &args).unwrap());
            self.output.push('\n');
        }
        Ok(JobHandle::detached("fake-1", &files.output_path))
    }

    fn wait(&mut self, _handle: &mut JobHandle) -> bool {
        self.succeed
    }

    fn fetch(&mut self, _handle: &JobHandle, destination: &Path) -> Result<(), DriverError> {
        fs::write(destination, &self.output)?;
        Ok(())
    }
}

fn grid_run(base: &Path, grid: ParameterGrid) -> TimingRun {
    let mut run = TimingRun::new(grid, &FixedKernels::new(["fast", "slow"]));
    run.base_dir = base.join("runs");
    run.regression_file = base.join("coeffs.csv");
    run
}

fn full_rank_grid() -> ParameterGrid {
    ParameterGrid::new(vec![100, 400, 1000], vec![4, 8], vec![10, 20], vec![2, 4])
}

fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries {
            let path = entry.unwrap().path();
            if path.is_dir() {
                files.extend(files_under(&path));
            } else {
                files.push(path);
            }
        }
    }
    files
}

#[test]
fn dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let grid = ParameterGrid::new(vec![100, 400], vec![8], vec![10, 20], vec![2]);
    let mut run = TimingRun::new(grid, &FixedKernels::default());
    run.base_dir = dir.path().join("runs");
    run.regression_file = dir.path().join("coeffs.csv");

    let report = run.dry_run();
    assert_eq!(report.status, RunStatus::DryRun);
    assert_eq!(report.n_tasks, 4 * 5);
    let command = report.command.unwrap();
    assert!(command.contains("-D mapred.map.tasks=20"));
    assert!(command.contains("-input /user/bigdata/SSCI/hadoop_input"));
    assert_eq!(command.lines().count(), 1);
    assert!(files_under(dir.path()).is_empty());
    assert!(!run.base_dir.exists());
}

#[test]
fn remote_run_fits_every_kernel() {
    let dir = tempfile::tempdir().unwrap();
    let run = grid_run(dir.path(), full_rank_grid());
    let mut cluster = FakeCluster::new(true);

    let report = run.run_remote(&mut cluster).unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.n_tasks, 24 * 2);
    assert_eq!(cluster.submitted, vec![48]);
    assert!(report.warnings.is_empty());

    let manifest = RunManifest::read_msgpack_zstd(report.run_dir.join(RunManifest::FILENAME)).unwrap();
    assert_eq!(manifest.n_tasks, 48);
    assert_eq!(manifest.mode, "remote");
    assert_eq!(manifest.grid, full_rank_grid());

    let table = read_timing_csv(report.run_dir.join("parsed_output.csv")).unwrap();
    assert_eq!(table.records.len(), 48);
    assert_eq!(table.header[5], "which_kernel");

    assert_eq!(report.fits.len(), 2);
    for fit in &report.fits {
        let f = fit.outcome.fitted().unwrap();
        assert_eq!(f.points, 24);
        for combination in full_rank_grid().valid_combinations() {
            let row = design_row(&combination);
            assert!((f.predict(&row) - elapsed(&fit.kernel, &row)).abs() < 1e-6);
        }
    }

    let log = read_regression_log(dir.path().join("coeffs.csv")).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].kernel, "fast");
    assert_eq!(log[1].kernel, "slow");
    assert!((log[0].coefficients[0] - FAST[0]).abs() < 1e-4);
    assert!((log[1].coefficients[0] - SLOW[0]).abs() < 1e-4);

    // a second run appends to the same log
    let again = run.run_remote(&mut FakeCluster::new(true)).unwrap();
    assert_ne!(again.run_dir, report.run_dir);
    assert_eq!(read_regression_log(dir.path().join("coeffs.csv")).unwrap().len(), 4);
}

#[test]
fn appended_grid_reruns_the_whole_job_input() {
    let dir = tempfile::tempdir().unwrap();
    let first = grid_run(dir.path(), full_rank_grid()).run_remote(&mut FakeCluster::new(true)).unwrap();
    assert_eq!(first.n_tasks, 48);

    let larger = ParameterGrid::new(vec![4000], vec![4, 8], vec![10, 20], vec![2, 4]);
    let mut run = grid_run(dir.path(), larger);
    run.append_to = Some(first.run_dir.clone());

    let planned = run.dry_run();
    assert_eq!(planned.n_tasks, 48 + 16);
    assert_eq!(planned.run_dir, first.run_dir);
    assert_eq!(read_job_input(first.run_dir.join("hadoop_input")).unwrap().len(), 48);

    let mut cluster = FakeCluster::new(true);
    let report = run.run_remote(&mut cluster).unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.run_dir, first.run_dir);
    assert_eq!(report.n_tasks, 64);
    assert_eq!(cluster.submitted, vec![64]);
    assert_eq!(read_job_input(report.run_dir.join("hadoop_input")).unwrap().len(), 64);

    let manifest = RunManifest::read_msgpack_zstd(report.run_dir.join(RunManifest::FILENAME)).unwrap();
    assert_eq!(manifest.n_tasks, 64);
    assert_eq!(manifest.grid.num_rows_list, vec![100, 400, 1000, 4000]);
    assert_eq!(manifest.kernels, vec!["fast", "slow"]);

    assert_eq!(report.fits.len(), 2);
    for fit in &report.fits {
        assert_eq!(fit.outcome.fitted().unwrap().points, 32);
    }
    assert_eq!(read_regression_log(dir.path().join("coeffs.csv")).unwrap().len(), 4);
}

#[test]
fn appending_needs_an_earlier_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut run = grid_run(dir.path(), full_rank_grid());
    run.append_to = Some(dir.path().join("missing"));
    let mut cluster = FakeCluster::new(true);
    assert!(run.run_remote(&mut cluster).is_err());
    assert!(cluster.submitted.is_empty());
}

#[test]
fn repeated_kernels_and_sizes_are_timed_once() {
    let dir = tempfile::tempdir().unwrap();
    let grid = ParameterGrid::new(vec![100, 400, 1000, 400], vec![4, 8, 4], vec![10, 20], vec![2, 4]);
    let mut run = TimingRun::new(grid, &FixedKernels::new(["fast", "slow", "fast"]));
    run.base_dir = dir.path().join("runs");
    run.regression_file = dir.path().join("coeffs.csv");
    assert_eq!(run.kernels, vec!["fast", "slow"]);
    assert_eq!(run.plan().len(), 24 * 2);

    let report = run.run_remote(&mut FakeCluster::new(true)).unwrap();
    assert_eq!(report.n_tasks, 48);
    assert_eq!(report.fits.len(), 2);
    assert_eq!(report.fits[0].outcome.fitted().unwrap().points, 24);
    assert_eq!(read_regression_log(dir.path().join("coeffs.csv")).unwrap().len(), 2);
}

#[test]
fn failed_remote_job_skips_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let run = grid_run(dir.path(), full_rank_grid());
    let mut cluster = FakeCluster::new(false);

    let report = run.run_remote(&mut cluster).unwrap();
    assert_eq!(report.status, RunStatus::JobFailed);
    assert!(!report.success());
    assert!(report.fits.is_empty());
    assert!(report.run_dir.join("hadoop_input").exists());
    assert!(!report.run_dir.join("hadoop_output").exists());
    assert!(!report.run_dir.join("parsed_output.csv").exists());
    assert!(!dir.path().join("coeffs.csv").exists());
}

#[test]
fn degenerate_grid_submits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let run = grid_run(
        dir.path(),
        ParameterGrid::new(vec![10], vec![7], vec![3], vec![2]),
    );
    let mut cluster = FakeCluster::new(true);

    let report = run.run_remote(&mut cluster).unwrap();
    assert_eq!(report.status, RunStatus::NothingToRun);
    assert!(report.success());
    assert_eq!(report.n_tasks, 0);
    assert!(cluster.submitted.is_empty());
    assert!(files_under(dir.path()).is_empty());
}

#[test]
fn too_few_sizes_are_flagged_not_logged() {
    let dir = tempfile::tempdir().unwrap();
    let run = grid_run(
        dir.path(),
        ParameterGrid::new(vec![100, 400], vec![8], vec![10], vec![2]),
    );
    let report = run.run_remote(&mut FakeCluster::new(true)).unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.fits.len(), 2);
    for fit in &report.fits {
        assert_eq!(
            fit.outcome,
            FitOutcome::Insufficient { points: 2, rank: 2 }
        );
    }
    assert!(!dir.path().join("coeffs.csv").exists());
}

#[test]
fn single_state_run_ships_the_state() {
    let dir = tempfile::tempdir().unwrap();
    let state: EngineState = serde_json::from_str::<EngineState>(
        r#"{
            "T": [[0.1, 1.0], [0.2, 2.0], [0.3, 3.0], [0.4, 4.0]],
            "M_c": {},
            "M_r": {},
            "X_L": {"column_partition": {"assignments": [0, 1]}},
            "data_inverse_permutation_indices": [[3, 2, 1, 0], [0, 1, 2, 3]]
        }"#,
    )
    .unwrap()
    .into_generative(2, 2)
    .unwrap();

    let mut run = TimingRun::for_state(&state, 2, &FixedKernels::new(["fast", "slow", "other"]));
    run.base_dir = dir.path().join("runs");
    run.regression_file = dir.path().join("coeffs.csv");

    let jobs = run.plan();
    assert_eq!(jobs.len(), 3);
    assert_eq!(jobs[0].args()["X_D"], serde_json::json!([[1, 1, 0, 0], [0, 0, 1, 1]]));
    assert_eq!(jobs[2].kernel(), Some("other"));

    let report = run.run_remote(&mut FakeCluster::new(true)).unwrap();
    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.n_tasks, 3);
    assert!(report.fits.is_empty());
    let written = read_job_input(report.run_dir.join("hadoop_input")).unwrap();
    assert_eq!(written[1].args()["X_L"]["column_partition"]["assignments"], serde_json::json!([0, 1]));
    assert!(!dir.path().join("coeffs.csv").exists());
}
