use crate::run_dir::{RunDirectory, DEFAULT_BASE_DIR};
use crate::state::EngineState;
use crate::PipelineError;
use cluster_driver::{hadoop_command, ClusterEngine, ExecutionMode, HadoopConfig, LocalExecutor};
use itertools::Itertools;
use log::{info, warn};
use std::path::PathBuf;
use timing_analysis::{find_regression_coeff, KernelFit};
use timing_jobs::descriptor::TIME_ANALYZE;
use timing_jobs::{
    read_job_input, write_grid_jobs, FixedKernels, JobArgs, JobDescriptor, JobInputWriter,
    JobTemplate, KernelProvider, ParameterGrid, WriteMode,
};
use timing_results::{
    parse_timing_to_csv, timestamp_now, CommandDict, RunManifest, TableData,
    DEFAULT_REGRESSION_FILE,
};

#[derive(Debug, Clone, PartialEq)]
enum JobSource {
    /// One job per valid grid combination and kernel, on placeholder data.
    Grid,
    /// One job per kernel on a fixed state.
    State {
        table_data: TableData,
        payload: JobArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Nothing was executed, `RunReport::command` holds the cluster command.
    DryRun,
    /// The grid has no valid combination.
    NothingToRun,
    Completed,
    JobFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub run_dir: PathBuf,
    pub n_tasks: usize,
    pub status: RunStatus,
    pub command: Option<String>,
    pub fits: Vec<KernelFit>,
    /// Non-fatal problems met along the way.
    pub warnings: Vec<String>,
}

impl RunReport {
    fn new(run_dir: PathBuf, n_tasks: usize, status: RunStatus) -> Self {
        RunReport {
            run_dir,
            n_tasks,
            status,
            command: None,
            fits: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.status != RunStatus::JobFailed
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }
}

/// One timing run, from job generation to the coefficient log.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingRun {
    pub grid: ParameterGrid,
    pub kernels: Vec<String>,
    pub seed: u64,
    pub n_steps: u64,
    pub engine_binary: String,
    pub regression_file: PathBuf,
    pub base_dir: PathBuf,
    pub cluster: HadoopConfig,
    /// Earlier run directory to augment instead of starting a fresh one.
    pub append_to: Option<PathBuf>,
    source: JobSource,
}

impl TimingRun {
    pub fn new(grid: ParameterGrid, kernels: &impl KernelProvider) -> Self {
        let cluster = HadoopConfig::default();
        TimingRun {
            grid,
            kernels: kernels.kernel_names().into_iter().unique().collect(),
            seed: 0,
            n_steps: 10,
            engine_binary: cluster.default_engine_binary.clone(),
            regression_file: PathBuf::from(DEFAULT_REGRESSION_FILE),
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            cluster,
            append_to: None,
            source: JobSource::Grid,
        }
    }

    /// Times every kernel once on `state`; no regression is fitted.
    pub fn for_state(state: &EngineState, num_clusters: u64, kernels: &impl KernelProvider) -> Self {
        let num_views = state.x_d.as_ref().map(Vec::len).unwrap_or(0) as u64;
        let grid = ParameterGrid::new(
            vec![state.num_rows() as u64],
            vec![state.num_cols() as u64],
            vec![num_clusters],
            vec![num_views],
        );
        TimingRun {
            source: JobSource::State {
                table_data: state.table_data(),
                payload: state.job_payload(),
            },
            ..TimingRun::new(grid, kernels)
        }
    }

    pub fn template(&self) -> JobTemplate {
        JobTemplate::time_analyze(self.seed, self.n_steps)
    }

    fn kernel_provider(&self) -> FixedKernels {
        FixedKernels(self.kernels.clone())
    }

    /// Every job line of the run, without touching the filesystem.
    pub fn plan(&self) -> Vec<JobDescriptor> {
        let template = self.template();
        let kernels = self.kernel_provider();
        match &self.source {
            JobSource::Grid => self
                .grid
                .valid_combinations()
                .iter()
                .flat_map(|c| template.combination_descriptors(c, &kernels))
                .collect(),
            JobSource::State { payload, .. } => template.descriptors(payload, &kernels),
        }
    }

    fn planned_dir(&self) -> RunDirectory {
        match &self.append_to {
            Some(path) => RunDirectory::at(path),
            None => RunDirectory::planned(&self.base_dir),
        }
    }

    pub fn dry_run(&self) -> RunReport {
        let dir = self.planned_dir();
        let previous = match &self.append_to {
            Some(_) => read_job_input(dir.job_input()).map(|jobs| jobs.len()).unwrap_or(0),
            None => 0,
        };
        let n_tasks = previous + self.plan().len();
        let command = hadoop_command(&self.cluster, &self.engine_binary, &dir.job_files(), n_tasks);
        let mut report = RunReport::new(dir.path().to_path_buf(), n_tasks, RunStatus::DryRun);
        report.command = Some(command.to_command_string());
        report
    }

    /// Writes side files, job input and manifest; returns the task count.
    fn write_inputs(&self, dir: &RunDirectory, mode: ExecutionMode) -> Result<usize, PipelineError> {
        let template = self.template();
        let kernels = self.kernel_provider();
        let n_tasks = match &self.source {
            JobSource::Grid => {
                TableData::placeholder().write_msgpack_zstd(dir.table_data())?;
                write_grid_jobs(dir.job_input(), WriteMode::Truncate, &self.grid, &template, &kernels)?
            }
            JobSource::State {
                table_data,
                payload,
            } => {
                table_data.write_msgpack_zstd(dir.table_data())?;
                let mut writer = JobInputWriter::create(dir.job_input(), WriteMode::Truncate)?;
                for job in template.descriptors(payload, &kernels) {
                    writer.write(&job)?;
                }
                writer.finish()?
            }
        };
        CommandDict::new(TIME_ANALYZE).write_msgpack(dir.command_dict())?;
        RunManifest {
            created: timestamp_now(),
            grid: self.grid.clone(),
            kernels: self.kernels.clone(),
            seed: self.seed,
            n_steps: self.n_steps,
            n_tasks,
            mode: mode.to_string(),
        }
        .write_msgpack_zstd(dir.manifest())?;
        info!("{} tasks written to {}", n_tasks, dir.job_input().display());
        Ok(n_tasks)
    }

    /// Appends this run's grid jobs to the job input of an earlier grid run.
    /// The manifest then covers both grids, and the returned task count is
    /// that of the whole file since the cluster job reruns every line.
    pub fn augment(&self, dir: &RunDirectory, mode: ExecutionMode) -> Result<usize, PipelineError> {
        if let JobSource::State { .. } = self.source {
            return Err(PipelineError::AppendState(dir.path().to_path_buf()));
        }
        let previous = RunManifest::read_msgpack_zstd(dir.manifest())?;
        let added = write_grid_jobs(
            dir.job_input(),
            WriteMode::Append,
            &self.grid,
            &self.template(),
            &self.kernel_provider(),
        )?;
        let n_tasks = read_job_input(dir.job_input())?.len();
        RunManifest {
            grid: previous.grid.union(&self.grid),
            kernels: previous
                .kernels
                .iter()
                .chain(self.kernels.iter())
                .unique()
                .cloned()
                .collect(),
            seed: self.seed,
            n_steps: self.n_steps,
            n_tasks,
            mode: mode.to_string(),
            ..previous
        }
        .write_msgpack_zstd(dir.manifest())?;
        info!(
            "{} tasks appended to {}, {} in total",
            added,
            dir.job_input().display(),
            n_tasks
        );
        Ok(n_tasks)
    }

    fn nothing_to_run(&self) -> RunReport {
        info!("no valid parameter combination, nothing to run");
        RunReport::new(self.planned_dir().path().to_path_buf(), 0, RunStatus::NothingToRun)
    }

    /// `None` when there is no job to run; no directory is created or
    /// modified then.
    fn prepare(&self, mode: ExecutionMode) -> Result<Option<(RunDirectory, usize)>, PipelineError> {
        let n_combinations = match &self.source {
            JobSource::Grid => self.grid.valid_combinations().len(),
            JobSource::State { .. } => 1,
        };
        if n_combinations == 0 || self.kernels.is_empty() {
            return Ok(None);
        }
        let prepared = match &self.append_to {
            Some(path) => {
                let dir = RunDirectory::open(path)?;
                let n_tasks = self.augment(&dir, mode)?;
                (dir, n_tasks)
            }
            None => {
                let dir = RunDirectory::create(&self.base_dir)?;
                let n_tasks = self.write_inputs(&dir, mode)?;
                (dir, n_tasks)
            }
        };
        Ok(Some(prepared))
    }

    fn analyze(&self, dir: &RunDirectory) -> Result<Vec<KernelFit>, PipelineError> {
        let n_rows = parse_timing_to_csv(dir.job_output(), dir.parsed_output())?;
        info!("parsed {} timing rows", n_rows);
        match self.source {
            JobSource::Grid => {
                // an augmented run covers more than this run's grid
                let manifest = RunManifest::read_msgpack_zstd(dir.manifest())?;
                Ok(find_regression_coeff(
                    dir.parsed_output(),
                    &manifest.grid,
                    &manifest.kernels,
                    &self.regression_file,
                )?)
            }
            JobSource::State { .. } => Ok(Vec::new()),
        }
    }

    /// Runs the engine on this machine with its usual arguments.
    pub fn run_local(&self) -> Result<RunReport, PipelineError> {
        self.run_local_with(|dir| {
            LocalExecutor::for_engine(&self.engine_binary, &dir.table_data(), &dir.command_dict())
        })
    }

    /// Only writing the inputs can fail; executor and analysis problems end up
    /// in `RunReport::warnings`.
    pub fn run_local_with<F>(&self, executor: F) -> Result<RunReport, PipelineError>
    where
        F: FnOnce(&RunDirectory) -> LocalExecutor,
    {
        let (dir, n_tasks) = match self.prepare(ExecutionMode::Local)? {
            Some(prepared) => prepared,
            None => return Ok(self.nothing_to_run()),
        };
        let mut report = RunReport::new(dir.path().to_path_buf(), n_tasks, RunStatus::Completed);
        match executor(&dir).run(&dir.job_input(), &dir.job_output()) {
            Ok(true) => {}
            Ok(false) => {
                report.status = RunStatus::JobFailed;
                report.warn(String::from("local engine run NOT successful"));
                return Ok(report);
            }
            Err(e) => {
                report.status = RunStatus::JobFailed;
                report.warn(format!("local engine could not run: {}", e));
                return Ok(report);
            }
        }
        match self.analyze(&dir) {
            Ok(fits) => report.fits = fits,
            Err(e) => report.warn(format!("local results not analyzed: {}", e)),
        }
        Ok(report)
    }

    /// Submits, blocks until the job is over, then fetches and fits.
    /// A failed job is reported in the status; parsing is skipped in that case.
    pub fn run_remote<E: ClusterEngine>(&self, mut engine: E) -> Result<RunReport, PipelineError> {
        let (dir, n_tasks) = match self.prepare(ExecutionMode::Remote)? {
            Some(prepared) => prepared,
            None => return Ok(self.nothing_to_run()),
        };
        let mut report = RunReport::new(dir.path().to_path_buf(), n_tasks, RunStatus::Completed);
        let mut handle = match engine.submit(&dir.job_files(), n_tasks) {
            Ok(handle) => handle,
            Err(e) => {
                report.status = RunStatus::JobFailed;
                report.warn(format!("submission failed: {}", e));
                return Ok(report);
            }
        };
        if !engine.wait(&mut handle) {
            report.status = RunStatus::JobFailed;
            report.warn(format!("job {} did not complete", handle.id));
            return Ok(report);
        }
        if let Err(e) = engine.fetch(&handle, &dir.job_output()) {
            report.status = RunStatus::JobFailed;
            report.warn(format!("could not fetch output of {}: {}", handle.id, e));
            return Ok(report);
        }
        report.fits = self.analyze(&dir)?;
        Ok(report)
    }
}
