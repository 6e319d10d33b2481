use clap::Parser;
use cluster_driver::{ExecutionMode, HadoopConfig, HadoopEngine};
use runtime_analysis::{init_logging, print_report, TimingRun, DEFAULT_BASE_DIR};
use std::path::PathBuf;
use std::process::ExitCode;
use timing_jobs::grid::{
    DEFAULT_NUM_CLUSTERS_LIST, DEFAULT_NUM_COLS_LIST, DEFAULT_NUM_ROWS_LIST,
    DEFAULT_NUM_SPLITS_LIST,
};
use timing_jobs::{FixedKernels, KernelFile, KernelProvider, ParameterGrid};
use timing_results::DEFAULT_REGRESSION_FILE;

/// Times every engine kernel over a grid of dataset sizes and fits one runtime
/// model per kernel. Without --do-local or --do-remote, only prints the cluster
/// command that would be submitted.
#[derive(Parser, Debug)]
#[command(name = "runtime_analysis")]
#[command(about = "Automated runtime tests of the inference engine kernels")]
struct Cli {
    #[arg(long, default_value_t = 0)]
    gen_seed: u64,

    #[arg(long, default_value_t = 10)]
    n_steps: u64,

    /// Engine line processor (defaults to the cluster configuration's)
    #[arg(long)]
    which_engine_binary: Option<String>,

    /// Run the engine on this machine (not production ready)
    #[arg(long, conflicts_with = "do_remote")]
    do_local: bool,

    /// Submit to the Hadoop cluster and wait for the result
    #[arg(long)]
    do_remote: bool,

    #[arg(long, num_args = 0.., value_parser = clap::value_parser!(u64).range(1..),
          default_values_t = DEFAULT_NUM_ROWS_LIST)]
    num_rows_list: Vec<u64>,

    #[arg(long, num_args = 0.., value_parser = clap::value_parser!(u64).range(1..),
          default_values_t = DEFAULT_NUM_COLS_LIST)]
    num_cols_list: Vec<u64>,

    #[arg(long, num_args = 0.., value_parser = clap::value_parser!(u64).range(1..),
          default_values_t = DEFAULT_NUM_CLUSTERS_LIST)]
    num_clusters_list: Vec<u64>,

    #[arg(long, num_args = 0.., value_parser = clap::value_parser!(u64).range(1..),
          default_values_t = DEFAULT_NUM_SPLITS_LIST)]
    num_splits_list: Vec<u64>,

    /// Kernel to time, repeatable (defaults to every known kernel)
    #[arg(long = "kernel")]
    kernels: Vec<String>,

    /// File listing the kernels to time, one per line
    #[arg(long, conflicts_with = "kernels")]
    kernels_file: Option<PathBuf>,

    /// TOML cluster settings
    #[arg(long)]
    cluster_config: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_REGRESSION_FILE)]
    regression_file: PathBuf,

    /// Directory receiving the per-run directories
    #[arg(long, default_value = DEFAULT_BASE_DIR)]
    output_dir: PathBuf,

    /// Earlier run directory whose job input is augmented with this grid
    #[arg(long)]
    append_to: Option<PathBuf>,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    let cluster = match &cli.cluster_config {
        Some(path) => HadoopConfig::load_toml(path)?,
        None => HadoopConfig::default(),
    };
    let kernels = if let Some(path) = &cli.kernels_file {
        KernelFile::load(path)?.kernel_names()
    } else if !cli.kernels.is_empty() {
        cli.kernels.clone()
    } else {
        FixedKernels::default().kernel_names()
    };
    let engine_binary = cli
        .which_engine_binary
        .clone()
        .unwrap_or_else(|| cluster.default_engine_binary.clone());

    println!("using num_rows_list: {:?}", cli.num_rows_list);
    println!("using num_cols_list: {:?}", cli.num_cols_list);
    println!("using num_clusters_list: {:?}", cli.num_clusters_list);
    println!("using num_splits_list: {:?}", cli.num_splits_list);
    println!("using engine_binary: {}", engine_binary);

    let grid = ParameterGrid::new(
        cli.num_rows_list,
        cli.num_cols_list,
        cli.num_clusters_list,
        cli.num_splits_list,
    );
    let mut run = TimingRun::new(grid, &FixedKernels(kernels));
    run.seed = cli.gen_seed;
    run.n_steps = cli.n_steps;
    run.engine_binary = engine_binary.clone();
    run.regression_file = cli.regression_file;
    run.base_dir = cli.output_dir;
    run.append_to = cli.append_to;
    run.cluster = cluster.clone();

    let mode = ExecutionMode::from_flags(cli.do_local, cli.do_remote);
    let report = match mode {
        ExecutionMode::Local => {
            let report = run.run_local()?;
            println!("Local engine for automated timing runs is not production ready");
            report
        }
        ExecutionMode::Remote => run.run_remote(HadoopEngine::new(cluster, engine_binary))?,
        ExecutionMode::DryRun => run.dry_run(),
    };
    print_report(&report);

    if mode == ExecutionMode::Remote && !report.success() {
        println!("remote hadoop job NOT successful");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
