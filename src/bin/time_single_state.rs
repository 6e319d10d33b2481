use clap::Parser;
use cluster_driver::{ExecutionMode, HadoopConfig, HadoopEngine};
use runtime_analysis::{init_logging, print_report, EngineState, TimingRun, DEFAULT_BASE_DIR};
use std::path::PathBuf;
use std::process::ExitCode;
use timing_jobs::{FixedKernels, KernelProvider};

/**
Times every kernel once on a single engine state, put back into the clustering
that generated its data. The state is the JSON export of the engine, and must
carry the inverse row permutations of the data generator.
*/
#[derive(Parser, Debug)]
#[command(about = "Time every engine kernel on one generated state")]
struct Cli {
    /// JSON state exported by the engine
    state_file: PathBuf,

    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u64).range(1..))]
    num_clusters: u64,

    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u64).range(1..))]
    num_splits: u64,

    #[arg(long, default_value_t = 0)]
    gen_seed: u64,

    #[arg(long, default_value_t = 10)]
    n_steps: u64,

    #[arg(long)]
    which_engine_binary: Option<String>,

    #[arg(long, conflicts_with = "do_remote")]
    do_local: bool,

    #[arg(long)]
    do_remote: bool,

    #[arg(long = "kernel")]
    kernels: Vec<String>,

    #[arg(long)]
    cluster_config: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_BASE_DIR)]
    output_dir: PathBuf,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    init_logging();
    let cli = Cli::parse();

    let cluster = match &cli.cluster_config {
        Some(path) => HadoopConfig::load_toml(path)?,
        None => HadoopConfig::default(),
    };
    let kernels = if cli.kernels.is_empty() {
        FixedKernels::default()
    } else {
        FixedKernels(cli.kernels.clone())
    };
    let engine_binary = cli
        .which_engine_binary
        .clone()
        .unwrap_or_else(|| cluster.default_engine_binary.clone());

    let state = EngineState::load_json(&cli.state_file)?
        .into_generative(cli.num_clusters as usize, cli.num_splits as usize)?;
    println!(
        "state of {} rows and {} columns, {} clusters, {} views",
        state.num_rows(),
        state.num_cols(),
        cli.num_clusters,
        cli.num_splits
    );

    let mut run = TimingRun::for_state(&state, cli.num_clusters, &kernels);
    run.seed = cli.gen_seed;
    run.n_steps = cli.n_steps;
    run.engine_binary = engine_binary.clone();
    run.base_dir = cli.output_dir;
    run.cluster = cluster.clone();
    println!("timing kernels: {:?}", kernels.kernel_names());

    let mode = ExecutionMode::from_flags(cli.do_local, cli.do_remote);
    let report = match mode {
        ExecutionMode::Local => run.run_local()?,
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
