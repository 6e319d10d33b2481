use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use timing_analysis::{find_regression_coeff, FitOutcome};
use timing_results::{
    parse_timing_to_csv, RunManifest, DEFAULT_REGRESSION_FILE, JOB_OUTPUT_FILENAME,
    PARSED_OUTPUT_FILENAME,
};

/**
This tool re-fits the kernel runtime models of a finished run directory, using the grid
recorded in its manifest, and appends the coefficients to the regression log.
The parsed csv is regenerated from the raw job output when it is missing.
*/
#[derive(Parser, Debug)]
#[command(about = "Re-fit kernel runtime regressions from a finished run directory")]
struct Cli {
    /// Run directory containing RunManifest.msgpack.zst
    run_dir: PathBuf,

    /// Append-only coefficient log
    #[arg(long, default_value = DEFAULT_REGRESSION_FILE)]
    regression_file: PathBuf,

    /// Restrict the fit to these kernels (defaults to the kernels of the run)
    #[arg(long = "kernel")]
    kernels: Vec<String>,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
    let cli = Cli::parse();

    let manifest_path = cli.run_dir.join(RunManifest::FILENAME);
    if !manifest_path.exists() {
        eprintln!("No manifest in {}", cli.run_dir.display());
        return Ok(ExitCode::FAILURE);
    }
    let manifest = RunManifest::read_msgpack_zstd(&manifest_path)?;
    println!(
        "Run of {} with {} tasks ({} mode)",
        manifest.created, manifest.n_tasks, manifest.mode
    );

    let parsed = cli.run_dir.join(PARSED_OUTPUT_FILENAME);
    if !parsed.exists() {
        let output = cli.run_dir.join(JOB_OUTPUT_FILENAME);
        if !output.exists() {
            eprintln!(
                "Neither {} nor {} exist",
                PARSED_OUTPUT_FILENAME, JOB_OUTPUT_FILENAME
            );
            return Ok(ExitCode::FAILURE);
        }
        let n = parse_timing_to_csv(&output, &parsed)?;
        println!("Parsed {} timing rows", n);
    }

    let kernels = if cli.kernels.is_empty() {
        manifest.kernels.clone()
    } else {
        cli.kernels.clone()
    };
    let fits = find_regression_coeff(&parsed, &manifest.grid, &kernels, &cli.regression_file)?;
    for fit in fits {
        match fit.outcome {
            FitOutcome::Fitted(f) => println!("{}: {:?}", fit.kernel, f.coefficients),
            FitOutcome::Insufficient { points, rank } => println!(
                "{}: insufficient data ({} points, rank {})",
                fit.kernel, points, rank
            ),
        }
    }
    Ok(ExitCode::SUCCESS)
}
