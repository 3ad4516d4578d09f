use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use miette::IntoDiagnostic;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use basemount_retrieve::app::{App, InputTarget};
use basemount_retrieve::config::ConfigLoader;
use basemount_retrieve::error::RetrieveError;
use basemount_retrieve::output::{JsonOutput, OutputMode, SummaryOutput};

#[derive(Parser)]
#[command(name = "basemount-retrieve")]
#[command(about = "Copy a BaseMount project or run into instrument-style run folders")]
#[command(version, author)]
struct Cli {
    /// Project directory on BaseMount, e.g. basemount/Projects/<project>
    #[arg(short, long)]
    project_dir: Option<Utf8PathBuf>,

    /// A single run (app session) directory on BaseMount
    #[arg(short, long)]
    run_dir: Option<Utf8PathBuf>,

    /// Destination; one folder per run is created inside it
    #[arg(short, long)]
    out_dir: Utf8PathBuf,

    /// Rename reads to <sample_id>_<slot>.fastq.gz
    #[arg(long)]
    rename: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print run reports as JSON
    #[arg(long)]
    json: bool,

    /// Config file (defaults to ./basemount-retrieve.json when present)
    #[arg(long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<RetrieveError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &RetrieveError) -> u8 {
    match error {
        RetrieveError::InvalidInput(_)
        | RetrieveError::MissingProjectDirectory(_)
        | RetrieveError::MissingRunDirectory(_)
        | RetrieveError::ConfigRead(_)
        | RetrieveError::ConfigParse(_) => 2,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("started basemount-retrieve v{}", env!("CARGO_PKG_VERSION"));
    debug!(project_dir = ?cli.project_dir, run_dir = ?cli.run_dir, out_dir = %cli.out_dir);

    let target = InputTarget::from_args(cli.project_dir, cli.run_dir)?;
    let config = ConfigLoader::resolve(cli.config.as_deref())?;
    let rename = cli.rename || config.rename;
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let app = App::new(config, rename);
    let reports = app.retrieve(&target, &cli.out_dir)?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_reports(&reports).into_diagnostic()?,
        OutputMode::Human => SummaryOutput::print_reports(&reports).into_diagnostic()?,
    }
    info!(out_dir = %cli.out_dir, "process complete");
    Ok(())
}
