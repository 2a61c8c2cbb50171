//! autoigv CLI - batch IGV snapshots from a target list

use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Parser;
use colored::Colorize;
use tracing::warn;

use autoigv::error::{FixSuggestion, IgvError};
use autoigv::output_dir::resolve_session_dir;
use autoigv::prefs::{resolve_preferences, DEFAULT_PREFS_FILE};
use autoigv::prompt::{choose_capture_mode, Prompter};
use autoigv::{
    CaptureMode, ChannelConfig, IgvSession, RunConfig, RunSummary, Runner, TargetTable,
    TcpChannel,
};

#[derive(Parser)]
#[command(name = "autoigv")]
#[command(about = "Batch snapshot capture for IGV over its remote-control port")]
#[command(version)]
struct Cli {
    /// Tab-separated target list: locus, then one or more .bam paths
    #[arg(short = 'f', long)]
    file: PathBuf,

    /// Base directory for this run's images (default from preferences)
    #[arg(short = 'd', long)]
    directory: Option<PathBuf>,

    /// Preferences file to use instead of autoIGVprefs.ini
    #[arg(short = 'p', long)]
    prefsfile: Option<PathBuf>,

    /// Override the genome from preferences
    #[arg(short = 'g', long)]
    genome: Option<String>,

    /// Override the IGV host from preferences
    #[arg(short = 'o', long)]
    host: Option<String>,

    /// Override the IGV port from preferences
    #[arg(short = 'r', long)]
    port: Option<u16>,

    /// Snapshot mode when a line lists several files (asked if omitted)
    #[arg(short = 'm', long, value_enum)]
    mode: Option<CaptureMode>,

    /// Write the run's event log as JSON lines
    #[arg(long)]
    events: Option<PathBuf>,

    /// Log every command and reply
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(summary) => print_summary(&summary),
        Err(e) => {
            let label = if e.is_session_error() {
                "IGV error:"
            } else {
                "Error:"
            };
            eprintln!("{} {}", label.red().bold(), e);
            if let Some(suggestion) = e.fix_suggestion() {
                eprintln!("  {} {}", "Fix:".yellow(), suggestion);
            }
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<RunSummary, IgvError> {
    println!("\n{}", "Initializing:".bold());
    let mut prompter = Prompter::stdio();

    println!("{} Loading preferences...", "→".cyan());
    let prefs = resolve_preferences(
        cli.prefsfile.as_deref(),
        Path::new(DEFAULT_PREFS_FILE),
        &mut prompter,
    )?
    .with_overrides(cli.host, cli.port, cli.genome);

    println!("{} Getting list of targets...", "→".cyan());
    let table = TargetTable::read(&cli.file)?;

    println!(
        "{} Connecting to IGV at {}...",
        "→".cyan(),
        format!("{}:{}", prefs.host, prefs.port).cyan().bold()
    );
    let channel = TcpChannel::open(ChannelConfig::new(&prefs.host, prefs.port)).await?;

    println!("{} Creating directory for this session's images...", "→".cyan());
    let snapshot_dir = resolve_session_dir(
        cli.directory.as_deref(),
        &prefs.default_directory,
        Local::now().naive_local(),
        &mut prompter,
    )?;

    let mode = choose_capture_mode(&table, cli.mode, &mut prompter)?;
    println!(
        "{} Genome: {} | mode: {}",
        "→".cyan(),
        prefs.genome.cyan(),
        format!("{:?}", mode).to_lowercase().cyan()
    );
    println!("{}", "Starting the run:".bold());

    let mut runner = Runner::new(
        IgvSession::new(channel).record_traffic(cli.events.is_some()),
        RunConfig {
            genome: prefs.genome,
            snapshot_dir,
            mode,
        },
    );
    let result = runner.run(&table).await;

    // written on abort too; that is when it is most useful
    if let Some(path) = &cli.events {
        if let Err(e) = runner.events().write_json_lines(path) {
            warn!(path = %path.display(), "could not write event log: {}", e);
        }
    }

    result
}

fn print_summary(summary: &RunSummary) {
    println!(
        "\n{} Run completed in {:.1} seconds",
        "✓".green(),
        summary.elapsed.as_secs_f64()
    );
    println!(
        "  Snapshots: {} | loci imaged: {} of {} lines",
        summary.snapshots, summary.targets_imaged, summary.lines
    );
    if summary.lines_skipped > 0 || summary.files_skipped > 0 {
        println!(
            "  {} skipped {} lines and {} files (see warnings above)",
            "!".yellow(),
            summary.lines_skipped,
            summary.files_skipped
        );
    }
    println!("  Images saved to {}", summary.output_dir.display().to_string().cyan());
}
