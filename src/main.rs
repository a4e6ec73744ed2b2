//! coalesce - consolidate scattered folders into one destination.
//!
//! Usage:
//!   coalesce consolidate --dest DIR --source DIR...   Copy sources into DIR
//!   coalesce cleanup [ROOT]...                        Remove empty folders
//!   coalesce --help                                   Show help

use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use coalesce_core::{
    AssumeYes, CleanupConfig, ConfirmationProvider, PathProvider, PromptConfirm, PromptPaths,
    RunConfig, StaticPaths,
};
use coalesce_ops::{CleanupReport, ConsolidationReport, Consolidator, EmptyFolderCleaner, Outcome};

/// Environment variable holding the tracing filter directive.
const LOG_ENV: &str = "COALESCE_LOG";

#[derive(Parser)]
#[command(
    name = "coalesce",
    version,
    about = "Consolidate scattered folders into one destination",
    long_about = "coalesce copies the contents of several source folders into one \
                  destination. Identical files are copied once, different files \
                  with the same name get a _N suffix, and colliding folders are \
                  renamed instead of merged.\n\n\
                  Nothing is written until the run is confirmed; without \
                  confirmation a plan is printed instead."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Copy every source folder's contents into the destination
    Consolidate {
        /// Destination folder (asked for interactively when missing)
        #[arg(short, long)]
        dest: Option<PathBuf>,

        /// Source folder, repeatable (asked for interactively when missing)
        #[arg(short, long = "source")]
        sources: Vec<PathBuf>,

        /// Log file (defaults to consolidation_log.txt inside the destination)
        #[arg(short, long)]
        log: Option<PathBuf>,

        /// TOML file with sources, destination and log
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Only print what would happen
        #[arg(long, conflicts_with = "yes")]
        dry_run: bool,

        /// Rename colliding folders even when identical to a previous run's copy
        #[arg(long)]
        always_rename_folders: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Remove folders that contain no files, deepest first
    Cleanup {
        /// Folders to clean (the folders themselves are kept)
        roots: Vec<PathBuf>,

        /// Log file (defaults to empty_folders_cleanup_log.txt here)
        #[arg(short, long)]
        log: Option<PathBuf>,

        /// TOML file whose sources are cleaned
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Only list what would be removed
        #[arg(long, conflicts_with = "yes")]
        dry_run: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Consolidate {
            dest,
            sources,
            log,
            config,
            yes,
            dry_run,
            always_rename_folders,
            format,
        } => {
            let mut run = match config {
                Some(path) => RunConfig::load(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => {
                    let interactive = sources.is_empty() || dest.is_none();
                    let paths = if interactive {
                        ask_paths(dest, sources)?
                    } else {
                        StaticPaths::new(dest, sources)
                    };
                    run_config_from(paths)?
                }
            };
            if log.is_some() {
                run.log_path = log;
            }
            run.always_rename_folders |= always_rename_folders;

            print_run_header(&run);
            let confirmed = !dry_run
                && confirmation(yes)
                    .confirm("Proceed with consolidation?")
                    .context("Failed to read confirmation")?;
            if !confirmed {
                tracing::warn!("Not confirmed, planning only");
            }

            let report = Consolidator::new(run.with_confirmed(confirmed))
                .run()
                .context("Consolidation failed")?;
            print_consolidation(&report, format)?;
        }
        Command::Cleanup {
            roots,
            log,
            config,
            yes,
            dry_run,
            format,
        } => {
            let mut cleanup = match config {
                Some(path) => {
                    let run = RunConfig::load(&path)
                        .with_context(|| format!("Failed to load config {}", path.display()))?;
                    let mut cleanup = CleanupConfig::from_run_config(&run);
                    if !roots.is_empty() {
                        cleanup.roots = roots;
                    }
                    cleanup
                }
                None => CleanupConfig::new(roots),
            };
            if log.is_some() {
                cleanup.log_path = log;
            }
            cleanup.validate().context("Invalid cleanup config")?;

            eprintln!("Folders to clean:");
            for root in &cleanup.roots {
                eprintln!("  {}", root.display());
            }
            let confirmed = !dry_run
                && confirmation(yes)
                    .confirm("Delete all empty folders in these locations?")
                    .context("Failed to read confirmation")?;
            if !confirmed {
                tracing::warn!("Not confirmed, listing only");
            }

            let report = EmptyFolderCleaner::new(cleanup.with_confirmed(confirmed))
                .run()
                .context("Cleanup failed")?;
            print_cleanup(&report, format)?;
        }
    }

    Ok(())
}

/// Route `tracing` output to stderr, filtered by `COALESCE_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn confirmation(yes: bool) -> Box<dyn ConfirmationProvider> {
    if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(PromptConfirm::new(io::stdin().lock(), io::stderr()))
    }
}

/// Fill in whatever the command line left out by asking on the terminal.
fn ask_paths(dest: Option<PathBuf>, sources: Vec<PathBuf>) -> Result<StaticPaths> {
    let mut prompt = PromptPaths::new(io::stdin().lock(), io::stderr());
    let dest = match dest {
        Some(dest) => Some(dest),
        None => prompt.destination().context("Failed to read destination")?,
    };
    let sources = if sources.is_empty() {
        prompt.source_roots().context("Failed to read source folders")?
    } else {
        sources
    };
    Ok(StaticPaths::new(dest, sources))
}

fn run_config_from(mut paths: impl PathProvider) -> Result<RunConfig> {
    let Some(destination) = paths.destination()? else {
        bail!("No destination folder given");
    };
    let sources = paths.source_roots()?;
    if sources.is_empty() {
        bail!("No source folders given");
    }
    Ok(RunConfig::new(sources, destination))
}

fn print_run_header(config: &RunConfig) {
    eprintln!("Destination: {}", config.destination.display());
    eprintln!("Sources ({}):", config.source_roots.len());
    for source in &config.source_roots {
        eprintln!("  {}", source.display());
    }
}

fn print_consolidation(report: &ConsolidationReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(60));
            if report.dry_run {
                println!(" Plan (nothing was written)");
            } else {
                println!(" Consolidation complete");
            }
            println!("{}", "─".repeat(60));

            for outcome in [Outcome::Renamed, Outcome::SkippedDuplicate, Outcome::Error] {
                let entries: Vec<_> = report.with_outcome(outcome).collect();
                if entries.is_empty() {
                    continue;
                }
                println!();
                println!(" {} ({}):", outcome, entries.len());
                for entry in entries {
                    match (entry.resolved_path(), &entry.detail) {
                        (_, Some(detail)) => println!("   {}: {}", entry.source.display(), detail),
                        (Some(resolved), None) => println!(
                            "   {} -> {}",
                            entry.source.display(),
                            resolved.display()
                        ),
                        (None, None) => println!("   {}", entry.source.display()),
                    }
                }
            }

            println!();
            for line in report.summary_lines() {
                println!("{line}");
            }
            if let Some(path) = &report.log_path {
                println!();
                println!("Log: {}", path.display());
            }
        }
    }
    Ok(())
}

fn print_cleanup(report: &CleanupReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Text => {
            println!();
            let verb = if report.dry_run { "Would remove" } else { "Removed" };
            println!("{verb} {} empty folder(s)", report.removed.len());
            if !report.errors.is_empty() {
                println!("{} error(s):", report.errors.len());
                for error in &report.errors {
                    println!("  {error}");
                }
            }
            if let Some(path) = &report.log_path {
                println!("Log: {}", path.display());
            }
        }
    }
    Ok(())
}
