//! texslim CLI - shrink oversized textures inside game asset containers

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use walkdir::WalkDir;

use texslim::config::validate_max_edge;
use texslim::parallel::ProgressUpdate;
use texslim::processing::{ContainerRegistry, FileInventory};
use texslim::{
    init_logging, BatchRunner, BatchSummary, CancellationFlag, Config, FileResult, FileStatus,
    ProcessingEngine,
};

/// texslim - Texture budget enforcement for game asset containers
#[derive(Parser)]
#[command(
    name = "texslim",
    version,
    about = "Shrink oversized textures inside game asset containers",
    long_about = "texslim finds block-compressed textures whose longest edge exceeds a limit, \
                  resizes them with texconv and rebuilds the containers into an output directory. \
                  Files that need no work are copied through unchanged.",
    arg_required_else_help = false
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input file or directory
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Longest permitted texture edge in pixels
    #[arg(short, long, value_name = "PIXELS", conflicts_with = "profile")]
    max_size: Option<u32>,

    /// Size profile name (see `texslim profiles`)
    #[arg(short, long, value_name = "NAME")]
    profile: Option<String>,

    /// Path to the texconv executable
    #[arg(long, value_name = "FILE", env = "TEXSLIM_TEXCONV")]
    texconv: Option<PathBuf>,

    /// Files processed concurrently (default: auto-detect)
    #[arg(short, long, value_name = "COUNT")]
    threads: Option<usize>,

    /// Converter processes per file
    #[arg(long, value_name = "COUNT")]
    bitmap_workers: Option<usize>,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Process directories recursively
    #[arg(short = 'R', long)]
    recursive: bool,

    /// Show what would be processed without actually processing
    #[arg(long)]
    dry_run: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'Q', long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// List textures in container files without changing anything
    Scan {
        /// Container file or directory
        path: PathBuf,
        /// Longest permitted texture edge in pixels
        #[arg(short, long, value_name = "PIXELS")]
        max_size: Option<u32>,
        /// Scan directories recursively
        #[arg(short = 'R', long)]
        recursive: bool,
        /// Print the inventory as JSON
        #[arg(long)]
        json: bool,
    },
    /// List available size profiles
    Profiles {
        /// Show detailed profile information
        #[arg(long)]
        detailed: bool,
    },
    /// Validate configuration file
    Config {
        /// Configuration file to validate
        file: PathBuf,
    },
    /// Generate example configuration file
    ExampleConfig {
        /// Output file path
        #[arg(short, long, default_value = "texslim.toml")]
        output: PathBuf,
        /// Use YAML format instead of TOML
        #[arg(long)]
        yaml: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::from_file(path) {
            // File settings win; built-in profiles stay available
            Ok(config) => Config::default().merge(config),
            Err(e) => {
                eprintln!("{}: Failed to load configuration: {}", style("Error").red().bold(), e);
                process::exit(1);
            }
        },
        None => Config::default(),
    };

    let log_level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    init_logging(log_level, config.logging.json_format);
    if let Some(path) = &cli.config {
        info!("Loaded configuration from: {:?}", path);
    }

    let outcome = match cli.command {
        Some(ref command) => handle_subcommand(command, &cli, config).await,
        None => run_optimize(&cli, config).await,
    };

    if let Err(e) = outcome {
        eprintln!("{}: {:#}", style("Error").red().bold(), e);
        process::exit(1);
    }
}

/// Handle subcommands
async fn handle_subcommand(command: &Commands, cli: &Cli, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Scan { path, max_size, recursive, json } => {
            let max_edge = max_size.unwrap_or(config.optimize.max_edge);
            validate_max_edge(max_edge)?;
            let recursive = *recursive || config.processing.recursive;
            scan(path, max_edge, recursive, *json || cli.json, &config).await
        }
        Commands::Profiles { detailed } => {
            show_profiles(&config, *detailed);
            Ok(())
        }
        Commands::Config { file } => validate_config_file(file),
        Commands::ExampleConfig { output, yaml } => generate_example_config(output, *yaml),
    }
}

/// Resolve the edge limit from flags, profile and configuration
fn resolve_max_edge(cli: &Cli, config: &Config) -> anyhow::Result<u32> {
    let max_edge = match (cli.max_size, &cli.profile) {
        (Some(max_size), _) => max_size,
        (None, Some(name)) => config.get_profile(name)?.max_edge,
        (None, None) => config.optimize.max_edge,
    };
    validate_max_edge(max_edge)?;
    Ok(max_edge)
}

/// Run the optimization batch
async fn run_optimize(cli: &Cli, mut config: Config) -> anyhow::Result<()> {
    let (input_path, output_path) = match (&cli.input, &cli.output) {
        (Some(input), Some(output)) => (input.clone(), output.clone()),
        _ => bail!("Input and output paths are required\nRun with --help for usage information"),
    };

    let max_edge = resolve_max_edge(cli, &config)?;
    if let Some(texconv) = &cli.texconv {
        config.converter.path = Some(texconv.clone());
    }
    if let Some(threads) = cli.threads {
        config.processing.workers = threads;
    }
    if let Some(bitmap_workers) = cli.bitmap_workers {
        config.processing.bitmap_workers = bitmap_workers;
    }
    config.processing.recursive |= cli.recursive;
    config.validate()?;

    let engine = ProcessingEngine::from_config(&config);
    let files = discover_files(&input_path, config.processing.recursive, engine.registry())?;
    if files.is_empty() {
        bail!("No container files found in {}", input_path.display());
    }

    info!("Input: {:?}", input_path);
    info!("Output: {:?}", output_path);
    info!("Found {} files, max edge {}px", files.len(), max_edge);

    if cli.dry_run {
        println!("{} files would be processed:", style(files.len()).bold());
        for file in &files {
            println!("  {}", file.display());
        }
        return Ok(());
    }

    let cancellation = CancellationFlag::new();
    let runner = BatchRunner::new(engine, Some(config.processing.workers))
        .with_cancellation(cancellation.clone());
    spawn_ctrl_c_handler(cancellation);

    let progress = if !cli.json && !cli.quiet {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("#>-"),
        );
        spawn_progress_listener(&runner, pb.clone());
        Some(pb)
    } else {
        None
    };

    let mut results = Vec::with_capacity(files.len());
    let summary = runner
        .run_batch(files, max_edge, &output_path, |result| {
            match &progress {
                // A hidden bar drops println output, so status lines bypass it
                Some(pb) if !pb.is_hidden() => {
                    pb.suspend(|| println!("{}", status_line(result)));
                    pb.inc(1);
                }
                Some(pb) => {
                    println!("{}", status_line(result));
                    pb.inc(1);
                }
                None => {}
            }
            results.push(result.clone());
        })
        .await;

    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    if cli.json {
        print_json(&summary, &results)?;
    } else if !cli.quiet {
        print_summary(&summary, max_edge);
    }
    Ok(())
}

/// Keep the bar message on the current throughput and ETA
fn spawn_progress_listener(runner: &BatchRunner, pb: ProgressBar) {
    let tracker = runner.progress();
    let mut updates = tracker.subscribe();
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(ProgressUpdate::FileCompleted { .. }) => {
                    let state = tracker.get_state();
                    pb.set_message(format!("({}, ETA {})", state.speed_text(), state.eta_text()));
                }
                Ok(ProgressUpdate::BatchCompleted { .. }) | Err(RecvError::Closed) => break,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
            }
        }
    });
}

fn spawn_ctrl_c_handler(cancellation: CancellationFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "{}: finishing files in progress, no new files will start",
                style("Cancelling").yellow().bold()
            );
            cancellation.cancel();
        }
    });
}

/// Discover container files.
///
/// A single file is always taken as given; directories are filtered to the
/// extensions the registry handles.
fn discover_files(
    input_path: &Path,
    recursive: bool,
    registry: &ContainerRegistry,
) -> anyhow::Result<Vec<PathBuf>> {
    if input_path.is_file() {
        return Ok(vec![input_path.to_path_buf()]);
    }
    if !input_path.is_dir() {
        bail!("Input path does not exist: {}", input_path.display());
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();
    for entry in WalkDir::new(input_path).max_depth(max_depth) {
        let entry = entry.with_context(|| format!("Failed to read {}", input_path.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let supported = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| registry.supports_extension(e));
        if supported {
            files.push(entry.into_path());
        }
    }

    // Output is flat, so same-named files overwrite each other
    let mut seen: HashMap<std::ffi::OsString, &Path> = HashMap::new();
    for file in &files {
        if let Some(name) = file.file_name() {
            if let Some(previous) = seen.insert(name.to_os_string(), file) {
                warn!("{:?} and {:?} share a file name; the later result wins", previous, file);
            }
        }
    }

    // Sort files for consistent processing order
    files.sort();
    Ok(files)
}

/// One terminal line per file
fn status_line(result: &FileResult) -> String {
    let reason = result.reason.as_deref().unwrap_or_default();
    match result.status {
        FileStatus::Optimized => format!(
            "{} {} ({} textures, {:.0} KB -> {:.0} KB, -{:.1}%)",
            style("[OK]").green().bold(),
            result.file_name(),
            result.bitmaps_changed,
            result.original_size as f64 / 1024.0,
            result.optimized_size as f64 / 1024.0,
            result.size_reduction()
        ),
        FileStatus::Skipped => format!(
            "{} {} ({})",
            style("[SKIP]").yellow().bold(),
            result.file_name(),
            reason
        ),
        FileStatus::Error => format!(
            "{} {}: {}",
            style("[ERR]").red().bold(),
            result.file_name(),
            reason
        ),
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    version: &'static str,
    summary: &'a BatchSummary,
    reduction_percent: f64,
    files: &'a [FileResult],
}

fn print_json(summary: &BatchSummary, results: &[FileResult]) -> anyhow::Result<()> {
    let report = JsonReport {
        version: texslim::VERSION,
        summary,
        reduction_percent: summary.reduction_percent(),
        files: results,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Print processing summary
fn print_summary(summary: &BatchSummary, max_edge: u32) {
    println!();
    println!("{} (max edge {}px)", style("Processing Summary:").bold(), max_edge);
    println!("  {}: {}", style("Optimized").green(), summary.optimized);
    println!("  {}: {}", style("Skipped").yellow(), summary.skipped);
    if summary.errors > 0 {
        println!("  {}: {}", style("Errors").red(), summary.errors);
    }
    if summary.cancelled > 0 {
        println!("  {}: {}", style("Not started").red(), summary.cancelled);
    }
    println!("  {}: {}", style("Textures resized").cyan(), summary.bitmaps_changed);
    println!(
        "  {}: {:.2}MB → {:.2}MB ({:.1}% reduction)",
        style("Size").cyan(),
        summary.original_mb(),
        summary.optimized_mb(),
        summary.reduction_percent()
    );
    println!("  {}: {:.2}s", style("Duration").blue(), summary.processing_time.as_secs_f64());
}

/// Inventory container files without writing anything
async fn scan(path: &Path, max_edge: u32, recursive: bool, json: bool, config: &Config) -> anyhow::Result<()> {
    let engine = ProcessingEngine::from_config(config);
    let files = discover_files(path, recursive, engine.registry())?;

    let mut inventories: Vec<FileInventory> = Vec::new();
    for file in &files {
        match engine.analyze_file(file, max_edge).await {
            Ok(inventory) => inventories.push(inventory),
            Err(e) => {
                if json {
                    warn!("Could not scan {:?}: {}", file, e);
                } else {
                    println!("{} {}: {}", style("[ERR]").red().bold(), file.display(), e.user_message());
                }
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&inventories)?);
        return Ok(());
    }

    for inventory in &inventories {
        let marker = if inventory.needs_optimization() {
            style("[RESIZE]").yellow().bold()
        } else {
            style("[OK]").green().bold()
        };
        println!(
            "{} {} ({}, {:.0} KB)",
            marker,
            inventory.input_path.display(),
            inventory.kind,
            inventory.size_bytes as f64 / 1024.0
        );
        for report in &inventory.bitmaps {
            let d = &report.descriptor;
            let target = if report.needs_optimization {
                format!(
                    " -> {}x{} {} ({} mips)",
                    report.plan.target_width,
                    report.plan.target_height,
                    report.plan.target_format,
                    report.plan.target_mip_count
                )
            } else {
                String::new()
            };
            println!(
                "    {:<32} {:>11} {:>6} {:>2} mips{}",
                if d.name.is_empty() { "<unnamed>" } else { d.name.as_str() },
                d.dimensions(),
                d.compression_tag.to_string(),
                d.mip_levels,
                style(target).dim()
            );
        }
    }

    let needing = inventories.iter().filter(|i| i.needs_optimization()).count();
    println!();
    println!(
        "{} of {} files exceed {}px",
        style(needing).bold(),
        inventories.len(),
        max_edge
    );
    Ok(())
}

/// Show available profiles
fn show_profiles(config: &Config, detailed: bool) {
    println!("{}", style("Available Size Profiles:").bold());
    println!();

    let mut profiles: Vec<_> = config.profiles.iter().collect();
    profiles.sort_by(|a, b| (a.1.max_edge, a.0).cmp(&(b.1.max_edge, b.0)));

    for (name, profile) in profiles {
        println!("{} {}px", style(name).cyan().bold(), profile.max_edge);
        if detailed && !profile.description.is_empty() {
            println!("  {}", profile.description);
            println!();
        }
    }

    if !detailed {
        println!();
        println!("Use {} for detailed information", style("--detailed").dim());
    }
}

/// Validate configuration file
fn validate_config_file(file_path: &Path) -> anyhow::Result<()> {
    let config = Config::from_file(file_path)?;
    config.validate()?;

    println!("{}: Configuration file is valid", style("Success").green().bold());
    println!("Max edge: {}px", config.optimize.max_edge);
    println!("Profiles: {}", config.profiles.len());
    println!(
        "Converter: {}",
        config
            .converter
            .path
            .as_ref()
            .map_or_else(|| "auto-detect".to_string(), |p| p.display().to_string())
    );

    Ok(())
}

/// Generate example configuration file
fn generate_example_config(output_path: &Path, use_yaml: bool) -> anyhow::Result<()> {
    let extension = output_path.extension().and_then(|e| e.to_str());
    let use_yaml = use_yaml || matches!(extension, Some("yaml" | "yml"));
    let output_path = match (use_yaml, extension) {
        (true, Some("yaml" | "yml")) | (false, Some("toml")) => output_path.to_path_buf(),
        (true, _) => output_path.with_extension("yaml"),
        (false, _) => output_path.with_extension("toml"),
    };

    Config::default().to_file(&output_path)?;

    let format = if use_yaml { "YAML" } else { "TOML" };
    println!(
        "{}: Generated example {} configuration: {}",
        style("Success").green().bold(),
        format,
        output_path.display()
    );

    Ok(())
}
