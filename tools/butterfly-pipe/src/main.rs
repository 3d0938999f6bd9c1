//! # Butterfly-pipe CLI
//!
//! Runs an OpenStreetMap processing pipeline described by a chain of switches.

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use butterfly_pipe::{help, Capability, ExecuteOptions, Pipeline, SwitchRegistry};

mod cli;

/// Output format for `--switches`
#[derive(Clone, Copy, Debug, ValueEnum)]
enum HelpFormat {
    Text,
    Json,
}

/// Command-line interface for butterfly-pipe
#[derive(Parser)]
#[command(name = "butterfly-pipe")]
#[command(about = "Build OpenStreetMap processing pipelines from a chain of switches")]
#[command(long_about = "Each switch reads, transforms or writes data; switches are applied left to right:
  butterfly-pipe --read-pbf belgium.osm.pbf --write-pbf copy.osm.pbf
  butterfly-pipe --rb belgium.osm.pbf --bb left=4.3 right=4.5 top=50.9 bottom=50.8 --wb brussels.osm.pbf
  butterfly-pipe --read-pbf belgium.osm.pbf --create-routerdb vehicles=car,bicycle --write-routerdb belgium.routerdb

Switches take key=value arguments; some accept a bare value (e.g. the file name).
  --switches                       # List every switch and its parameters")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Check the pipeline and print its plan without running it
    #[arg(long)]
    dry_run: bool,

    /// List the available switches and exit
    #[arg(long)]
    switches: bool,

    /// Format of the --switches listing
    #[arg(long, value_enum, default_value_t = HelpFormat::Text)]
    format: HelpFormat,

    /// Pipeline switches and their arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pipeline: Vec<String>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("❌ Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr; RUST_LOG overrides the level
    let level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let registry = SwitchRegistry::builtin();

    if cli.switches {
        let catalog = help::catalog(registry);
        match cli.format {
            HelpFormat::Text => print!("{}", help::render_text(&catalog)),
            HelpFormat::Json => println!(
                "{}",
                help::render_json(&catalog).context("Failed to serialize switch list")?
            ),
        }
        return Ok(());
    }

    if cli.pipeline.is_empty() {
        bail!("no pipeline given; run with --switches to list the available switches");
    }

    if cli.verbose {
        eprintln!("🦋 Butterfly-pipe v{} starting...", env!("CARGO_PKG_VERSION"));
    }

    let pipeline = Pipeline::build(cli.pipeline, registry)?;

    if cli.dry_run {
        eprintln!("🔍 [DRY RUN] Pipeline checked, nothing will be written:");
        for line in pipeline.plan() {
            println!("{line}");
        }
        let has_sink = pipeline
            .stages()
            .iter()
            .any(|stage| stage.processor.has(Capability::Sink));
        if !has_sink {
            eprintln!("⚠️  The pipeline has no output switch and would fail when run");
        }
        return Ok(());
    }

    let progress = cli::ProgressManager::new("🦋 Running pipeline");
    let options = ExecuteOptions {
        progress: Some(progress.callback()),
    };
    let reports = pipeline.execute(&options)?;
    progress.finish("done");

    for report in reports {
        eprintln!("✅ {} items written to {}", report.items, report.path.display());
    }
    Ok(())
}
