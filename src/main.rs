//! phasegraph - run and check phase graph documents
//!
//! Loads a two-tier graph document and steps it, printing one transcript
//! line per compound step.

mod config;
mod runner;

use clap::{Parser, Subcommand};
use colored::Colorize;
use phasegraph_core::PhaseGraph;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::{OutputFormat, RunnerConfig};

#[derive(Parser)]
#[command(name = "phasegraph")]
#[command(about = "Run and check two-tier guarded state graph documents")]
#[command(version)]
struct Cli {
    /// Path to a YAML runner config
    #[arg(short, long, global = true, env = "PHASEGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a document and step it
    Run {
        /// Document path (.json, .yaml or .yml)
        document: PathBuf,

        /// Maximum number of steps
        #[arg(short = 'n', long)]
        max_steps: Option<usize>,

        /// Phase to start in
        #[arg(short = 'p', long)]
        initial_phase: Option<String>,

        /// Stop at the first step that changes nothing
        #[arg(long)]
        stop_on_idle: bool,

        /// Transcript format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Load a document and report its size
    Check {
        /// Document path (.json, .yaml or .yml)
        document: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match RunnerConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    };
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            document,
            max_steps,
            initial_phase,
            stop_on_idle,
            format,
        } => {
            if let Some(n) = max_steps {
                config.max_steps = n;
            }
            if initial_phase.is_some() {
                config.initial_phase = initial_phase;
            }
            if stop_on_idle {
                config.stop_on_idle = true;
            }
            if let Some(format) = format {
                config.format = format;
            }
            if let Err(e) = config.validate() {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }

            let mut engine = load_engine(&document);
            let mut stdout = std::io::stdout().lock();
            match runner::run(&mut engine, &config, &mut stdout) {
                Ok(summary) => tracing::info!(
                    "ran {} steps ({} phase changes, {} state changes)",
                    summary.steps,
                    summary.phase_changes,
                    summary.state_changes
                ),
                Err(e) => {
                    eprintln!("{}: {}", "Step failed".red(), e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Check { document } => {
            let engine = load_engine(&document);
            println!(
                "{} {}: {}",
                "OK".green(),
                document.display(),
                runner::describe(&engine)
            );
        }
    }

    Ok(())
}

fn load_engine(path: &std::path::Path) -> PhaseGraph {
    let doc = match runner::read_document(path) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    };

    let mut engine = PhaseGraph::new();
    if let Err(e) = engine.load(&doc) {
        eprintln!(
            "{} [{}]: {}",
            "Load failed".red(),
            e.error_code(),
            e
        );
        std::process::exit(1);
    }
    engine
}
