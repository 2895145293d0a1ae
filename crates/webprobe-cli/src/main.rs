//! webprobe CLI - contract, fuzz and SQL-injection probing for HTTP endpoints

mod storage;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use webprobe_core::{
    Config, DynamicOptions, HttpMethod, Severity, Summary, TestResultFilter, Workspace,
    generate_schema, render_report,
};
use webprobe_runner::Engine;

#[derive(Parser)]
#[command(name = "webprobe")]
#[command(about = "Contract, fuzz and SQL-injection probing for HTTP endpoints")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "terminal")]
    output: OutputFormat,

    /// Config file (default: .webprobe.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an example workspace and config
    Init {
        /// Workspace file to create
        #[arg(default_value = "webprobe.toml")]
        path: PathBuf,
    },

    /// Check every enabled endpoint definition
    Validate {
        /// Workspace file (.toml, .json, .yaml)
        #[arg(short, long)]
        workspace: PathBuf,
    },

    /// Probe every enabled endpoint
    Run {
        /// Workspace file (.toml, .json, .yaml)
        #[arg(short, long)]
        workspace: PathBuf,

        /// Chain cookies from one probe into the next
        #[arg(long)]
        dynamic: bool,

        /// Only show results whose URL contains this text
        #[arg(long)]
        url: Option<String>,

        /// Only show results for this method
        #[arg(long)]
        method: Option<HttpMethod>,

        /// Hide results below this severity
        #[arg(long)]
        min_severity: Option<Severity>,

        /// Save the workspace with this run's results
        #[arg(long)]
        save: Option<PathBuf>,

        /// Write the text report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show the report stored in a saved workspace
    Report {
        /// Workspace file (.toml, .json, .yaml)
        #[arg(short, long)]
        workspace: PathBuf,
    },

    /// Export JSON Schema for workspace files
    Schema,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputFormat {
    Terminal,
    Json,
    Silent,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: {e:#}");
    }

    match run(cli) {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(3)),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(3)
        }
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("failed to initialize logging")
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path),
        None => Config::load_default(),
    };
    let config = config.context("failed to load config")?;
    tracing::debug!("config: {config:?}");
    Ok(config)
}

fn load_workspace(path: &Path) -> Result<Workspace> {
    Workspace::load(path).with_context(|| format!("failed to load workspace {}", path.display()))
}

/// Print definition errors; true when the workspace is valid.
fn check_workspace(workspace: &Workspace) -> bool {
    let errors = workspace.validate();
    for (idx, err) in &errors {
        eprintln!("  [{idx}] {}: {err}", workspace.endpoints[*idx].label());
    }
    errors.is_empty()
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Init { path } => {
            if path.exists() {
                eprintln!("{} already exists", path.display());
                return Ok(1);
            }
            std::fs::write(&path, Workspace::example())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Created {}", path.display());

            let config_path = Path::new(".webprobe.toml");
            if !config_path.exists() {
                std::fs::write(config_path, Config::example())?;
                println!("Created {}", config_path.display());
            }

            println!("\nEdit the workspace to configure:");
            println!("  - url / request / response: the contract to check");
            println!("  - fuzz_test / sql_injection_test: mutation probes and counts");
            println!("  - dynamic_options: cookie chaining between probes");
            Ok(0)
        }

        Commands::Validate { workspace: path } => {
            let workspace = load_workspace(&path)?;
            let enabled = workspace.enabled_endpoints().count();
            if check_workspace(&workspace) {
                if cli.output != OutputFormat::Silent {
                    println!("OK: {enabled} enabled endpoints");
                }
                Ok(0)
            } else {
                eprintln!("Invalid workspace: {}", path.display());
                Ok(1)
            }
        }

        Commands::Run {
            workspace: path,
            dynamic,
            url,
            method,
            min_severity,
            save,
            report,
        } => {
            let cfg = load_config(cli.config.as_deref())?;
            let mut workspace = load_workspace(&path)?;
            if !check_workspace(&workspace) {
                eprintln!("Invalid workspace: {}", path.display());
                return Ok(3);
            }
            if dynamic && workspace.dynamic_options.is_none() {
                workspace.dynamic_options = Some(DynamicOptions::default());
            }

            let engine = Engine::from_config(&cfg)?;
            let filter = TestResultFilter {
                url_contains: url,
                method,
                min_severity,
            };
            engine.set_result_filter((filter != TestResultFilter::default()).then_some(filter));

            if cli.output != OutputFormat::Silent {
                eprintln!("Workspace: {}", path.display());
                eprintln!(
                    "  endpoints: {} enabled",
                    workspace.enabled_endpoints().count()
                );
                eprintln!(
                    "  mode:      {}",
                    if workspace.dynamic_options.is_some() {
                        "dynamic"
                    } else {
                        "independent"
                    }
                );
                eprintln!("  workers:   {}", cfg.workers);
                eprintln!();
            }

            let start = Instant::now();
            engine.start_testing(&workspace)?;
            while engine.in_progress() {
                if cli.output == OutputFormat::Terminal {
                    eprint!("\rProgress: {:>3.0}%", engine.progress() * 100.0);
                }
                std::thread::sleep(Duration::from_millis(200));
            }
            let wall = start.elapsed();
            if cli.output == OutputFormat::Terminal {
                eprintln!("\rProgress: 100%");
            }

            let results = engine.results();
            let shown = engine.test_results();
            let code = storage::exit_code(&results);

            match cli.output {
                OutputFormat::Terminal => {
                    println!("{}", render_report(&shown));
                    if shown.len() != results.len() {
                        println!("  ({} of {} results shown)", shown.len(), results.len());
                    }
                    let worst = Summary::of(&results).worst();
                    println!(
                        "Worst severity: {}",
                        worst.map_or("none", Severity::as_str)
                    );
                    println!("Exit code: {code}");
                }
                OutputFormat::Json => {
                    let json = storage::summary_json(&results, &shown, wall);
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
                OutputFormat::Silent => {}
            }

            if let Some(out) = save {
                storage::save_workspace(&workspace, &results, &out)
                    .with_context(|| format!("failed to save {}", out.display()))?;
                if cli.output != OutputFormat::Silent {
                    eprintln!("Workspace saved: {}", out.display());
                }
            }
            if let Some(out) = report {
                storage::write_report(&shown, &out)
                    .with_context(|| format!("failed to write {}", out.display()))?;
                if cli.output != OutputFormat::Silent {
                    eprintln!("Report saved: {}", out.display());
                }
            }

            Ok(code)
        }

        Commands::Report { workspace: path } => {
            let workspace = load_workspace(&path)?;
            if workspace.results.is_empty() {
                eprintln!("{} has no stored results", path.display());
            }
            match cli.output {
                OutputFormat::Terminal => print!("{}", render_report(&workspace.results)),
                OutputFormat::Json => {
                    let json =
                        storage::summary_json(&workspace.results, &workspace.results, Duration::ZERO);
                    println!("{}", serde_json::to_string_pretty(&json)?);
                }
                OutputFormat::Silent => {}
            }
            Ok(storage::exit_code(&workspace.results))
        }

        Commands::Schema => {
            println!("{}", generate_schema());
            Ok(0)
        }
    }
}
