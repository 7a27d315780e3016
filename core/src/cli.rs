use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::Error;
use crate::executors::SimulatedExecutor;
use crate::interpreter::{ProductPolicy, Val};
use crate::parser::parse;
use crate::pipeline::{check_source, run_source_with_cancel, RunOptions};
use crate::types::TypeEnvironment;

#[derive(Parser)]
#[command(name = "catflow")]
#[command(about = "catflow - typed workflows built from composition and product", long_about = None)]
pub struct Cli {
    /// Path to config file (layered over ./catflow.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Type check a program, then run it with the simulated executor
    Run {
        /// Program file
        file: PathBuf,

        /// Input value (JSON); defaults to ()
        #[arg(long)]
        input: Option<String>,

        /// Fail on the first runtime type violation
        #[arg(long)]
        strict: bool,

        /// Signature file used as the base type environment
        #[arg(long)]
        env: Option<PathBuf>,

        /// Let both branches of a failing product finish
        #[arg(long)]
        wait_all: bool,

        /// Skip runtime type checks
        #[arg(long)]
        untyped: bool,

        /// Per-task timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Simulated latency per task in milliseconds
        #[arg(long)]
        latency_ms: Option<u64>,
    },

    /// Type check a program without running it
    Check {
        /// Program file
        file: PathBuf,

        /// Signature file used as the base type environment
        #[arg(long)]
        env: Option<PathBuf>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the parsed program as JSON
    Ast {
        /// Program file
        file: PathBuf,
    },

    /// Print the effective configuration
    Config,
}

/// Run the CLI by parsing process arguments; returns the exit code.
pub async fn run_cli() -> i32 {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> i32 {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> i32 {
    match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            exit_code(&err)
        }
    }
}

/// Exit code for an error bubbled up to the CLI
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<Error>().map(Error::exit_code).unwrap_or(1)
}

async fn dispatch(cli: Cli) -> Result<()> {
    // .env must be in the process environment before config reads CATFLOW_*
    let _ = dotenvy::dotenv();

    let mut config = Config::load_from(cli.config.as_deref()).map_err(Error::from)?;
    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Run {
            file,
            input,
            strict,
            env,
            wait_all,
            untyped,
            timeout_ms,
            latency_ms,
        } => {
            if strict {
                config.strict = true;
            }
            if wait_all {
                config.product_policy = ProductPolicy::WaitAll;
            }
            if untyped {
                config.typed = false;
            }
            if let Some(ms) = timeout_ms {
                config.task_timeout_ms = Some(ms);
            }
            if let Some(ms) = latency_ms {
                config.simulated_latency_ms = ms;
            }
            config.validate().map_err(Error::from)?;

            run(&file, input.as_deref(), env.as_deref(), &config).await
        }

        Commands::Check { file, env, json } => {
            let source = read_source(&file)?;
            let base = load_env(env.as_deref())?;
            let (_, report) = check_source(&source, &base)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.success {
                for warning in &report.warnings {
                    eprintln!("{}", warning);
                }
                if let Some(ty) = &report.program_type {
                    println!("✓ {} :: {}", file.display(), ty);
                }
            } else {
                eprintln!("{}", report.render());
            }

            if report.success {
                Ok(())
            } else {
                Err(Error::Type(Box::new(report)).into())
            }
        }

        Commands::Ast { file } => {
            let source = read_source(&file)?;
            let program = parse(&source).map_err(Error::from)?;
            println!("{}", serde_json::to_string_pretty(&program)?);
            Ok(())
        }

        Commands::Config => {
            print!("{}", config.to_toml().map_err(Error::from)?);
            Ok(())
        }
    }
}

async fn run(file: &Path, input: Option<&str>, env: Option<&Path>, config: &Config) -> Result<()> {
    let source = read_source(file)?;
    let base = load_env(env)?;

    let input = match input {
        Some(json) => Val::from_json(serde_json::from_str(json).context("--input is not valid JSON")?),
        None => Val::Unit,
    };

    // The simulated executor needs the same signatures the checker sees.
    let program = parse(&source).map_err(Error::from)?;
    let declared: TypeEnvironment = program
        .signatures
        .values()
        .map(|sig| (sig.name.clone(), sig.ty.clone()))
        .collect();
    let executor =
        SimulatedExecutor::new(base.merged(&declared)).with_latency(config.simulated_latency());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling run");
            on_interrupt.cancel();
        }
    });

    let options = RunOptions::from(config);
    let outcome = run_source_with_cancel(&source, &base, executor, input, &options, &cancel).await?;

    for warning in &outcome.report.warnings {
        eprintln!("{}", warning);
    }
    for violation in &outcome.violations {
        eprintln!("warning: {}", violation);
    }
    println!("{}", serde_json::to_string_pretty(&outcome.value)?);
    Ok(())
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(Error::from)
        .with_context(|| format!("failed to read {}", path.display()))
}

fn load_env(path: Option<&Path>) -> Result<TypeEnvironment> {
    match path {
        Some(path) => {
            let source = read_source(path)?;
            let env = TypeEnvironment::from_source(&source)
                .map_err(Error::from)
                .with_context(|| format!("in signature file {}", path.display()))?;
            Ok(env)
        }
        None => Ok(TypeEnvironment::new()),
    }
}

fn init_logging(config: &Config, verbose: u8) {
    let level = match verbose {
        0 => config.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let filter = if verbose > 0 {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    // A second initialization (embedding, tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
