// ─────────────────────────────────────────────────────────────────────
// SCPN Finite Volume — Command-Line Runner
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! `fvm run --config model.json` steps an ElPhF model and prints the
//! species ranges; `fvm validate --config model.json` only checks the file.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use fvm_models::elphf::{ElphfModel, FieldSummary};
use fvm_types::config::ModelConfig;
use fvm_types::error::FvmError;
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "fvm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Finite-volume multi-species diffusion runner", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", value_parser = parse_level)]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the configured number of time steps
    Run(RunArgs),
    /// Load and validate a configuration without running it
    Validate(ValidateArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Model configuration (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Override the configured step count
    #[arg(short, long)]
    steps: Option<usize>,

    /// Keep going when a step exhausts its sweep budget
    #[arg(long)]
    accept_unconverged: bool,
}

#[derive(Args)]
struct ValidateArgs {
    /// Model configuration (JSON)
    #[arg(short, long)]
    config: PathBuf,
}

fn parse_level(level: &str) -> std::result::Result<LevelFilter, String> {
    LevelFilter::from_str(level).map_err(|_| {
        format!("unknown log level '{level}' (expected off, error, warn, info, debug, trace)")
    })
}

fn load_config(path: &Path) -> Result<ModelConfig> {
    ModelConfig::from_file(&path.to_string_lossy())
        .with_context(|| format!("failed to load configuration {}", path.display()))
}

fn print_summaries(summaries: &[FieldSummary]) {
    println!("{:<16} {:>14} {:>14} {:>14}", "field", "min", "mean", "max");
    for s in summaries {
        println!(
            "{:<16} {:>14.8} {:>14.8} {:>14.8}",
            s.name, s.min, s.mean, s.max
        );
    }
}

fn run(args: RunArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let steps = args.steps.unwrap_or(config.steps);
    let mut model = ElphfModel::from_config(&config)
        .with_context(|| format!("failed to build model '{}'", config.model_name))?;
    log::info!("running '{}' for {steps} steps", config.model_name);

    for step in 1..=steps {
        match model.step() {
            Ok(sweeps) => log::debug!("step {step}: {sweeps} sweeps"),
            Err(FvmError::NonConvergence { residuals, .. }) if args.accept_unconverged => {
                log::warn!("step {step}: accepting unconverged residuals {residuals:?}");
                model.accept_step().context("failed to accept step")?;
            }
            Err(e) => {
                let state = model.iterator().state();
                if let (Some(name), Some(sweep)) = (&state.failed_equation, state.failed_sweep) {
                    log::error!("step {step}: equation '{name}' failed in sweep {sweep}");
                }
                if e.is_recoverable() {
                    model.rollback().context("failed to roll back step")?;
                }
                return Err(e).with_context(|| format!("step {step} failed"));
            }
        }
    }

    let state = model.iterator().state();
    println!(
        "{}: {} steps, t = {:.6e}",
        config.model_name, state.step, state.time
    );
    print_summaries(&model.summaries().context("failed to summarise fields")?);
    Ok(())
}

fn validate(args: ValidateArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    if config.substitutionals.iter().any(|s| s.initial.is_none()) {
        log::warn!("species without an initial profile start at zero");
    }
    let model = ElphfModel::from_config(&config)
        .with_context(|| format!("model '{}' cannot be assembled", config.model_name))?;
    let n_eq = model.iterator().equations().count();
    if n_eq != config.substitutionals.len() {
        bail!(
            "expected {} equations, assembled {n_eq}",
            config.substitutionals.len()
        );
    }
    println!(
        "{}: OK ({} cells, {n_eq} equations, dt = {:.3e})",
        config.model_name,
        model.store().mesh().n_cells(),
        config.time_step_duration
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level)
        .format_target(false)
        .init();

    match cli.command {
        Command::Run(args) => run(args),
        Command::Validate(args) => validate(args),
    }
}
