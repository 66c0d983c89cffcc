//! Interactive reasoning-session wizard.
//!
//! Loads a step catalog, lets the engine "think" through each step, and asks
//! the operator to approve, modify, or reject recommendations at intervention
//! points.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use reasoner::core::types::{Decision, DecisionAction, Resolution, SessionStatus};
use reasoner::driver::{Command as SessionCommand, DriverError, SessionDriver};
use reasoner::exit_codes;
use reasoner::io::audit_export::export_audit;
use reasoner::io::catalog::{load_catalog, sample_catalog, write_catalog};
use reasoner::io::config::{EngineConfig, load_config, write_config};
use reasoner::logging;
use reasoner::render::SnapshotRenderer;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

const HELP: &str = "commands: approve | select <id> | confirm | reject | start | reset | quit";

#[derive(Parser)]
#[command(
    name = "reasoner",
    version,
    about = "Interactive reasoning-session wizard"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a sample catalog and default config if missing.
    Init {
        /// Overwrite existing files.
        #[arg(short, long)]
        force: bool,
        #[arg(long, default_value = "catalog.json")]
        catalog: PathBuf,
        #[arg(long, default_value = "reasoner.toml")]
        config: PathBuf,
    },
    /// Check a catalog against the schema and catalog invariants.
    Validate {
        #[arg(long, default_value = "catalog.json")]
        catalog: PathBuf,
    },
    /// Run a session over a catalog, reading decisions from stdin.
    Run {
        #[arg(long, default_value = "catalog.json")]
        catalog: PathBuf,
        #[arg(long, default_value = "reasoner.toml")]
        config: PathBuf,
        /// Export the audit log here when the session ends (overrides config).
        #[arg(long)]
        audit_out: Option<PathBuf>,
    },
}

/// One line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Session(SessionCommand),
    Quit,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init {
            force,
            catalog,
            config,
        } => cmd_init(&catalog, &config, force),
        Command::Validate { catalog } => cmd_validate(&catalog),
        Command::Run {
            catalog,
            config,
            audit_out,
        } => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("build tokio runtime")?;
            runtime.block_on(cmd_run(&catalog, &config, audit_out))
        }
    }
}

fn cmd_init(catalog_path: &Path, config_path: &Path, force: bool) -> Result<i32> {
    if force || !catalog_path.exists() {
        write_catalog(catalog_path, &sample_catalog())?;
        println!("wrote {}", catalog_path.display());
    }
    if force || !config_path.exists() {
        write_config(config_path, &EngineConfig::default())?;
        println!("wrote {}", config_path.display());
    }
    Ok(exit_codes::OK)
}

fn cmd_validate(catalog_path: &Path) -> Result<i32> {
    let catalog = load_catalog(catalog_path)?;
    let checkpoints = catalog
        .steps
        .iter()
        .filter(|step| step.is_intervention_point)
        .count();
    println!(
        "ok: {} steps, {} intervention points",
        catalog.steps.len(),
        checkpoints
    );
    Ok(exit_codes::OK)
}

async fn cmd_run(
    catalog_path: &Path,
    config_path: &Path,
    audit_out: Option<PathBuf>,
) -> Result<i32> {
    let cfg = load_config(config_path)?;
    let catalog = load_catalog(catalog_path)?;
    let session_id = format!("session-{}", Utc::now().format("%Y%m%dT%H%M%S"));
    let session = catalog
        .into_session(session_id)
        .context("create session")?;
    let renderer = SnapshotRenderer::new()?;

    let handle = SessionDriver::new(session, cfg.pacing())
        .on_intervention(announce)
        .spawn();
    let mut snapshots = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("{}", renderer.render(&handle.snapshot())?);
    println!("{HELP}");
    handle.start().await?;

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let session = snapshots.borrow_and_update().clone();
                println!("{}", renderer.render(&session)?);
                match session.status() {
                    SessionStatus::Complete => break,
                    SessionStatus::Paused => println!("{HELP}"),
                    SessionStatus::Idle | SessionStatus::Running => {}
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("read stdin")? else {
                    break;
                };
                let current_step = handle.snapshot().current_step().id().to_string();
                match parse_input(&line, &current_step) {
                    Ok(Input::Quit) => break,
                    Ok(Input::Session(command)) => match handle.send(command).await {
                        Ok(()) => {}
                        Err(DriverError::Engine(err)) => eprintln!("{err}"),
                        Err(err) => return Err(err.into()),
                    },
                    Err(msg) => eprintln!("{msg}\n{HELP}"),
                }
            }
        }
    }

    let session = handle.shutdown().await?;
    if let Some(path) = audit_out.or(cfg.audit.export_path) {
        export_audit(&path, &session)?;
        println!("audit log written to {}", path.display());
    }
    info!(
        session_id = session.id(),
        status = session.status().as_str(),
        "wizard finished"
    );
    Ok(match session.status() {
        SessionStatus::Complete => exit_codes::OK,
        _ => exit_codes::INCOMPLETE,
    })
}

/// Host side effect for resolved decisions.
fn announce(resolution: &Resolution) {
    match (resolution.action, resolution.value.as_deref()) {
        (DecisionAction::Reject, _) => println!(
            "step '{}' rejected; choose again or `reset` to restart",
            resolution.step_id
        ),
        (action, value) => println!(
            "step '{}' {}: {}",
            resolution.step_id,
            action.as_str(),
            value.unwrap_or("-")
        ),
    }
}

/// Parse operator input. Decisions are pinned to `current_step` so a repeated
/// line cannot resolve the following step.
fn parse_input(line: &str, current_step: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default();
    let arg = words.next();
    if words.next().is_some() {
        return Err(format!("too many arguments: {}", line.trim()));
    }
    let input = match (verb, arg) {
        ("approve" | "a", None) => {
            Input::Session(SessionCommand::Decide(Decision::approve().for_step(current_step)))
        }
        ("select" | "s", Some(id)) => Input::Session(SessionCommand::Stage(id.to_string())),
        ("confirm" | "c", None) => {
            Input::Session(SessionCommand::Decide(Decision::modify().for_step(current_step)))
        }
        ("reject" | "r", None) => {
            Input::Session(SessionCommand::Decide(Decision::reject().for_step(current_step)))
        }
        ("start", None) => Input::Session(SessionCommand::Start),
        ("reset", None) => Input::Session(SessionCommand::Reset),
        ("quit" | "q", None) => Input::Quit,
        ("", None) => return Err("empty command".to_string()),
        _ => return Err(format!("unknown command: {}", line.trim())),
    };
    Ok(input)
}
