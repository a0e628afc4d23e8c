//! ClickUp Chat Backup - export all chat conversations from a workspace.
//!
//! Backs up channels, DMs, group DMs, thread replies and legacy
//! comment-based chat views from the ClickUp API, writing JSON and CSV
//! files per conversation category plus a run summary.
//!
//! QUICK START:
//!   clickup-chat-backup workspaces              # See accessible workspaces
//!   clickup-chat-backup backup                  # Interactive full backup
//!   clickup-chat-backup backup -w <id>          # Back up a known workspace
//!   clickup-chat-backup backup --no-replies     # Faster, skip threads

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{list_workspaces, select_workspace, BackupOptions, BackupService};
use cli::{Cli, Commands};
use infrastructure::{load_config, resolve_token, ApiClient, BackupConfig};

fn main() {
    // Pick up CLICKUP_API_TOKEN from a local .env file if present.
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
fn run(cli: Cli) -> domain::Result<()> {
    match cli.command {
        Commands::Backup {
            token,
            workspace_id,
            no_replies,
            skip_legacy,
            output_dir,
        } => cmd_backup(
            token.as_deref(),
            workspace_id.as_deref(),
            no_replies,
            skip_legacy,
            output_dir,
        ),
        Commands::Workspaces { token } => cmd_workspaces(token.as_deref()),
    }
}

/// Full backup command.
fn cmd_backup(
    token: Option<&str>,
    workspace_id: Option<&str>,
    no_replies: bool,
    skip_legacy: bool,
    output_dir: Option<PathBuf>,
) -> domain::Result<()> {
    println!("{}", "=".repeat(60));
    println!("  {}", "ClickUp Chat Backup Tool".bold());
    println!("  Backs up: Channels + DMs + Group DMs + Threads");
    println!("{}", "=".repeat(60));

    let config = load_config()?;
    let token = obtain_token(token, &config)?;
    let client = ApiClient::new(token)?;

    let workspace = select_workspace(&client, workspace_id)?;

    let output_dir = output_dir
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("backups"));

    let options = BackupOptions {
        skip_legacy,
        fetch_replies: !no_replies,
        output_dir,
    };

    BackupService::new(&client, options).run(&workspace)?;

    Ok(())
}

/// Workspace listing command.
fn cmd_workspaces(token: Option<&str>) -> domain::Result<()> {
    let config = load_config()?;
    let token = obtain_token(token, &config)?;
    let client = ApiClient::new(token)?;

    let workspaces = list_workspaces(&client)?;
    if workspaces.is_empty() {
        return Err(domain::AppError::config(
            "No workspaces found. Check your API token.",
        ));
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["ID", "Name"]);
    for workspace in &workspaces {
        table.add_row(vec![&workspace.id, &workspace.name]);
    }

    println!("{table}");
    println!();
    println!("Total: {} workspace(s)", workspaces.len());

    Ok(())
}

/// Resolves the token from flag, environment or config file, prompting
/// interactively as a last resort.
fn obtain_token(flag: Option<&str>, config: &BackupConfig) -> domain::Result<String> {
    if let Some(token) = resolve_token(flag, config) {
        return Ok(token);
    }

    print!("\nEnter your ClickUp API token: ");
    io::stdout()
        .flush()
        .map_err(|e| domain::AppError::io("Failed to flush stdout", e))?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .map_err(|e| domain::AppError::io("Failed to read token", e))?;

    let token = line.trim().to_string();
    if token.is_empty() {
        return Err(domain::AppError::config(
            "API token is required. Set it via: --token, CLICKUP_API_TOKEN env var, \
             or the config file",
        ));
    }

    Ok(token)
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
