//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ClickUp Chat Backup - export all chat conversations from a workspace.
///
/// Backs up channels, DMs, group DMs, thread replies and legacy chat
/// views to JSON and CSV files.
#[derive(Parser, Debug)]
#[command(name = "clickup-chat-backup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Back up all chat conversations from a workspace.
    Backup {
        /// ClickUp API token (or set CLICKUP_API_TOKEN env var / config file).
        #[arg(short, long)]
        token: Option<String>,

        /// Workspace ID to back up (skips interactive selection).
        #[arg(short, long)]
        workspace_id: Option<String>,

        /// Skip fetching thread replies (faster backup).
        #[arg(long)]
        no_replies: bool,

        /// Skip scanning for legacy chat views (v2 API).
        #[arg(long)]
        skip_legacy: bool,

        /// Custom output directory for backups.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// List workspaces accessible with the token.
    Workspaces {
        /// ClickUp API token (or set CLICKUP_API_TOKEN env var / config file).
        #[arg(short, long)]
        token: Option<String>,
    },
}
