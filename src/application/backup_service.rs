//! Full backup run orchestration.
//!
//! Drives a run in the fixed order: member directory, legacy chat views,
//! channel enumeration, per-channel messages and thread replies, then the
//! partitioned output files and the run summary.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use colored::Colorize;

use crate::domain::{
    scalar_string, AppError, BackupStats, BackupSummary, ChannelExport, ChannelKind,
    ChatViewExport, MemberDirectory, MessageThread, Result, Workspace,
};
use crate::infrastructure::ApiClient;

use super::channels::{
    channel_kind, fetch_all_channels, fetch_channel_messages, fetch_message_replies, reply_count,
    resolve_channel_name,
};
use super::export::{backup_dir_path, write_channels_csv, write_json, write_views_csv};
use super::legacy::{discover_chat_views, fetch_view_comments};
use super::workspace::fetch_members;

/// Options for a backup run.
#[derive(Debug, Clone)]
pub struct BackupOptions {
    /// Skip scanning for legacy chat views.
    pub skip_legacy: bool,
    /// Fetch thread replies for messages that report them.
    pub fetch_replies: bool,
    /// Root directory under which the per-run directory is created.
    pub output_dir: PathBuf,
}

/// Orchestrates a complete backup of one workspace.
pub struct BackupService<'a> {
    client: &'a ApiClient,
    options: BackupOptions,
}

impl<'a> BackupService<'a> {
    /// Create a new backup service.
    #[must_use]
    pub const fn new(client: &'a ApiClient, options: BackupOptions) -> Self {
        Self { client, options }
    }

    /// Runs the full backup for the selected workspace.
    ///
    /// # Errors
    /// Returns error on fatal authorization failure or when output files
    /// cannot be written.
    pub fn run(&self, workspace: &Workspace) -> Result<BackupStats> {
        println!("\nFetching workspace members...");
        let members = fetch_members(self.client, &workspace.id)?;
        println!("Found {} member(s)", members.len());

        let backup_dir = backup_dir_path(&self.options.output_dir, &workspace.name);
        fs::create_dir_all(&backup_dir).map_err(|e| {
            AppError::io(
                format!("Failed to create backup directory {}", backup_dir.display()),
                e,
            )
        })?;

        let mut stats = BackupStats::default();

        // Part 1: legacy chat views (v2).
        if !self.options.skip_legacy {
            println!("\n{}", "-".repeat(60));
            println!("Part 1: Scanning for legacy Chat Views...");
            println!("{}", "-".repeat(60));

            let views = self.backup_chat_views(workspace, &mut stats)?;
            if !views.is_empty() {
                write_json(&backup_dir.join("chat_views.json"), &views)?;
                write_views_csv(&backup_dir.join("chat_views.csv"), &views)?;
            }
        }

        // Part 2: channels, DMs, group DMs (v3).
        println!("\n{}", "-".repeat(60));
        println!("Part 2: Fetching ALL conversations (Channels + DMs + Group DMs)...");
        println!("{}", "-".repeat(60));

        let exports = self.backup_channels(workspace, &members, &mut stats)?;
        if !exports.is_empty() {
            write_json(&backup_dir.join("all_conversations.json"), &exports)?;
            write_channels_csv(&backup_dir.join("all_conversations.csv"), &exports)?;

            self.write_partition(&backup_dir, &exports, ChannelKind::Channel, "channels")?;
            self.write_partition(&backup_dir, &exports, ChannelKind::Dm, "direct_messages")?;
            self.write_partition(&backup_dir, &exports, ChannelKind::GroupDm, "group_dms")?;
        }

        self.print_summary(workspace, &stats, &backup_dir);

        let summary = build_summary(workspace, &stats);
        write_json(&backup_dir.join("backup_summary.json"), &summary)?;

        Ok(stats)
    }

    /// Discovers legacy chat views and fetches all their comments.
    fn backup_chat_views(
        &self,
        workspace: &Workspace,
        stats: &mut BackupStats,
    ) -> Result<Vec<ChatViewExport>> {
        let refs = discover_chat_views(self.client, &workspace.id)?;
        println!("\nFound {} chat view(s)", refs.len());
        stats.chat_views = refs.len();

        let mut exports = Vec::with_capacity(refs.len());
        for view in refs {
            println!(
                "\n  Backing up: {} ({})",
                view.view_name.cyan(),
                view.location
            );

            let comments = fetch_view_comments(self.client, &view.view_id)?;
            stats.chat_view_comments += comments.len();

            exports.push(ChatViewExport {
                view_id: view.view_id,
                view_name: view.view_name,
                location: view.location,
                comment_count: comments.len(),
                comments,
            });
        }

        Ok(exports)
    }

    /// Enumerates channels and fetches their messages and replies.
    fn backup_channels(
        &self,
        workspace: &Workspace,
        members: &MemberDirectory,
        stats: &mut BackupStats,
    ) -> Result<Vec<ChannelExport>> {
        let channels = fetch_all_channels(self.client, &workspace.id)?;

        for channel in &channels {
            match channel_kind(channel) {
                ChannelKind::Channel => stats.channels += 1,
                ChannelKind::Dm => stats.dms += 1,
                ChannelKind::GroupDm => stats.group_dms += 1,
                ChannelKind::Other(_) => stats.other_channels += 1,
            }
        }

        println!("\n  Channels:   {}", stats.channels);
        println!("  DMs:        {}", stats.dms);
        println!("  Group DMs:  {}", stats.group_dms);
        if stats.other_channels > 0 {
            println!("  Other:      {}", stats.other_channels);
        }
        println!("  Total:      {}", channels.len());

        let total = channels.len();
        let mut exports = Vec::with_capacity(total);

        for (index, channel) in channels.into_iter().enumerate() {
            let kind = channel_kind(&channel);
            let channel_id = channel
                .get("id")
                .and_then(scalar_string)
                .unwrap_or_default();
            let channel_name = resolve_channel_name(&channel, members);

            println!(
                "\n  [{}/{total}] {} (type: {kind})",
                index + 1,
                channel_name.cyan()
            );

            let messages = fetch_channel_messages(self.client, &workspace.id, &channel_id)?;
            stats.total_messages += messages.len();

            let mut threads = Vec::with_capacity(messages.len());
            for message in messages {
                let mut thread = MessageThread {
                    message,
                    replies: Vec::new(),
                };

                if self.options.fetch_replies && reply_count(&thread.message) > 0 {
                    let message_id = thread.id();
                    thread.replies = fetch_message_replies(
                        self.client,
                        &workspace.id,
                        &channel_id,
                        &message_id,
                    )?;
                    stats.total_thread_replies += thread.replies.len();
                    if !thread.replies.is_empty() {
                        println!(
                            "      Thread: {} replies on message {message_id}",
                            thread.replies.len()
                        );
                    }
                }

                threads.push(thread);
            }

            exports.push(ChannelExport {
                channel_id,
                channel_name,
                channel_type: kind,
                channel_info: channel,
                message_count: threads.len(),
                messages: threads,
            });
        }

        Ok(exports)
    }

    /// Writes one category's JSON and CSV files when the category is
    /// non-empty.
    fn write_partition(
        &self,
        backup_dir: &Path,
        exports: &[ChannelExport],
        kind: ChannelKind,
        name: &str,
    ) -> Result<()> {
        let subset: Vec<ChannelExport> = exports
            .iter()
            .filter(|export| export.channel_type == kind)
            .cloned()
            .collect();

        if subset.is_empty() {
            return Ok(());
        }

        write_json(&backup_dir.join(format!("{name}.json")), &subset)?;
        write_channels_csv(&backup_dir.join(format!("{name}.csv")), &subset)?;

        Ok(())
    }

    fn print_summary(&self, workspace: &Workspace, stats: &BackupStats, backup_dir: &Path) {
        println!("\n{}", "=".repeat(60));
        println!("  {}", "Backup Complete!".green().bold());
        println!("{}", "=".repeat(60));
        println!("  Workspace:       {}", workspace.name);
        if !self.options.skip_legacy {
            println!(
                "  Chat Views:      {} views, {} comments",
                stats.chat_views, stats.chat_view_comments
            );
        }
        println!("  Channels:        {}", stats.channels);
        println!("  Direct Messages: {}", stats.dms);
        println!("  Group DMs:       {}", stats.group_dms);
        println!("  Total Messages:  {}", stats.total_messages);
        println!("  Thread Replies:  {}", stats.total_thread_replies);
        println!("  Backup Location: {}", backup_dir.display());
        println!("{}", "=".repeat(60));
    }
}

/// Builds the machine-readable run summary.
fn build_summary(workspace: &Workspace, stats: &BackupStats) -> BackupSummary {
    let mut files = BTreeMap::new();
    files.insert(
        "all_conversations".to_string(),
        "all_conversations.json / .csv".to_string(),
    );
    files.insert(
        "channels_only".to_string(),
        "channels.json / .csv".to_string(),
    );
    files.insert(
        "direct_messages".to_string(),
        "direct_messages.json / .csv".to_string(),
    );
    files.insert(
        "group_dms".to_string(),
        "group_dms.json / .csv".to_string(),
    );
    files.insert(
        "chat_views".to_string(),
        "chat_views.json / .csv (legacy)".to_string(),
    );

    BackupSummary {
        workspace_id: workspace.id.clone(),
        workspace_name: workspace.name.clone(),
        backup_date: Local::now().to_rfc3339(),
        chat_views_count: stats.chat_views,
        chat_view_comments_count: stats.chat_view_comments,
        channels_count: stats.channels,
        dms_count: stats.dms,
        group_dms_count: stats.group_dms,
        total_messages: stats.total_messages,
        total_thread_replies: stats.total_thread_replies,
        files,
    }
}
