//! Domain layer - core business types.
//!
//! This layer contains pure domain models and error types
//! without any external dependencies (network, IO, etc.).

pub mod error;
pub mod models;

pub use error::{AppError, Result};
pub use models::{
    scalar_string, BackupStats, BackupSummary, ChannelExport, ChannelKind, ChatViewExport, Member,
    MemberDirectory, MessageThread, Workspace,
};
