//! Domain models for ClickUp chat data.
//!
//! These models represent the entities collected during a backup run.
//! Provider payloads (channels, messages, comments) stay as raw
//! `serde_json::Value` so the export preserves every field the API
//! returned; typed wrappers exist only for the structure this tool adds
//! around them.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A workspace (team) the token has access to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    /// Workspace identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// A workspace member, used to resolve DM participant names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    /// Display name (username, falling back to initials).
    pub name: String,
    /// Email address, empty when not exposed.
    pub email: String,
}

/// Member identifier to member info, built once per run and read-only
/// afterward.
pub type MemberDirectory = HashMap<String, Member>;

/// Logical channel category derived from the provider `type` tag.
///
/// Unrecognized tags are preserved as-is in the `Other` bucket rather than
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChannelKind {
    /// Named multi-party conversation.
    Channel,
    /// One-on-one direct message.
    Dm,
    /// Multi-person private chat.
    GroupDm,
    /// Any other provider tag.
    Other(String),
}

impl ChannelKind {
    /// Parse the provider type tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "CHANNEL" => Self::Channel,
            "DM" => Self::Dm,
            "GROUP_DM" => Self::GroupDm,
            other => Self::Other(other.to_string()),
        }
    }

    /// The provider-facing tag for this category.
    #[must_use]
    pub fn tag(&self) -> &str {
        match self {
            Self::Channel => "CHANNEL",
            Self::Dm => "DM",
            Self::GroupDm => "GROUP_DM",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for ChannelKind {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<ChannelKind> for String {
    fn from(kind: ChannelKind) -> Self {
        kind.tag().to_string()
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A channel message with its fetched thread replies attached.
///
/// The raw provider payload is flattened into the serialized form, so the
/// export keeps the message exactly as returned plus a `replies` array when
/// a thread was fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageThread {
    /// Raw provider message payload, preserved as-is.
    #[serde(flatten)]
    pub message: Value,
    /// Thread replies, fetched on demand; never nested further.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<Value>,
}

impl MessageThread {
    /// Best-effort message identifier from the raw payload.
    #[must_use]
    pub fn id(&self) -> String {
        self.message
            .get("id")
            .and_then(scalar_string)
            .unwrap_or_default()
    }
}

/// One exported channel with its full message history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelExport {
    /// Channel identifier.
    pub channel_id: String,
    /// Resolved display name (synthesized for DMs).
    pub channel_name: String,
    /// Logical category.
    pub channel_type: ChannelKind,
    /// Raw provider channel metadata.
    pub channel_info: Value,
    /// Number of top-level messages.
    pub message_count: usize,
    /// Messages in provider-returned order.
    pub messages: Vec<MessageThread>,
}

/// One exported legacy chat view with all its comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatViewExport {
    /// View identifier.
    pub view_id: String,
    /// View display name.
    pub view_name: String,
    /// Breadcrumb location in the space/folder/list hierarchy.
    pub location: String,
    /// Number of comments fetched.
    pub comment_count: usize,
    /// Raw comments in provider-returned order.
    pub comments: Vec<Value>,
}

/// Running totals accumulated over a backup run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackupStats {
    /// Legacy chat views backed up.
    pub chat_views: usize,
    /// Comments across all legacy chat views.
    pub chat_view_comments: usize,
    /// Channels with the `CHANNEL` tag.
    pub channels: usize,
    /// One-on-one DMs.
    pub dms: usize,
    /// Group DMs.
    pub group_dms: usize,
    /// Channels with an unrecognized tag.
    pub other_channels: usize,
    /// Top-level messages across all channels.
    pub total_messages: usize,
    /// Thread replies across all messages.
    pub total_thread_replies: usize,
}

/// Run summary written as the last output file.
#[derive(Debug, Clone, Serialize)]
pub struct BackupSummary {
    pub workspace_id: String,
    pub workspace_name: String,
    /// ISO 8601 run timestamp.
    pub backup_date: String,
    pub chat_views_count: usize,
    pub chat_view_comments_count: usize,
    pub channels_count: usize,
    pub dms_count: usize,
    pub group_dms_count: usize,
    pub total_messages: usize,
    pub total_thread_replies: usize,
    /// Logical partition name to output file names.
    pub files: BTreeMap<String, String>,
}

/// Renders a scalar the provider encodes as either a string or a number.
///
/// ClickUp ids and epoch fields appear in both encodings depending on the
/// endpoint; everything downstream works with the string form.
#[must_use]
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_channel_kind_from_tag() {
        assert_eq!(ChannelKind::from_tag("CHANNEL"), ChannelKind::Channel);
        assert_eq!(ChannelKind::from_tag("DM"), ChannelKind::Dm);
        assert_eq!(ChannelKind::from_tag("GROUP_DM"), ChannelKind::GroupDm);
        assert_eq!(
            ChannelKind::from_tag("LOCATION_CHANNEL"),
            ChannelKind::Other("LOCATION_CHANNEL".to_string())
        );
    }

    #[test]
    fn test_channel_kind_tag_roundtrip() {
        for tag in ["CHANNEL", "DM", "GROUP_DM", "SOMETHING_NEW"] {
            assert_eq!(ChannelKind::from_tag(tag).tag(), tag);
        }
    }

    #[test]
    fn test_scalar_string() {
        assert_eq!(scalar_string(&json!("abc")), Some("abc".to_string()));
        assert_eq!(scalar_string(&json!(42)), Some("42".to_string()));
        assert_eq!(scalar_string(&json!(null)), None);
        assert_eq!(scalar_string(&json!(["x"])), None);
    }

    #[test]
    fn test_message_thread_serializes_flat() {
        let thread = MessageThread {
            message: json!({"id": "m1", "content": "hello"}),
            replies: vec![json!({"id": "r1"})],
        };

        let value = serde_json::to_value(&thread).unwrap();
        assert_eq!(value["id"], "m1");
        assert_eq!(value["content"], "hello");
        assert_eq!(value["replies"][0]["id"], "r1");
    }

    #[test]
    fn test_message_thread_omits_empty_replies() {
        let thread = MessageThread {
            message: json!({"id": "m1"}),
            replies: Vec::new(),
        };

        let value = serde_json::to_value(&thread).unwrap();
        assert!(value.get("replies").is_none());
    }
}
