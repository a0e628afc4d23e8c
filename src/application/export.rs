//! Export writers and field extraction.
//!
//! Serializes the collected records to pretty-printed JSON (full fidelity)
//! and flat CSV (one row per message, one per reply), with best-effort
//! plain-text extraction of rich content and epoch timestamp formatting.
//! Both writers overwrite; identical input produces identical files.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use serde::Serialize;
use serde_json::Value;

use crate::domain::{scalar_string, AppError, ChannelExport, ChatViewExport, Result};

const CHANNEL_CSV_HEADER: [&str; 11] = [
    "Channel Name",
    "Channel Type",
    "Message ID",
    "Date",
    "User",
    "User Email",
    "Message Text",
    "Is Reply",
    "Parent Message ID",
    "Reactions",
    "Attachments",
];

const VIEW_CSV_HEADER: [&str; 9] = [
    "View Name",
    "Location",
    "Comment ID",
    "Date",
    "User",
    "User Email",
    "Message Text",
    "Resolved",
    "Reply Count",
];

/// Writes pretty-printed JSON with overwrite semantics.
///
/// # Errors
/// Returns error if serialization or the write fails.
pub fn write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(data).map_err(AppError::json)?;

    fs::write(path, content)
        .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))?;

    println!("  Saved: {}", path.display());
    Ok(())
}

/// Writes channel messages as CSV, one row per message plus one per reply.
///
/// # Errors
/// Returns error if the file cannot be created or a row fails to write.
pub fn write_channels_csv(path: &Path, channels: &[ChannelExport]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .from_path(path)
        .map_err(AppError::csv)?;

    writer
        .write_record(CHANNEL_CSV_HEADER)
        .map_err(AppError::csv)?;

    for export in channels {
        for thread in &export.messages {
            write_message_row(&mut writer, export, &thread.message, false, "")?;

            let parent_id = thread.id();
            for reply in &thread.replies {
                write_message_row(&mut writer, export, reply, true, &parent_id)?;
            }
        }
    }

    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush {}", path.display()), e))?;
    println!("  Saved: {}", path.display());
    Ok(())
}

fn write_message_row(
    writer: &mut csv::Writer<fs::File>,
    export: &ChannelExport,
    message: &Value,
    is_reply: bool,
    parent_id: &str,
) -> Result<()> {
    let user = message
        .get("creator")
        .or_else(|| message.get("user"))
        .cloned()
        .unwrap_or(Value::Null);

    let content = message.get("content").or_else(|| message.get("text"));
    let text = extract_text(content);

    let reactions = match message.get("reactions").and_then(Value::as_array) {
        Some(reactions) if !reactions.is_empty() => {
            serde_json::to_string(reactions).map_err(AppError::json)?
        }
        _ => String::new(),
    };

    let attachments = message
        .get("attachments")
        .and_then(Value::as_array)
        .map(|attachments| {
            attachments
                .iter()
                .map(|a| {
                    a.get("name")
                        .or_else(|| a.get("url"))
                        .and_then(Value::as_str)
                        .unwrap_or("")
                        .to_string()
                })
                .collect::<Vec<_>>()
                .join("; ")
        })
        .unwrap_or_default();

    writer
        .write_record([
            export.channel_name.clone(),
            export.channel_type.tag().to_string(),
            field_str(message, "id"),
            format_timestamp(message.get("date_created").or_else(|| message.get("date"))),
            field_str_or(&user, "username", "name"),
            field_str(&user, "email"),
            text,
            if is_reply { "Yes" } else { "No" }.to_string(),
            parent_id.to_string(),
            reactions,
            attachments,
        ])
        .map_err(AppError::csv)?;

    Ok(())
}

/// Writes chat-view comments as CSV, one row per comment.
///
/// # Errors
/// Returns error if the file cannot be created or a row fails to write.
pub fn write_views_csv(path: &Path, views: &[ChatViewExport]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .from_path(path)
        .map_err(AppError::csv)?;

    writer.write_record(VIEW_CSV_HEADER).map_err(AppError::csv)?;

    for view in views {
        for comment in &view.comments {
            let user = comment.get("user").cloned().unwrap_or(Value::Null);
            let text =
                extract_text(comment.get("comment").or_else(|| comment.get("comment_text")));

            writer
                .write_record([
                    view.view_name.clone(),
                    view.location.clone(),
                    field_str(comment, "id"),
                    format_timestamp(comment.get("date")),
                    field_str_or(&user, "username", "initials"),
                    field_str(&user, "email"),
                    text,
                    scalar_cell(comment.get("resolved")),
                    comment
                        .get("reply_count")
                        .map_or_else(|| "0".to_string(), |v| scalar_cell(Some(v))),
                ])
                .map_err(AppError::csv)?;
        }
    }

    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush {}", path.display()), e))?;
    println!("  Saved: {}", path.display());
    Ok(())
}

/// Extracts plain text from the content formats the provider uses.
///
/// Strings pass through; fragment arrays concatenate their `text` fields;
/// single rich objects fall back to `text`, then `plain_text`, then the
/// raw JSON.
#[must_use]
pub fn extract_text(content: Option<&Value>) -> String {
    match content {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Object(map) => map.get("text").and_then(Value::as_str).unwrap_or(""),
                Value::String(s) => s.as_str(),
                _ => "",
            })
            .collect(),
        Some(Value::Object(map)) => {
            match map
                .get("text")
                .or_else(|| map.get("plain_text"))
                .and_then(Value::as_str)
            {
                Some(text) => text.to_string(),
                None => serde_json::to_string(map).unwrap_or_default(),
            }
        }
        Some(other) => other.to_string(),
    }
}

/// Renders an epoch timestamp (milliseconds or seconds) as local time.
///
/// Values above 1e12 are treated as milliseconds. Unparseable input echoes
/// the raw value.
#[must_use]
pub fn format_timestamp(ts: Option<&Value>) -> String {
    let raw = match ts {
        None | Some(Value::Null) => return String::new(),
        Some(Value::Number(n)) if n.as_i64() == Some(0) => return String::new(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if s.is_empty() => return String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => return other.to_string(),
    };

    let Ok(epoch) = raw.parse::<i64>() else {
        return raw;
    };
    let secs = if epoch > 1_000_000_000_000 {
        epoch / 1000
    } else {
        epoch
    };

    Local
        .timestamp_opt(secs, 0)
        .single()
        .map_or(raw, |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Per-run backup directory: sanitized workspace name plus timestamp.
#[must_use]
pub fn backup_dir_path(output_dir: &Path, workspace_name: &str) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    output_dir.join(format!("{}_{stamp}", sanitize_name(workspace_name)))
}

/// Filters a workspace name down to filesystem-safe characters.
pub(crate) fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let trimmed = cleaned.trim();

    if trimmed.is_empty() {
        "workspace".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Best-effort string field from a raw payload.
fn field_str(value: &Value, key: &str) -> String {
    value.get(key).and_then(scalar_string).unwrap_or_default()
}

/// Best-effort string field with a fallback key.
fn field_str_or(value: &Value, key: &str, fallback: &str) -> String {
    let primary = field_str(value, key);
    if primary.is_empty() {
        field_str(value, fallback)
    } else {
        primary
    }
}

/// Renders any scalar for a CSV cell; strings stay bare, the rest render
/// as JSON.
fn scalar_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChannelKind, MessageThread};
    use serde_json::json;

    fn channel_with_thread() -> ChannelExport {
        ChannelExport {
            channel_id: "ch1".to_string(),
            channel_name: "general".to_string(),
            channel_type: ChannelKind::Channel,
            channel_info: json!({"id": "ch1"}),
            message_count: 2,
            messages: vec![
                MessageThread {
                    message: json!({"id": "m1", "content": "first"}),
                    replies: vec![
                        json!({"id": "r1", "content": "one"}),
                        json!({"id": "r2", "content": "two"}),
                        json!({"id": "r3", "content": "three"}),
                    ],
                },
                MessageThread {
                    message: json!({"id": "m2", "content": "second"}),
                    replies: Vec::new(),
                },
            ],
        }
    }

    #[test]
    fn test_extract_text_variants() {
        assert_eq!(extract_text(Some(&json!("plain"))), "plain");
        assert_eq!(extract_text(None), "");
        assert_eq!(extract_text(Some(&json!(null))), "");
        assert_eq!(
            extract_text(Some(&json!([{"text": "a"}, "b", {"other": 1}]))),
            "ab"
        );
        assert_eq!(extract_text(Some(&json!({"text": "rich"}))), "rich");
        assert_eq!(
            extract_text(Some(&json!({"plain_text": "fallback"}))),
            "fallback"
        );
        // No text field at all: raw JSON string.
        assert_eq!(extract_text(Some(&json!({"ops": 1}))), r#"{"ops":1}"#);
    }

    #[test]
    fn test_format_timestamp_millis_and_seconds_agree() {
        let from_millis = format_timestamp(Some(&json!(1_700_000_000_000u64)));
        let from_seconds = format_timestamp(Some(&json!(1_700_000_000u64)));

        assert_eq!(from_millis, from_seconds);
        assert!(!from_millis.is_empty());
    }

    #[test]
    fn test_format_timestamp_string_encoding() {
        assert_eq!(
            format_timestamp(Some(&json!("1700000000000"))),
            format_timestamp(Some(&json!(1_700_000_000_000u64)))
        );
    }

    #[test]
    fn test_format_timestamp_degenerate_inputs() {
        assert_eq!(format_timestamp(None), "");
        assert_eq!(format_timestamp(Some(&json!(0))), "");
        assert_eq!(format_timestamp(Some(&json!(""))), "");
        assert_eq!(format_timestamp(Some(&json!("not-a-date"))), "not-a-date");
    }

    #[test]
    fn test_channel_csv_row_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("channels.csv");

        write_channels_csv(&path, &[channel_with_thread()]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let rows: Vec<&str> = content.lines().collect();
        // Header + 2 top-level messages + 3 reply rows.
        assert_eq!(rows.len(), 6);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let records: Vec<csv::StringRecord> =
            reader.records().collect::<std::result::Result<_, _>>().unwrap();

        // Reply rows carry the flag and the parent identifier.
        assert_eq!(&records[0][7], "No");
        for reply_row in &records[1..4] {
            assert_eq!(&reply_row[7], "Yes");
            assert_eq!(&reply_row[8], "m1");
        }
        assert_eq!(&records[4][7], "No");
    }

    #[test]
    fn test_views_csv_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("views.csv");

        let view = ChatViewExport {
            view_id: "v1".to_string(),
            view_name: "Team Chat".to_string(),
            location: "Space: Eng".to_string(),
            comment_count: 1,
            comments: vec![json!({
                "id": "c1",
                "date": "1700000000000",
                "user": {"username": "alice", "email": "a@example.com"},
                "comment_text": "hello",
                "resolved": false,
                "reply_count": 2,
            })],
        };

        write_views_csv(&path, &[view]).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let records: Vec<csv::StringRecord> =
            reader.records().collect::<std::result::Result<_, _>>().unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], "Team Chat");
        assert_eq!(&records[0][4], "alice");
        assert_eq!(&records[0][6], "hello");
        assert_eq!(&records[0][7], "false");
        assert_eq!(&records[0][8], "2");
    }

    #[test]
    fn test_json_writer_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");

        let data = vec![channel_with_thread()];
        write_json(&first, &data).unwrap();
        write_json(&second, &data).unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());

        // Overwriting with the same data leaves the bytes unchanged.
        let before = fs::read(&first).unwrap();
        write_json(&first, &data).unwrap();
        assert_eq!(before, fs::read(&first).unwrap());
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Acme Inc"), "Acme Inc");
        assert_eq!(sanitize_name("a/b\\c"), "abc");
        assert_eq!(sanitize_name("///"), "workspace");
    }
}
