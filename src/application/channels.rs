//! Channel enumeration, message and thread-reply fetching (v3 API).
//!
//! Channels are walked twice (open, then including closed) and merged by
//! identifier; messages and replies are cursor-paginated per channel.

use std::collections::HashSet;

use serde_json::Value;

use crate::domain::{scalar_string, ChannelKind, MemberDirectory, Result};
use crate::infrastructure::ApiClient;

/// Page size requested from cursor-paginated endpoints.
const PAGE_LIMIT: &str = "100";

/// Walks a cursor-paginated endpoint until the provider stops returning
/// pages, items, or a continuation token.
///
/// The fetch closure receives the cursor from the previous page; items are
/// read from the first of `item_keys` present in the page. `on_page` is
/// called with the cumulative item count after each page.
pub(crate) fn collect_cursor_pages<F, P>(
    mut fetch_page: F,
    item_keys: &[&str],
    mut on_page: P,
) -> Result<Vec<Value>>
where
    F: FnMut(Option<&str>) -> Result<Option<Value>>,
    P: FnMut(usize),
{
    let mut items = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let Some(page) = fetch_page(cursor.as_deref())? else {
            break;
        };

        let page_items = page_items(&page, item_keys);
        if page_items.is_empty() {
            break;
        }
        items.extend(page_items);
        on_page(items.len());

        match page
            .get("next_cursor")
            .and_then(Value::as_str)
            .filter(|c| !c.is_empty())
        {
            Some(next) => cursor = Some(next.to_string()),
            None => break,
        }
    }

    Ok(items)
}

fn page_items(page: &Value, keys: &[&str]) -> Vec<Value> {
    keys.iter()
        .find_map(|key| page.get(*key).and_then(Value::as_array))
        .cloned()
        .unwrap_or_default()
}

/// Enumerates followed channels, merging the open and closed passes by
/// identifier in first-seen order.
///
/// # Errors
/// Returns error on a fatal authorization failure.
pub fn fetch_all_channels(client: &ApiClient, workspace_id: &str) -> Result<Vec<Value>> {
    let url = client.v3_url(&format!("workspaces/{workspace_id}/chat/channels"));
    let mut channels = Vec::new();
    let mut seen = HashSet::new();

    for include_closed in ["false", "true"] {
        let pass = collect_cursor_pages(
            |cursor| {
                let mut params = vec![
                    ("limit", PAGE_LIMIT.to_string()),
                    ("is_follower", "true".to_string()),
                    ("include_closed", include_closed.to_string()),
                ];
                if let Some(c) = cursor {
                    params.push(("cursor", c.to_string()));
                }
                client.get(&url, &params)
            },
            &["data"],
            |_| {},
        )?;

        merge_channels(&mut channels, &mut seen, pass);
        println!(
            "  Fetched {} unique channels so far... (include_closed={include_closed})",
            channels.len()
        );
    }

    Ok(channels)
}

/// Merges a batch into the accumulated channel list, keeping only the
/// first occurrence of each identifier. Entries without an identifier are
/// kept unconditionally.
pub(crate) fn merge_channels(
    into: &mut Vec<Value>,
    seen: &mut HashSet<String>,
    batch: Vec<Value>,
) {
    for channel in batch {
        if let Some(id) = channel.get("id").and_then(scalar_string) {
            if !seen.insert(id) {
                continue;
            }
        }
        into.push(channel);
    }
}

/// Fetches all messages of a channel in provider-returned order.
///
/// # Errors
/// Returns error on a fatal authorization failure.
pub fn fetch_channel_messages(
    client: &ApiClient,
    workspace_id: &str,
    channel_id: &str,
) -> Result<Vec<Value>> {
    let url = client.v3_url(&format!(
        "workspaces/{workspace_id}/chat/channels/{channel_id}/messages"
    ));

    collect_cursor_pages(
        |cursor| {
            let mut params = vec![("limit", PAGE_LIMIT.to_string())];
            if let Some(c) = cursor {
                params.push(("cursor", c.to_string()));
            }
            client.get(&url, &params)
        },
        &["data", "messages"],
        |count| println!("    Fetched {count} messages so far..."),
    )
}

/// Fetches all thread replies of a message.
///
/// # Errors
/// Returns error on a fatal authorization failure.
pub fn fetch_message_replies(
    client: &ApiClient,
    workspace_id: &str,
    channel_id: &str,
    message_id: &str,
) -> Result<Vec<Value>> {
    let url = client.v3_url(&format!(
        "workspaces/{workspace_id}/chat/channels/{channel_id}/messages/{message_id}/replies"
    ));

    collect_cursor_pages(
        |cursor| {
            let mut params = vec![("limit", PAGE_LIMIT.to_string())];
            if let Some(c) = cursor {
                params.push(("cursor", c.to_string()));
            }
            client.get(&url, &params)
        },
        &["data", "replies"],
        |_| {},
    )
}

/// The logical category of a raw channel payload.
#[must_use]
pub fn channel_kind(channel: &Value) -> ChannelKind {
    ChannelKind::from_tag(
        channel
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown"),
    )
}

/// Coerces the provider-reported reply count of a message.
///
/// Numeric strings coerce; anything non-numeric counts as zero. Thread
/// replies are fetched only for a positive result.
pub(crate) fn reply_count(message: &Value) -> u64 {
    match message.get("reply_count") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

/// Resolves a display name for a channel.
///
/// Provider-named channels keep their name. DM and group-DM names are
/// synthesized from the member directory; participants that cannot be
/// resolved are omitted from the joined name. Failing both, the channel
/// identifier is used.
#[must_use]
pub fn resolve_channel_name(channel: &Value, members: &MemberDirectory) -> String {
    let name = channel.get("name").and_then(Value::as_str).unwrap_or("");
    let kind = channel_kind(channel);

    if !name.is_empty() && kind == ChannelKind::Channel {
        return name.to_string();
    }

    if matches!(kind, ChannelKind::Dm | ChannelKind::GroupDm) {
        let links = channel
            .get("member_links")
            .or_else(|| channel.get("members"))
            .and_then(Value::as_array);

        let names: Vec<&str> = links
            .into_iter()
            .flatten()
            .filter_map(|link| {
                link.get("user_id")
                    .or_else(|| link.get("id"))
                    .and_then(scalar_string)
            })
            .filter_map(|uid| members.get(&uid).map(|member| member.name.as_str()))
            .collect();

        if !names.is_empty() {
            return format!("DM: {}", names.join(" & "));
        }
    }

    if name.is_empty() {
        let id = channel
            .get("id")
            .and_then(scalar_string)
            .unwrap_or_else(|| "unknown".to_string());
        format!("channel-{id}")
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Member;
    use serde_json::json;

    fn directory() -> MemberDirectory {
        let mut members = MemberDirectory::new();
        members.insert(
            "1".to_string(),
            Member {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
            },
        );
        members.insert(
            "2".to_string(),
            Member {
                name: "Bob".to_string(),
                email: String::new(),
            },
        );
        members
    }

    #[test]
    fn test_cursor_pages_follow_cursor_until_omitted() {
        let pages = vec![
            json!({"data": [{"id": "a"}], "next_cursor": "c1"}),
            json!({"data": [{"id": "b"}, {"id": "c"}]}),
        ];
        let mut calls = 0usize;

        let items = collect_cursor_pages(
            |cursor| {
                if calls == 1 {
                    assert_eq!(cursor, Some("c1"));
                }
                let page = pages.get(calls).cloned();
                calls += 1;
                Ok(page)
            },
            &["data"],
            |_| {},
        )
        .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_cursor_pages_stop_on_empty_page() {
        let mut calls = 0usize;
        let items = collect_cursor_pages(
            |_| {
                calls += 1;
                Ok(Some(json!({"data": [], "next_cursor": "never-followed"})))
            },
            &["data"],
            |_| {},
        )
        .unwrap();

        assert_eq!(calls, 1);
        assert!(items.is_empty());
    }

    #[test]
    fn test_cursor_pages_stop_on_missing_body() {
        let items = collect_cursor_pages(|_| Ok(None), &["data"], |_| {}).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_cursor_pages_fallback_item_key() {
        let items = collect_cursor_pages(
            |_| Ok(Some(json!({"messages": [{"id": "m"}]}))),
            &["data", "messages"],
            |_| {},
        )
        .unwrap();

        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_merge_channels_dedupes_first_seen() {
        let mut channels = Vec::new();
        let mut seen = HashSet::new();

        merge_channels(
            &mut channels,
            &mut seen,
            vec![
                json!({"id": "a", "pass": 1}),
                json!({"id": "b", "pass": 1}),
            ],
        );
        merge_channels(
            &mut channels,
            &mut seen,
            vec![
                json!({"id": "b", "pass": 2}),
                json!({"id": "c", "pass": 2}),
            ],
        );

        let ids: Vec<&str> = channels
            .iter()
            .map(|c| c["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(channels[1]["pass"], 1);
    }

    #[test]
    fn test_reply_count_coercion() {
        assert_eq!(reply_count(&json!({"reply_count": "3"})), 3);
        assert_eq!(reply_count(&json!({"reply_count": 3})), 3);
        assert_eq!(reply_count(&json!({"reply_count": "abc"})), 0);
        assert_eq!(reply_count(&json!({"reply_count": 0})), 0);
        assert_eq!(reply_count(&json!({})), 0);
    }

    #[test]
    fn test_resolve_dm_name_from_members() {
        let channel = json!({
            "id": "ch1",
            "type": "DM",
            "member_links": [{"user_id": "1"}, {"user_id": "2"}],
        });

        assert_eq!(
            resolve_channel_name(&channel, &directory()),
            "DM: Alice & Bob"
        );
    }

    #[test]
    fn test_resolve_dm_name_omits_unresolvable() {
        let channel = json!({
            "id": "ch1",
            "type": "DM",
            "member_links": [{"user_id": "1"}, {"user_id": "999"}],
        });

        assert_eq!(resolve_channel_name(&channel, &directory()), "DM: Alice");
    }

    #[test]
    fn test_resolve_named_channel_keeps_name() {
        let channel = json!({"id": "ch1", "type": "CHANNEL", "name": "general"});
        assert_eq!(resolve_channel_name(&channel, &directory()), "general");
    }

    #[test]
    fn test_resolve_name_falls_back_to_id() {
        let channel = json!({"id": "ch9", "type": "DM", "member_links": []});
        assert_eq!(resolve_channel_name(&channel, &directory()), "channel-ch9");
    }

    #[test]
    fn test_channel_kind_categorization() {
        assert_eq!(channel_kind(&json!({"type": "DM"})), ChannelKind::Dm);
        assert_eq!(
            channel_kind(&json!({})),
            ChannelKind::Other("unknown".to_string())
        );
    }
}
