//! Legacy chat-view discovery and comment fetching (v2 API).
//!
//! Chat views are an older conversation surface attached to the provider's
//! space/folder/list hierarchy. Discovery walks all four levels and keeps
//! only views tagged `chat`; comments are paged with the offset/marker
//! idiom of the v2 comment endpoint.

use serde_json::Value;

use crate::domain::{scalar_string, Result};
use crate::infrastructure::ApiClient;

/// Page size the comment endpoint serves; a shorter page ends the walk.
const COMMENT_PAGE_SIZE: usize = 25;

/// A discovered chat view with its human-readable location.
#[derive(Debug, Clone)]
pub struct ChatViewRef {
    /// View identifier.
    pub view_id: String,
    /// View display name.
    pub view_name: String,
    /// Breadcrumb built from ancestor names, used purely for labeling.
    pub location: String,
}

/// Discovers all chat views across spaces, folders and lists.
///
/// # Errors
/// Returns error on a fatal authorization failure.
pub fn discover_chat_views(client: &ApiClient, team_id: &str) -> Result<Vec<ChatViewRef>> {
    let mut chat_views = Vec::new();

    let spaces = fetch_array(
        client,
        &client.v2_url(&format!("team/{team_id}/space")),
        &[("archived", "false".to_string())],
        "spaces",
    )?;
    println!("\nFound {} space(s)", spaces.len());

    for space in &spaces {
        let space_name = display_name(space);
        let Some(space_id) = space.get("id").and_then(scalar_string) else {
            continue;
        };
        println!("\n  Scanning space: {space_name}");

        let location = format!("Space: {space_name}");
        chat_views.extend(views_at(client, "space", &space_id, &location)?);

        let folders = fetch_array(
            client,
            &client.v2_url(&format!("space/{space_id}/folder")),
            &[("archived", "false".to_string())],
            "folders",
        )?;

        for folder in &folders {
            let folder_name = display_name(folder);
            let Some(folder_id) = folder.get("id").and_then(scalar_string) else {
                continue;
            };

            let location = format!("Space: {space_name} > Folder: {folder_name}");
            chat_views.extend(views_at(client, "folder", &folder_id, &location)?);

            let lists = fetch_array(
                client,
                &client.v2_url(&format!("folder/{folder_id}/list")),
                &[("archived", "false".to_string())],
                "lists",
            )?;

            for list in &lists {
                let list_name = display_name(list);
                let Some(list_id) = list.get("id").and_then(scalar_string) else {
                    continue;
                };

                let location =
                    format!("Space: {space_name} > Folder: {folder_name} > List: {list_name}");
                chat_views.extend(views_at(client, "list", &list_id, &location)?);
            }
        }

        let folderless = fetch_array(
            client,
            &client.v2_url(&format!("space/{space_id}/list")),
            &[("archived", "false".to_string())],
            "lists",
        )?;

        for list in &folderless {
            let list_name = display_name(list);
            let Some(list_id) = list.get("id").and_then(scalar_string) else {
                continue;
            };

            let location = format!("Space: {space_name} > List: {list_name}");
            chat_views.extend(views_at(client, "list", &list_id, &location)?);
        }
    }

    Ok(chat_views)
}

/// Fetches all comments of a chat view via offset/marker pagination.
///
/// The oldest comment of each page supplies the `start`/`start_id` markers
/// for the next page; a page shorter than the fixed page size, an empty
/// page, or missing marker fields ends the walk.
///
/// # Errors
/// Returns error on a fatal authorization failure.
pub fn fetch_view_comments(client: &ApiClient, view_id: &str) -> Result<Vec<Value>> {
    let url = client.v2_url(&format!("view/{view_id}/comment"));

    collect_comment_pages(|marker| {
        let mut params = Vec::new();
        if let Some((start, start_id)) = marker {
            params.push(("start", start.clone()));
            params.push(("start_id", start_id.clone()));
        }
        client.get(&url, &params)
    })
}

/// Offset/marker pagination driver for the comment endpoint.
pub(crate) fn collect_comment_pages<F>(mut fetch_page: F) -> Result<Vec<Value>>
where
    F: FnMut(Option<&(String, String)>) -> Result<Option<Value>>,
{
    let mut comments: Vec<Value> = Vec::new();
    let mut marker: Option<(String, String)> = None;

    loop {
        let Some(body) = fetch_page(marker.as_ref())? else {
            break;
        };

        let page = body
            .get("comments")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if page.is_empty() {
            break;
        }

        let page_len = page.len();
        comments.extend(page);
        println!("    Fetched {} comments so far...", comments.len());

        if page_len < COMMENT_PAGE_SIZE {
            break;
        }

        marker = match comments.last().and_then(next_marker) {
            Some(m) => Some(m),
            None => break,
        };
    }

    Ok(comments)
}

/// Offset markers taken from the oldest comment of a page.
pub(crate) fn next_marker(comment: &Value) -> Option<(String, String)> {
    let start = comment.get("date").and_then(scalar_string)?;
    let start_id = comment.get("id").and_then(scalar_string)?;
    Some((start, start_id))
}

/// Fetches the views of one hierarchy level and keeps the chat-typed ones.
fn views_at(
    client: &ApiClient,
    scope: &str,
    id: &str,
    location: &str,
) -> Result<Vec<ChatViewRef>> {
    let views = fetch_array(client, &client.v2_url(&format!("{scope}/{id}/view")), &[], "views")?;
    Ok(chat_view_refs(&views, location))
}

/// Filters chat-typed views into labeled references.
pub(crate) fn chat_view_refs(views: &[Value], location: &str) -> Vec<ChatViewRef> {
    views
        .iter()
        .filter(|view| view.get("type").and_then(Value::as_str) == Some("chat"))
        .map(|view| ChatViewRef {
            view_id: view
                .get("id")
                .and_then(scalar_string)
                .unwrap_or_default(),
            view_name: view
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("Unnamed")
                .to_string(),
            location: location.to_string(),
        })
        .collect()
}

/// GETs an endpoint and pulls an array out of the response by key.
fn fetch_array(
    client: &ApiClient,
    url: &str,
    params: &[(&str, String)],
    key: &str,
) -> Result<Vec<Value>> {
    Ok(client
        .get(url, params)?
        .and_then(|body| body.get(key).and_then(Value::as_array).cloned())
        .unwrap_or_default())
}

fn display_name(item: &Value) -> String {
    item.get("name")
        .and_then(Value::as_str)
        .unwrap_or("Unnamed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn comment(id: u64) -> Value {
        json!({"id": id.to_string(), "date": (1_700_000_000_000u64 + id).to_string()})
    }

    fn page_of(ids: std::ops::Range<u64>) -> Value {
        json!({"comments": ids.map(comment).collect::<Vec<_>>()})
    }

    #[test]
    fn test_comment_pages_stop_on_short_page() {
        let mut calls = 0usize;
        let comments = collect_comment_pages(|marker| {
            calls += 1;
            match calls {
                1 => {
                    assert!(marker.is_none());
                    Ok(Some(page_of(0..25)))
                }
                2 => {
                    let (start, start_id) = marker.unwrap();
                    assert_eq!(start_id, "24");
                    assert_eq!(start, "1700000000024");
                    Ok(Some(page_of(25..30)))
                }
                _ => panic!("walk should have ended"),
            }
        })
        .unwrap();

        assert_eq!(calls, 2);
        assert_eq!(comments.len(), 30);
    }

    #[test]
    fn test_comment_pages_stop_on_empty_page() {
        let comments = collect_comment_pages(|_| Ok(Some(json!({"comments": []})))).unwrap();
        assert!(comments.is_empty());
    }

    #[test]
    fn test_comment_pages_stop_on_missing_marker() {
        let mut calls = 0usize;
        let comments = collect_comment_pages(|_| {
            calls += 1;
            // Full page, but the oldest comment carries no marker fields.
            Ok(Some(json!({
                "comments": (0..25).map(|i| json!({"text": i})).collect::<Vec<_>>()
            })))
        })
        .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(comments.len(), 25);
    }

    #[test]
    fn test_next_marker_accepts_numeric_fields() {
        let marker = next_marker(&json!({"id": 7, "date": 1_700_000_000_000u64})).unwrap();
        assert_eq!(marker, ("1700000000000".to_string(), "7".to_string()));
    }

    #[test]
    fn test_chat_view_refs_filter_and_label() {
        let views = vec![
            json!({"id": "v1", "name": "Team Chat", "type": "chat"}),
            json!({"id": "v2", "name": "Board", "type": "board"}),
            json!({"id": "v3", "type": "chat"}),
        ];

        let refs = chat_view_refs(&views, "Space: Eng");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].view_name, "Team Chat");
        assert_eq!(refs[0].location, "Space: Eng");
        assert_eq!(refs[1].view_name, "Unnamed");
    }
}
