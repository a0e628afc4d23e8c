//! Workspace selection and member directory loading.
//!
//! Resolves which workspace a run operates on and builds the member
//! directory used to label direct-message channels.

use std::io::{self, Write};

use colored::Colorize;
use serde_json::Value;

use crate::domain::{scalar_string, AppError, Member, MemberDirectory, Result, Workspace};
use crate::infrastructure::ApiClient;

/// Fetches all workspaces (teams) the token has access to.
///
/// # Errors
/// Returns error on a fatal authorization failure.
pub fn list_workspaces(client: &ApiClient) -> Result<Vec<Workspace>> {
    let url = client.v2_url("team");
    let Some(body) = client.get(&url, &[])? else {
        return Ok(Vec::new());
    };

    let teams = body
        .get("teams")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    Ok(teams.iter().filter_map(parse_workspace).collect())
}

/// Selects a workspace, interactively or by a pre-supplied identifier.
///
/// A single accessible workspace is auto-selected; otherwise the operator
/// picks one by number on stdin.
///
/// # Errors
/// Returns error when no workspace is accessible or the requested
/// identifier is unknown.
pub fn select_workspace(client: &ApiClient, requested_id: Option<&str>) -> Result<Workspace> {
    let mut workspaces = list_workspaces(client)?;
    if workspaces.is_empty() {
        return Err(AppError::config(
            "No workspaces found. Check your API token.",
        ));
    }

    if let Some(id) = requested_id {
        return workspaces
            .into_iter()
            .find(|w| w.id == id)
            .map(|w| {
                println!("\nSelected workspace: {}", w.name.cyan());
                w
            })
            .ok_or_else(|| AppError::config(format!("Workspace ID '{id}' not found")));
    }

    println!("\nAvailable workspaces:");
    for (i, workspace) in workspaces.iter().enumerate() {
        println!("  [{}] {} (ID: {})", i + 1, workspace.name, workspace.id);
    }

    if workspaces.len() == 1 {
        let workspace = workspaces.remove(0);
        println!("\nAuto-selected: {}", workspace.name.cyan());
        return Ok(workspace);
    }

    loop {
        print!("\nSelect workspace number: ");
        io::stdout()
            .flush()
            .map_err(|e| AppError::io("Failed to flush stdout", e))?;

        let mut line = String::new();
        io::stdin()
            .read_line(&mut line)
            .map_err(|e| AppError::io("Failed to read selection", e))?;

        if let Ok(choice) = line.trim().parse::<usize>() {
            if choice >= 1 && choice <= workspaces.len() {
                return Ok(workspaces[choice - 1].clone());
            }
        }
        println!("Invalid selection. Try again.");
    }
}

/// Builds the member directory for a workspace.
///
/// Used only to resolve DM participant names; a failed fetch yields an
/// empty directory and DM names fall back to their identifiers.
///
/// # Errors
/// Returns error on a fatal authorization failure.
pub fn fetch_members(client: &ApiClient, team_id: &str) -> Result<MemberDirectory> {
    let url = client.v2_url(&format!("team/{team_id}"));
    let Some(body) = client.get(&url, &[])? else {
        return Ok(MemberDirectory::new());
    };

    Ok(parse_members(&body))
}

fn parse_workspace(team: &Value) -> Option<Workspace> {
    let id = team.get("id").and_then(scalar_string)?;
    let name = team
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("Unnamed")
        .to_string();
    Some(Workspace { id, name })
}

/// Extracts the member directory from a team payload.
fn parse_members(body: &Value) -> MemberDirectory {
    let mut members = MemberDirectory::new();

    let entries = body
        .get("team")
        .and_then(|team| team.get("members"))
        .and_then(Value::as_array);

    for entry in entries.into_iter().flatten() {
        let user = entry.get("user").cloned().unwrap_or(Value::Null);
        let Some(id) = user.get("id").and_then(scalar_string) else {
            continue;
        };

        let name = user
            .get("username")
            .and_then(Value::as_str)
            .or_else(|| user.get("initials").and_then(Value::as_str))
            .unwrap_or("Unknown")
            .to_string();
        let email = user
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();

        members.insert(id, Member { name, email });
    }

    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_workspace_numeric_id() {
        let team = json!({"id": 9007, "name": "Acme"});
        let workspace = parse_workspace(&team).unwrap();
        assert_eq!(workspace.id, "9007");
        assert_eq!(workspace.name, "Acme");
    }

    #[test]
    fn test_parse_workspace_missing_id() {
        assert!(parse_workspace(&json!({"name": "No ID"})).is_none());
    }

    #[test]
    fn test_parse_members_fallback_chain() {
        let body = json!({
            "team": {
                "members": [
                    {"user": {"id": 1, "username": "alice", "email": "a@example.com"}},
                    {"user": {"id": 2, "initials": "BB"}},
                    {"user": {"id": 3}},
                    {"user": {}},
                ]
            }
        });

        let members = parse_members(&body);
        assert_eq!(members.len(), 3);
        assert_eq!(members["1"].name, "alice");
        assert_eq!(members["1"].email, "a@example.com");
        assert_eq!(members["2"].name, "BB");
        assert_eq!(members["2"].email, "");
        assert_eq!(members["3"].name, "Unknown");
    }

    #[test]
    fn test_parse_members_empty_payload() {
        assert!(parse_members(&json!({})).is_empty());
    }
}
