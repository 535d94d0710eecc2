//! Jira search API wire types and mapping into `ActivityContext`.
//!
//! Only the fields the feed needs are modeled; everything else in the
//! response is ignored. Comment and worklog bodies arrive as Atlassian
//! Document Format trees, flattened to plain text here.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use standup_types::feed::{
    ActiveItem, ActivityContext, ActivityWindow, CommentEntry, FieldChangeEntry, TimeLogEntry,
};

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub issues: Vec<Issue>,
}

#[derive(Debug, Deserialize)]
pub struct Issue {
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
    #[serde(default)]
    pub changelog: Changelog,
}

#[derive(Debug, Default, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: String,
    pub status: Option<NamedEntity>,
    pub project: Option<NamedEntity>,
    pub updated: Option<String>,
    pub worklog: Option<WorklogBlock>,
    pub comment: Option<CommentBlock>,
}

#[derive(Debug, Deserialize)]
pub struct NamedEntity {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct WorklogBlock {
    #[serde(default)]
    pub worklogs: Vec<Worklog>,
}

#[derive(Debug, Deserialize)]
pub struct Worklog {
    pub author: Option<Author>,
    pub started: Option<String>,
    #[serde(rename = "timeSpentSeconds", default)]
    pub time_spent_seconds: i64,
    pub comment: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentBlock {
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Deserialize)]
pub struct Comment {
    pub author: Option<Author>,
    pub created: Option<String>,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Changelog {
    #[serde(default)]
    pub histories: Vec<History>,
}

#[derive(Debug, Deserialize)]
pub struct History {
    pub author: Option<Author>,
    pub created: Option<String>,
    #[serde(default)]
    pub items: Vec<HistoryItem>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryItem {
    #[serde(default)]
    pub field: String,
    #[serde(rename = "fromString")]
    pub from_value: Option<String>,
    #[serde(rename = "toString")]
    pub to_value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Author {
    #[serde(rename = "accountId", default)]
    pub account_id: String,
}

/// Map a search response into the provider-agnostic context, keeping only
/// entries authored by `user_id` and timestamped inside the window.
pub fn map_search_response(
    response: SearchResponse,
    user_id: &str,
    window: ActivityWindow,
    generated_at: DateTime<Utc>,
) -> ActivityContext {
    let mut context = ActivityContext::empty(generated_at, window);

    for issue in response.issues {
        let summary = issue.fields.summary.clone();
        let status = issue
            .fields
            .status
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_default();
        let project = issue
            .fields
            .project
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let updated_at = issue
            .fields
            .updated
            .as_deref()
            .and_then(parse_jira_datetime)
            .unwrap_or(generated_at);

        context.active_items.push(ActiveItem {
            key: issue.key.clone(),
            summary: summary.clone(),
            status,
            updated_at,
            project,
        });

        if let Some(block) = &issue.fields.worklog {
            for worklog in &block.worklogs {
                if !authored_by(worklog.author.as_ref(), user_id) {
                    continue;
                }
                let Some(started_at) = worklog.started.as_deref().and_then(parse_jira_datetime)
                else {
                    continue;
                };
                if !in_window(&window, started_at) {
                    continue;
                }
                context.time_logs.push(TimeLogEntry {
                    item_key: issue.key.clone(),
                    item_summary: summary.clone(),
                    author_id: user_id.to_string(),
                    started_at,
                    seconds_spent: worklog.time_spent_seconds,
                    comment: worklog.comment.as_ref().map(document_text).unwrap_or_default(),
                });
            }
        }

        if let Some(block) = &issue.fields.comment {
            for comment in &block.comments {
                if !authored_by(comment.author.as_ref(), user_id) {
                    continue;
                }
                let Some(created_at) = comment.created.as_deref().and_then(parse_jira_datetime)
                else {
                    continue;
                };
                if !in_window(&window, created_at) {
                    continue;
                }
                context.comments.push(CommentEntry {
                    item_key: issue.key.clone(),
                    item_summary: summary.clone(),
                    author_id: user_id.to_string(),
                    created_at,
                    body: comment.body.as_ref().map(document_text).unwrap_or_default(),
                });
            }
        }

        for history in &issue.changelog.histories {
            if !authored_by(history.author.as_ref(), user_id) {
                continue;
            }
            let Some(changed_at) = history.created.as_deref().and_then(parse_jira_datetime) else {
                continue;
            };
            if !in_window(&window, changed_at) {
                continue;
            }
            for item in &history.items {
                context.field_changes.push(FieldChangeEntry {
                    item_key: issue.key.clone(),
                    item_summary: summary.clone(),
                    author_id: user_id.to_string(),
                    changed_at,
                    field: item.field.clone(),
                    from_value: item.from_value.clone().unwrap_or_default(),
                    to_value: item.to_value.clone().unwrap_or_default(),
                });
            }
        }
    }

    context
}

fn authored_by(author: Option<&Author>, user_id: &str) -> bool {
    author.is_some_and(|a| a.account_id == user_id)
}

fn in_window(window: &ActivityWindow, stamp: DateTime<Utc>) -> bool {
    stamp >= window.start && stamp < window.end
}

/// Jira stamps look like `2026-08-05T10:00:00.000+0000` (offset without a
/// colon); RFC 3339 is accepted too.
pub fn parse_jira_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.3f%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Flatten an Atlassian Document Format tree (or a plain string) to text.
pub fn document_text(value: &serde_json::Value) -> String {
    fn collect(value: &serde_json::Value, out: &mut String) {
        match value {
            serde_json::Value::String(s) => {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(s);
            }
            serde_json::Value::Object(map) => {
                if let Some(serde_json::Value::String(text)) = map.get("text") {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(text);
                }
                if let Some(content) = map.get("content") {
                    collect(content, out);
                }
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    collect(item, out);
                }
            }
            _ => {}
        }
    }

    let mut out = String::new();
    collect(value, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn window() -> ActivityWindow {
        ActivityWindow::around(Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap())
    }

    fn fixture() -> SearchResponse {
        serde_json::from_value(json!({
            "issues": [
                {
                    "key": "PROJ-1",
                    "fields": {
                        "summary": "Session store",
                        "status": { "name": "In Progress" },
                        "project": { "name": "Standup" },
                        "updated": "2026-08-05T18:30:00.000+0000",
                        "worklog": {
                            "worklogs": [
                                {
                                    "author": { "accountId": "acct-1" },
                                    "started": "2026-08-05T09:00:00.000+0000",
                                    "timeSpentSeconds": 5400,
                                    "comment": {
                                        "type": "doc",
                                        "content": [
                                            { "type": "paragraph", "content": [ { "type": "text", "text": "repository work" } ] }
                                        ]
                                    }
                                },
                                {
                                    "author": { "accountId": "someone-else" },
                                    "started": "2026-08-05T10:00:00.000+0000",
                                    "timeSpentSeconds": 600
                                }
                            ]
                        },
                        "comment": {
                            "comments": [
                                {
                                    "author": { "accountId": "acct-1" },
                                    "created": "2026-08-01T10:00:00.000+0000",
                                    "body": "too old"
                                },
                                {
                                    "author": { "accountId": "acct-1" },
                                    "created": "2026-08-05T11:00:00.000+0000",
                                    "body": "looks good"
                                }
                            ]
                        }
                    },
                    "changelog": {
                        "histories": [
                            {
                                "author": { "accountId": "acct-1" },
                                "created": "2026-08-06T08:00:00.000+0000",
                                "items": [
                                    { "field": "status", "fromString": "To Do", "toString": "In Progress" }
                                ]
                            }
                        ]
                    }
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_map_filters_author_and_window() {
        let context = map_search_response(fixture(), "acct-1", window(), Utc::now());

        assert_eq!(context.active_items.len(), 1);
        assert_eq!(context.active_items[0].key, "PROJ-1");
        assert_eq!(context.active_items[0].status, "In Progress");

        // Foreign-authored worklog dropped.
        assert_eq!(context.time_logs.len(), 1);
        assert_eq!(context.time_logs[0].seconds_spent, 5400);
        assert_eq!(context.time_logs[0].comment, "repository work");

        // The out-of-window comment dropped.
        assert_eq!(context.comments.len(), 1);
        assert_eq!(context.comments[0].body, "looks good");

        assert_eq!(context.field_changes.len(), 1);
        assert_eq!(context.field_changes[0].field, "status");
        assert_eq!(context.field_changes[0].from_value, "To Do");
    }

    #[test]
    fn test_map_for_other_user_keeps_only_active_items() {
        let context = map_search_response(fixture(), "nobody", window(), Utc::now());
        assert_eq!(context.active_items.len(), 1);
        assert!(context.time_logs.is_empty());
        assert!(context.comments.is_empty());
        assert!(context.field_changes.is_empty());
    }

    #[test]
    fn test_parse_jira_datetime_formats() {
        let compact = parse_jira_datetime("2026-08-05T10:00:00.000+0000").unwrap();
        let rfc3339 = parse_jira_datetime("2026-08-05T10:00:00+00:00").unwrap();
        assert_eq!(compact, rfc3339);
        assert!(parse_jira_datetime("yesterday").is_none());
    }

    #[test]
    fn test_document_text_flattens_nested_content() {
        let doc = json!({
            "type": "doc",
            "content": [
                { "type": "paragraph", "content": [
                    { "type": "text", "text": "first" },
                    { "type": "text", "text": "second" }
                ]}
            ]
        });
        assert_eq!(document_text(&doc), "first second");
        assert_eq!(document_text(&json!("plain string")), "plain string");
        assert_eq!(document_text(&json!(42)), "");
    }
}
