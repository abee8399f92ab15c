//! Jira webhook payload parser.
//!
//! Turns the raw body of a Jira issue webhook into a [`bridge::IssueEvent`].
//! The parser is the only place that knows Jira's JSON layout; the renderer in
//! [`bridge`] only ever sees the normalized event.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Wire formats and field extraction live here. Nothing in
//! this crate decides where or whether an event is delivered.
//!
//! ## Fields read
//!
//! | Event field | Payload path |
//! |-------------|--------------|
//! | `event_type` | `webhookEvent` |
//! | `actor` | `user.name` |
//! | `actor_avatar_url` | `user.avatarUrls["24x24"]` |
//! | `issue_id` | `issue.id` (required) |
//! | `issue_url` | `issue.self` |
//! | `summary` | `issue.fields.summary` |
//! | `project` | `issue.fields.project.name` (required) |
//! | `changes` | `changelog.items[].field` → `changelog.items[].toString` (array required) |

use std::collections::BTreeMap;

use bridge::{IssueEvent, IssueId, ParseError, ProjectKey};

mod payload;

use payload::WebhookPayload;

/// Avatar size the message header links to.
const AVATAR_SIZE: &str = "24x24";

/// Parses a Jira issue webhook body.
///
/// # Errors
///
/// - [`ParseError::InvalidPayload`] if the body is not JSON of the expected shape.
/// - [`ParseError::MissingField`] if `changelog.items`, `issue.id`, or
///   `issue.fields.project.name` is absent or empty.
pub fn parse_issue_event(body: &[u8]) -> Result<IssueEvent, ParseError> {
    let payload: WebhookPayload =
        serde_json::from_slice(body).map_err(|e| ParseError::InvalidPayload {
            message: e.to_string(),
        })?;

    let items = payload
        .changelog
        .and_then(|c| c.items)
        .ok_or(ParseError::MissingField {
            field: "changelog.items",
        })?;
    let issue_id = IssueId::new(payload.issue.id).ok_or(ParseError::MissingField {
        field: "issue.id",
    })?;
    let project =
        ProjectKey::new(&payload.issue.fields.project.name).ok_or(ParseError::MissingField {
            field: "issue.fields.project.name",
        })?;

    let changes: BTreeMap<String, String> = items
        .into_iter()
        .map(|item| (item.field, item.to_value.unwrap_or_default()))
        .collect();

    let actor_avatar_url = payload
        .user
        .avatar_urls
        .get(AVATAR_SIZE)
        .cloned()
        .unwrap_or_default();

    let event = IssueEvent {
        event_type: payload.webhook_event,
        actor: payload.user.name,
        actor_avatar_url,
        issue_id,
        issue_url: payload.issue.self_url,
        summary: payload.issue.fields.summary,
        project,
        changes,
    };
    tracing::debug!(
        event_type = %event.event_type,
        issue_id = %event.issue_id,
        project = %event.project,
        changes = event.changes.len(),
        "Parsed Jira webhook"
    );
    Ok(event)
}
