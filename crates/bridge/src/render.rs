//! Chat rendering of issue events.
//!
//! [`render`] is a pure function: the same [`IssueEvent`] always produces the
//! same text. Changes are emitted in field-name order because the event stores
//! them in a `BTreeMap`.

use std::fmt::Write;

use crate::{IssueEvent, RenderError};

/// Horizontal rule closing every message.
const FOOTER: &str =
    "-------------------------------------------------------------------------------";

/// Renders `event` as a Mattermost markdown message.
///
/// The message has a header naming the issue, an identity line naming the
/// actor and the action, the quoted summary, and one "Changes on" subsection
/// per changed field.
///
/// # Errors
///
/// Returns [`RenderError`] if formatting into the output buffer fails.
pub fn render(event: &IssueEvent) -> Result<String, RenderError> {
    let mut text = String::new();
    write_message(&mut text, event).map_err(|e| RenderError {
        message: e.to_string(),
    })?;
    Ok(text)
}

fn write_message(out: &mut String, event: &IssueEvent) -> std::fmt::Result {
    let id = &event.issue_id;

    writeln!(out, "@channel")?;
    writeln!(out, "# JIRA {id}")?;
    writeln!(
        out,
        "![avatar]({avatar}) **{actor}** has performed **{action}** on Jira [{id} ]({url}) from the project **{project}**.",
        avatar = event.actor_avatar_url,
        actor = event.actor,
        action = event.event_type,
        url = event.issue_url,
        project = event.project,
    )?;
    writeln!(out, "Summary of {id} is :")?;
    writeln!(out)?;
    writeln!(out, "\"{}\"", event.summary)?;
    writeln!(out)?;
    writeln!(out, "## Changes")?;
    for (field, value) in &event.changes {
        writeln!(out)?;
        writeln!(out, "### Changes on  {field}")?;
        writeln!(out, "{value}")?;
    }
    writeln!(out)?;
    writeln!(out, "{FOOTER}")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{IssueId, ProjectKey};

    fn sample_event() -> IssueEvent {
        IssueEvent {
            event_type: "jira:issue_updated".to_string(),
            actor: "alice".to_string(),
            actor_avatar_url: "https://avatars.example/alice.png".to_string(),
            issue_id: IssueId::new("42").unwrap(),
            issue_url: "https://jira.example/rest/api/2/issue/42".to_string(),
            summary: "fix bug".to_string(),
            project: ProjectKey::new("abc").unwrap(),
            changes: BTreeMap::from([("status".to_string(), "Done".to_string())]),
        }
    }

    #[test]
    fn renders_header_identity_summary_and_changes() {
        let text = render(&sample_event()).unwrap();

        assert!(text.starts_with("@channel\n# JIRA 42\n"));
        assert!(text.contains(
            "![avatar](https://avatars.example/alice.png) **alice** has performed \
             **jira:issue_updated** on Jira [42 ](https://jira.example/rest/api/2/issue/42) \
             from the project **abc**."
        ));
        assert!(text.contains("\"fix bug\""));
        assert!(text.contains("## Changes\n\n### Changes on  status\nDone\n"));
        assert!(text.ends_with(&format!("{FOOTER}\n")));
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut event = sample_event();
        event.changes.insert("assignee".to_string(), "bob".to_string());
        event.changes.insert("priority".to_string(), "High".to_string());

        let first = render(&event).unwrap();
        let second = render(&event).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn each_change_renders_field_then_value() {
        let mut event = sample_event();
        event.changes.insert("assignee".to_string(), "bob".to_string());

        let text = render(&event).unwrap();
        let assignee = text.find("### Changes on  assignee\nbob\n").unwrap();
        let status = text.find("### Changes on  status\nDone\n").unwrap();
        assert!(assignee < status);
    }

    #[test]
    fn event_without_changes_still_renders_section_header() {
        let mut event = sample_event();
        event.changes.clear();

        let text = render(&event).unwrap();
        assert!(text.contains("## Changes\n\n---"));
        assert!(!text.contains("### Changes on"));
    }
}
