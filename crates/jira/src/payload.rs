//! Wire shape of the Jira issue webhook, reduced to the fields the bridge reads.
//!
//! Every string field defaults to empty when absent, which matches how Jira
//! omits fields it has no value for. Required-ness is decided in
//! [`crate::parse_issue_event`], not here.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WebhookPayload {
    #[serde(default)]
    pub webhook_event: String,
    #[serde(default)]
    pub user: User,
    #[serde(default)]
    pub issue: Issue,
    pub changelog: Option<Changelog>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct User {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar_urls: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Issue {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "self", default)]
    pub self_url: String,
    #[serde(default)]
    pub fields: IssueFields,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct IssueFields {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub project: Project,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Project {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Changelog {
    pub items: Option<Vec<ChangeItem>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChangeItem {
    #[serde(default)]
    pub field: String,
    #[serde(rename = "toString", default)]
    pub to_value: Option<String>,
}

/// Jira sends `issue.id` as a string; some proxies re-encode it as a number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => text,
        Some(Raw::Number(n)) => n.to_string(),
        None => String::new(),
    })
}
