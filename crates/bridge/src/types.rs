//! Shared value types for the bridge domain.
//!
//! [`IssueEvent`] is what the payload parser produces and the dispatcher
//! consumes. [`Outcome`] is what a dispatch unit publishes and the collector
//! consumes. [`MessageEnvelope`] is the JSON body posted to Mattermost.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EndpointUrl, IssueId, ProjectKey, SubmissionId};

// ---------------------------------------------------------------------------
// Event model
// ---------------------------------------------------------------------------

/// A normalized Jira issue notification.
///
/// Built once per inbound request and never mutated afterwards; the dispatcher
/// takes it by value into the dispatch unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEvent {
    /// Webhook event kind, e.g. `"jira:issue_updated"`.
    pub event_type: String,

    /// Display name of the user who performed the action.
    pub actor: String,

    /// Avatar image URL of the actor (may be empty).
    pub actor_avatar_url: String,

    /// Issue the notification is about.
    pub issue_id: IssueId,

    /// Link to the issue.
    pub issue_url: String,

    /// Issue summary text.
    pub summary: String,

    /// Project the issue belongs to; selects the route.
    pub project: ProjectKey,

    /// Changed field name mapped to its new value.
    pub changes: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Delivery envelope
// ---------------------------------------------------------------------------

/// Sender name and icon placed in every message the bridge posts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryIdentity {
    /// Display name the message is posted under.
    pub username: String,

    /// URL of the icon shown next to the message.
    pub icon_url: String,
}

/// JSON body of a Mattermost incoming-webhook request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub icon_url: String,
    pub username: String,
    pub text: String,
}

impl MessageEnvelope {
    /// Wraps rendered text with the configured sender identity.
    pub fn new(identity: &DeliveryIdentity, text: String) -> Self {
        Self {
            icon_url: identity.icon_url.clone(),
            username: identity.username.clone(),
            text,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Terminal category of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    /// The destination answered. Any HTTP status, including non-2xx.
    Delivered,
    /// No route exists for the event's project. No request was sent.
    NotMapped,
    /// The message template could not be filled in.
    RenderFailed,
    /// The POST could not be completed (connection, DNS, timeout).
    TransportFailed,
}

impl StatusCategory {
    /// Stable label used as the `result` component of counter keys.
    pub fn as_str(self) -> &'static str {
        match self {
            StatusCategory::Delivered => "delivered",
            StatusCategory::NotMapped => "not_mapped",
            StatusCategory::RenderFailed => "render_failed",
            StatusCategory::TransportFailed => "transport_failed",
        }
    }

    /// Numeric code earlier bridge versions logged for bridge-side failures.
    pub fn legacy_code(self) -> Option<u16> {
        match self {
            StatusCategory::NotMapped => Some(1002),
            StatusCategory::RenderFailed => Some(1003),
            StatusCategory::Delivered | StatusCategory::TransportFailed => None,
        }
    }
}

impl std::fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one delivery attempt, published exactly once per submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Dispatch unit that produced this outcome.
    pub submission: SubmissionId,

    /// Project of the submitted event.
    pub project: ProjectKey,

    /// Issue of the submitted event.
    pub issue_id: IssueId,

    /// Resolved destination. Empty when routing failed or never ran.
    pub endpoint: String,

    /// Terminal category.
    pub status: StatusCategory,

    /// HTTP status returned by the destination. Zero unless `Delivered`.
    pub http_status: u16,

    /// Failure description. Empty unless the category is a failure.
    pub error_detail: String,

    /// When the dispatch unit finished.
    pub completed_at: Timestamp,
}

impl Outcome {
    /// Returns `true` for a delivery the destination acknowledged with 200.
    pub fn is_ok(&self) -> bool {
        self.status == StatusCategory::Delivered && self.http_status == 200
    }
}

/// Correlation keys of a submission, from which its [`Outcome`] is built.
///
/// Each constructor consumes the correlation, so a dispatch unit holding one
/// can produce at most one outcome from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    pub submission: SubmissionId,
    pub project: ProjectKey,
    pub issue_id: IssueId,
}

impl Correlation {
    /// Creates correlation keys for a fresh submission of `event`.
    pub fn for_event(event: &IssueEvent) -> Self {
        Self {
            submission: SubmissionId::new_random(),
            project: event.project.clone(),
            issue_id: event.issue_id.clone(),
        }
    }

    /// The destination answered with `http_status`.
    pub fn delivered(self, endpoint: &EndpointUrl, http_status: u16) -> Outcome {
        self.finish(endpoint.to_string(), StatusCategory::Delivered, http_status, String::new())
    }

    /// No route exists for the project.
    pub fn not_mapped(self) -> Outcome {
        let detail = format!("project '{}' is not mapped", self.project);
        self.finish(String::new(), StatusCategory::NotMapped, 0, detail)
    }

    /// Rendering failed before routing.
    pub fn render_failed(self, detail: impl Into<String>) -> Outcome {
        self.finish(String::new(), StatusCategory::RenderFailed, 0, detail.into())
    }

    /// The POST to `endpoint` failed at the transport level.
    ///
    /// `endpoint` is empty when the failure happened before a route was known.
    pub fn transport_failed(self, endpoint: impl Into<String>, detail: impl Into<String>) -> Outcome {
        self.finish(endpoint.into(), StatusCategory::TransportFailed, 0, detail.into())
    }

    fn finish(
        self,
        endpoint: String,
        status: StatusCategory,
        http_status: u16,
        error_detail: String,
    ) -> Outcome {
        Outcome {
            submission: self.submission,
            project: self.project,
            issue_id: self.issue_id,
            endpoint,
            status,
            http_status,
            error_detail,
            completed_at: Timestamp::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correlation() -> Correlation {
        Correlation {
            submission: SubmissionId::new_random(),
            project: ProjectKey::new("abc").unwrap(),
            issue_id: IssueId::new("42").unwrap(),
        }
    }

    #[test]
    fn delivered_outcome_records_status_and_endpoint() {
        let endpoint = EndpointUrl::new("https://hooks.example/abc").unwrap();
        let outcome = correlation().delivered(&endpoint, 200);

        assert_eq!(outcome.status, StatusCategory::Delivered);
        assert_eq!(outcome.http_status, 200);
        assert_eq!(outcome.endpoint, "https://hooks.example/abc");
        assert!(outcome.error_detail.is_empty());
        assert!(outcome.is_ok());
    }

    #[test]
    fn non_200_delivery_is_still_delivered_but_not_ok() {
        let endpoint = EndpointUrl::new("https://hooks.example/abc").unwrap();
        let outcome = correlation().delivered(&endpoint, 503);

        assert_eq!(outcome.status, StatusCategory::Delivered);
        assert!(!outcome.is_ok());
    }

    #[test]
    fn not_mapped_outcome_has_no_endpoint() {
        let outcome = correlation().not_mapped();

        assert_eq!(outcome.status, StatusCategory::NotMapped);
        assert!(outcome.endpoint.is_empty());
        assert_eq!(outcome.http_status, 0);
        assert!(outcome.error_detail.contains("abc"));
    }

    #[test]
    fn envelope_serializes_with_mattermost_field_names() {
        let identity = DeliveryIdentity {
            username: "jira".to_string(),
            icon_url: "https://icons.example/jira.png".to_string(),
        };
        let envelope = MessageEnvelope::new(&identity, "hello".to_string());

        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "icon_url": "https://icons.example/jira.png",
                "username": "jira",
                "text": "hello",
            })
        );
    }

    #[test]
    fn legacy_codes_cover_bridge_side_failures_only() {
        assert_eq!(StatusCategory::NotMapped.legacy_code(), Some(1002));
        assert_eq!(StatusCategory::RenderFailed.legacy_code(), Some(1003));
        assert_eq!(StatusCategory::Delivered.legacy_code(), None);
        assert_eq!(StatusCategory::TransportFailed.legacy_code(), None);
    }
}
