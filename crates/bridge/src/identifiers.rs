//! Newtype domain identifiers.
//!
//! Every concept that has an identity is a distinct newtype wrapping a
//! primitive. This prevents accidentally passing an [`IssueId`] where a
//! [`ProjectKey`] is expected even though both are strings underneath.
//!
//! [`ProjectKey`] and [`EndpointUrl`] normalize or validate on construction, so
//! a value of either type is always usable for routing without further checks.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::BridgeError;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — Jira-assigned
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a Jira issue (the numeric `issue.id` of the payload, kept as text).
    IssueId
}

/// A Jira project key, normalized to lower case.
///
/// The same normalization is applied when the route table is loaded and when
/// an event is parsed, so `"ABC"`, `"abc"` and `" Abc "` all compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct ProjectKey(String);

impl ProjectKey {
    /// Creates a normalized project key.
    ///
    /// Surrounding whitespace is trimmed and the key is lower-cased. Returns
    /// `None` if nothing remains.
    pub fn new(value: impl AsRef<str>) -> Option<Self> {
        let normalized = value.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    /// Returns the normalized key.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProjectKey {
    type Error = BridgeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
            .ok_or_else(|| BridgeError::configuration(format!("project key '{value}' is blank")))
    }
}

impl std::fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Absolute `http` or `https` URL of a Mattermost incoming webhook.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct EndpointUrl(String);

impl EndpointUrl {
    /// Creates an endpoint URL, returning `None` unless `value` starts with
    /// `http://` or `https://` followed by a non-empty host.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let v = value.into();
        let rest = v
            .strip_prefix("https://")
            .or_else(|| v.strip_prefix("http://"))?;
        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() || v.chars().any(char::is_whitespace) {
            None
        } else {
            Some(Self(v))
        }
    }

    /// Returns the URL as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EndpointUrl {
    type Error = BridgeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value.clone()).ok_or_else(|| {
            BridgeError::configuration(format!("'{value}' is not an absolute http(s) URL"))
        })
    }
}

impl std::fmt::Display for EndpointUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies one dispatch unit (one call to `Dispatcher::submit`).
///
/// Generated fresh for every submission; carried on the dispatch span and on
/// the resulting outcome so the log records of a single delivery can be
/// correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(Uuid);

impl SubmissionId {
    /// Generates a new random submission identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a [`SubmissionId`] from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
