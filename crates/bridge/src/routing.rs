//! Project → endpoint routing.
//!
//! The route table is built once from configuration and is read-only
//! afterwards, so it can be shared between dispatch units behind an `Arc`
//! without locking. Keys go through [`ProjectKey::new`] at load time, and
//! events carry a [`ProjectKey`] built the same way, which makes lookups
//! case-insensitive on both sides.

use std::collections::HashMap;

use crate::{BridgeError, EndpointUrl, ProjectKey};

/// Immutable mapping from project key to Mattermost webhook URL.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<ProjectKey, EndpointUrl>,
}

impl RouteTable {
    /// Creates an empty table. Every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from raw `project → url` configuration entries.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ConfigurationError`] when a key is blank, a URL
    /// is not an absolute `http`/`https` URL, or two keys differ only in case.
    pub fn from_hooks<I, K, V>(hooks: I) -> Result<Self, BridgeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut routes = HashMap::new();
        for (raw_key, raw_url) in hooks {
            let raw_key = raw_key.as_ref();
            let key = ProjectKey::new(raw_key).ok_or_else(|| {
                BridgeError::configuration(format!("hook key '{raw_key}' is blank"))
            })?;
            let url = EndpointUrl::new(raw_url.as_ref()).ok_or_else(|| {
                BridgeError::configuration(format!(
                    "hook for project '{key}' is not an absolute http(s) URL: '{}'",
                    raw_url.as_ref()
                ))
            })?;
            tracing::debug!(project = %key, endpoint = %url, "Route registered");
            if routes.insert(key.clone(), url).is_some() {
                return Err(BridgeError::configuration(format!(
                    "project '{key}' is mapped more than once (keys are case-insensitive)"
                )));
            }
        }
        Ok(Self { routes })
    }

    /// Looks up the endpoint for `project`.
    ///
    /// `None` is an expected answer; the dispatcher turns it into a
    /// `NotMapped` outcome.
    pub fn resolve(&self, project: &ProjectKey) -> Option<&EndpointUrl> {
        self.routes.get(project)
    }

    /// Number of mapped projects.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no project is mapped.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Mapped project keys in sorted order.
    pub fn projects(&self) -> Vec<&ProjectKey> {
        let mut keys: Vec<_> = self.routes.keys().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(raw: &str) -> ProjectKey {
        ProjectKey::new(raw).unwrap()
    }

    #[test]
    fn lower_case_entry_matches_upper_case_event() {
        let table = RouteTable::from_hooks([("abc", "https://hooks.example/abc")]).unwrap();

        let endpoint = table.resolve(&key("ABC")).unwrap();
        assert_eq!(endpoint.as_str(), "https://hooks.example/abc");
    }

    #[test]
    fn upper_case_entry_matches_lower_case_event() {
        let table = RouteTable::from_hooks([("ABC", "https://hooks.example/abc")]).unwrap();

        assert!(table.resolve(&key("abc")).is_some());
        assert!(table.resolve(&key("Abc")).is_some());
    }

    #[test]
    fn deserialized_event_project_matches_lower_case_route() {
        let table = RouteTable::from_hooks([("abc", "https://hooks.example/abc")]).unwrap();

        let project: ProjectKey = serde_json::from_str("\"ABC\"").unwrap();

        assert!(table.resolve(&project).is_some());
    }

    #[test]
    fn unknown_project_is_reported_absent() {
        let table = RouteTable::from_hooks([("abc", "https://hooks.example/abc")]).unwrap();

        assert!(table.resolve(&key("xyz")).is_none());
        assert!(RouteTable::new().resolve(&key("abc")).is_none());
    }

    #[test]
    fn keys_colliding_after_normalization_are_rejected() {
        let err = RouteTable::from_hooks([
            ("abc", "https://hooks.example/1"),
            ("ABC", "https://hooks.example/2"),
        ])
        .unwrap_err();

        assert!(matches!(err, BridgeError::ConfigurationError { .. }));
    }

    #[test]
    fn invalid_urls_and_blank_keys_are_rejected() {
        assert!(RouteTable::from_hooks([("abc", "not a url")]).is_err());
        assert!(RouteTable::from_hooks([(" ", "https://hooks.example/abc")]).is_err());
    }

    #[test]
    fn projects_are_listed_sorted() {
        let table = RouteTable::from_hooks([
            ("ZED", "https://hooks.example/z"),
            ("abc", "https://hooks.example/a"),
        ])
        .unwrap();

        let projects: Vec<&str> = table.projects().into_iter().map(ProjectKey::as_str).collect();
        assert_eq!(projects, ["abc", "zed"]);
        assert_eq!(table.len(), 2);
    }
}
