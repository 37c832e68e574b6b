//! Backend identifiers and tracker lookup.

use std::fmt;

use thiserror::Error;

use crate::config::Config;
use crate::effects::Backends;

use super::{GitHubIssuesTracker, JiraTracker, PivotalTracker, Tracker};

/// A supported issue tracker backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendId {
    GitHubIssues,
    Jira,
    PivotalTracker,
}

/// Identifier table, canonical names first. The display names are what older
/// review issues carry in their tracker tag.
const BACKENDS: &[(&str, BackendId)] = &[
    ("github", BackendId::GitHubIssues),
    ("jira", BackendId::Jira),
    ("pivotaltracker", BackendId::PivotalTracker),
    ("GitHub Issues", BackendId::GitHubIssues),
    ("JIRA", BackendId::Jira),
    ("Pivotal Tracker", BackendId::PivotalTracker),
];

impl BackendId {
    pub fn parse(id: &str) -> Option<Self> {
        let id = id.trim();
        BACKENDS
            .iter()
            .find(|(name, _)| *name == id)
            .map(|(_, backend)| *backend)
    }

    /// The identifier written into new review issues.
    pub fn as_str(self) -> &'static str {
        match self {
            BackendId::GitHubIssues => "github",
            BackendId::Jira => "jira",
            BackendId::PivotalTracker => "pivotaltracker",
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown issue tracker: {0:?}")]
pub struct UnknownBackendError(pub String);

/// Returns the tracker adapter registered under `id`.
pub fn get<'a, B: Backends>(
    id: &str,
    backends: &'a B,
    config: &'a Config,
) -> Result<Tracker<'a, B>, UnknownBackendError> {
    let backend = BackendId::parse(id).ok_or_else(|| UnknownBackendError(id.to_string()))?;

    Ok(match backend {
        BackendId::GitHubIssues => {
            Tracker::GitHubIssues(GitHubIssuesTracker::new(backends.github(), &config.github_issues))
        }
        BackendId::Jira => Tracker::Jira(JiraTracker::new(backends.jira(), &config.jira)),
        BackendId::PivotalTracker => {
            Tracker::PivotalTracker(PivotalTracker::new(backends.pivotal(), &config.pivotal))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::test_utils::{MockGitHub, backends};

    fn config() -> Config {
        Config::from_lookup(|name| (name == "RELAY_GITHUB_TOKEN").then(|| "t".to_string())).unwrap()
    }

    #[test]
    fn aliases_resolve_to_the_same_backend() {
        assert_eq!(BackendId::parse("github"), Some(BackendId::GitHubIssues));
        assert_eq!(BackendId::parse("GitHub Issues"), Some(BackendId::GitHubIssues));
        assert_eq!(BackendId::parse("jira"), Some(BackendId::Jira));
        assert_eq!(BackendId::parse("JIRA"), Some(BackendId::Jira));
        assert_eq!(BackendId::parse("pivotaltracker"), Some(BackendId::PivotalTracker));
        assert_eq!(BackendId::parse(" Pivotal Tracker "), Some(BackendId::PivotalTracker));
        assert_eq!(BackendId::parse("Jira"), None);
        assert_eq!(BackendId::parse("trello"), None);
    }

    #[test]
    fn canonical_names_round_trip() {
        for backend in [BackendId::GitHubIssues, BackendId::Jira, BackendId::PivotalTracker] {
            assert_eq!(BackendId::parse(backend.as_str()), Some(backend));
        }
    }

    #[test]
    fn get_selects_the_variant() {
        let backends = backends(MockGitHub::new());
        let config = config();

        for (id, expected) in [
            ("github", BackendId::GitHubIssues),
            ("JIRA", BackendId::Jira),
            ("Pivotal Tracker", BackendId::PivotalTracker),
        ] {
            let tracker = get(id, &backends, &config).unwrap();
            assert_eq!(tracker.backend(), expected);
        }
    }

    #[test]
    fn unknown_backend_is_an_error() {
        let backends = backends(MockGitHub::new());
        let config = config();

        let err = get("trello", &backends, &config).err().unwrap();
        assert_eq!(err, UnknownBackendError("trello".into()));
    }
}
