//! Process configuration loaded once at startup.
//!
//! Everything is read from environment variables by [`Config::from_env`]. Tests
//! go through [`Config::from_lookup`] with a map instead of mutating the
//! process environment. Empty or whitespace-only values count as unset.

use anyhow::{Context, Result, bail};
use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub github: GitHubConfig,
    pub review: ReviewConfig,
    pub github_issues: GitHubIssuesConfig,
    pub jira: JiraConfig,
    pub pivotal: PivotalConfig,
}

/// Access to the GitHub repositories holding review issues.
#[derive(Clone)]
pub struct GitHubConfig {
    pub token: String,
    /// Secret for `X-Hub-Signature`; unset disables verification.
    pub webhook_secret: Option<String>,
}

impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("webhook_secret", &self.webhook_secret.is_some())
            .finish_non_exhaustive()
    }
}

/// Labels on review issues themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewConfig {
    /// Marks an issue as a review issue; also scopes commit searches.
    pub review_label: String,
    /// Required before a review issue may be closed.
    pub implemented_label: String,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        ReviewConfig {
            review_label: "review".into(),
            implemented_label: "implemented".into(),
        }
    }
}

/// Review and testing label names shared by the label-based trackers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewLabels {
    pub reviewed: String,
    pub skip_review: String,
    pub testing_passed: String,
    pub testing_failed: String,
    pub testing_skipped: String,
}

impl Default for ReviewLabels {
    fn default() -> Self {
        ReviewLabels {
            reviewed: "reviewed".into(),
            skip_review: "no review".into(),
            testing_passed: "qa+".into(),
            testing_failed: "qa-".into(),
            testing_skipped: "no qa".into(),
        }
    }
}

/// GitHub Issues used as the story tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubIssuesConfig {
    /// An issue with any of these labels is a story.
    pub story_labels: Vec<String>,
    pub approved_label: String,
    pub being_implemented_label: String,
    pub implemented_label: String,
    pub staged_label: String,
    pub rejected_label: String,
    pub review_labels: ReviewLabels,
}

impl Default for GitHubIssuesConfig {
    fn default() -> Self {
        GitHubIssuesConfig {
            story_labels: vec!["enhancement".into(), "bug".into()],
            approved_label: "approved".into(),
            being_implemented_label: "being implemented".into(),
            implemented_label: "implemented".into(),
            staged_label: "staged".into(),
            rejected_label: "rejected".into(),
            review_labels: ReviewLabels::default(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct JiraCredentials {
    pub base_url: String,
    pub username: String,
    pub api_token: String,
}

impl std::fmt::Debug for JiraCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraCredentials")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraConfig {
    pub credentials: Option<JiraCredentials>,
    pub being_implemented_status_id: String,
    pub implemented_status_id: String,
    pub mark_as_reviewed_transition_id: String,
    /// Icon for review links whose review issue is open.
    pub open_icon_url: String,
    /// Icon for review links whose review issue is closed.
    pub closed_icon_url: String,
}

impl Default for JiraConfig {
    fn default() -> Self {
        JiraConfig {
            credentials: None,
            being_implemented_status_id: "3".into(),
            implemented_status_id: "10000".into(),
            mark_as_reviewed_transition_id: "711".into(),
            open_icon_url:
                "https://raw.githubusercontent.com/github-archive/media/master/octocats/blacktocat-16.png"
                    .into(),
            closed_icon_url: "http://www.openwebgraphics.com/resources/data/47/accept.png".into(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct PivotalConfig {
    pub token: Option<String>,
    /// Shared secret expected in the activity webhook's `secret` query parameter.
    pub webhook_secret: Option<String>,
    pub review_labels: ReviewLabels,
}

impl Default for PivotalConfig {
    fn default() -> Self {
        PivotalConfig {
            token: None,
            webhook_secret: None,
            review_labels: ReviewLabels::default(),
        }
    }
}

impl std::fmt::Debug for PivotalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PivotalConfig")
            .field("token", &self.token.is_some())
            .field("webhook_secret", &self.webhook_secret.is_some())
            .field("review_labels", &self.review_labels)
            .finish()
    }
}

/// Named string values with required-vs-optional semantics.
struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|s| !s.trim().is_empty())
    }

    fn required(&self, name: &str) -> Result<String> {
        self.optional(name)
            .with_context(|| format!("{} environment variable is required", name))
    }

    fn or(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn review_labels(&self, prefix: &str) -> ReviewLabels {
        let d = ReviewLabels::default();
        ReviewLabels {
            reviewed: self.or(&format!("{prefix}_REVIEWED_LABEL"), &d.reviewed),
            skip_review: self.or(&format!("{prefix}_SKIP_REVIEW_LABEL"), &d.skip_review),
            testing_passed: self.or(&format!("{prefix}_TESTING_PASSED_LABEL"), &d.testing_passed),
            testing_failed: self.or(&format!("{prefix}_TESTING_FAILED_LABEL"), &d.testing_failed),
            testing_skipped: self.or(
                &format!("{prefix}_TESTING_SKIPPED_LABEL"),
                &d.testing_skipped,
            ),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars(lookup);

        let port = vars
            .or("PORT", "3000")
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let github = GitHubConfig {
            token: vars.required("RELAY_GITHUB_TOKEN")?,
            webhook_secret: vars.optional("RELAY_GITHUB_WEBHOOK_SECRET"),
        };

        let review_defaults = ReviewConfig::default();
        let review = ReviewConfig {
            review_label: vars.or("RELAY_REVIEW_LABEL", &review_defaults.review_label),
            implemented_label: vars.or(
                "RELAY_REVIEW_IMPLEMENTED_LABEL",
                &review_defaults.implemented_label,
            ),
        };

        let gh = GitHubIssuesConfig::default();
        let github_issues = GitHubIssuesConfig {
            story_labels: vars
                .optional("RELAY_GITHUB_STORY_LABELS")
                .map(|s| parse_list(&s))
                .unwrap_or(gh.story_labels),
            approved_label: vars.or("RELAY_GITHUB_APPROVED_LABEL", &gh.approved_label),
            being_implemented_label: vars.or(
                "RELAY_GITHUB_BEING_IMPLEMENTED_LABEL",
                &gh.being_implemented_label,
            ),
            implemented_label: vars.or("RELAY_GITHUB_IMPLEMENTED_LABEL", &gh.implemented_label),
            staged_label: vars.or("RELAY_GITHUB_STAGED_LABEL", &gh.staged_label),
            rejected_label: vars.or("RELAY_GITHUB_REJECTED_LABEL", &gh.rejected_label),
            review_labels: vars.review_labels("RELAY_GITHUB"),
        };

        let jd = JiraConfig::default();
        let jira = JiraConfig {
            credentials: jira_credentials(&vars)?,
            being_implemented_status_id: vars.or(
                "RELAY_JIRA_BEING_IMPLEMENTED_STATUS_ID",
                &jd.being_implemented_status_id,
            ),
            implemented_status_id: vars.or(
                "RELAY_JIRA_IMPLEMENTED_STATUS_ID",
                &jd.implemented_status_id,
            ),
            mark_as_reviewed_transition_id: vars.or(
                "RELAY_JIRA_MARK_AS_REVIEWED_TRANSITION_ID",
                &jd.mark_as_reviewed_transition_id,
            ),
            open_icon_url: vars.or("RELAY_JIRA_OPEN_ICON_URL", &jd.open_icon_url),
            closed_icon_url: vars.or("RELAY_JIRA_CLOSED_ICON_URL", &jd.closed_icon_url),
        };

        let pivotal = PivotalConfig {
            token: vars.optional("RELAY_PIVOTALTRACKER_TOKEN"),
            webhook_secret: vars.optional("RELAY_PIVOTALTRACKER_WEBHOOK_SECRET"),
            review_labels: vars.review_labels("RELAY_PIVOTALTRACKER"),
        };

        Ok(Config {
            port,
            github,
            review,
            github_issues,
            jira,
            pivotal,
        })
    }

    /// Logs non-fatal configuration gaps.
    pub fn log_warnings(&self) {
        if self.github.webhook_secret.is_none() {
            warn!("RELAY_GITHUB_WEBHOOK_SECRET is not set, GitHub webhook signatures will not be verified");
        }
        if self.pivotal.webhook_secret.is_none() {
            warn!("RELAY_PIVOTALTRACKER_WEBHOOK_SECRET is not set, Pivotal Tracker webhooks will not be authenticated");
        }
        if self.jira.credentials.is_none() {
            warn!("JIRA credentials are not set, stories tracked in JIRA cannot be updated");
        }
        if self.pivotal.token.is_none() {
            warn!("RELAY_PIVOTALTRACKER_TOKEN is not set, stories tracked in Pivotal Tracker cannot be updated");
        }
    }
}

fn jira_credentials<F: Fn(&str) -> Option<String>>(vars: &Vars<F>) -> Result<Option<JiraCredentials>> {
    let base_url = vars.optional("RELAY_JIRA_BASE_URL");
    let username = vars.optional("RELAY_JIRA_USERNAME");
    let api_token = vars.optional("RELAY_JIRA_API_TOKEN");

    match (base_url, username, api_token) {
        (Some(base_url), Some(username), Some(api_token)) => Ok(Some(JiraCredentials {
            base_url,
            username,
            api_token,
        })),
        (None, None, None) => Ok(None),
        _ => bail!(
            "RELAY_JIRA_BASE_URL, RELAY_JIRA_USERNAME and RELAY_JIRA_API_TOKEN must be set together"
        ),
    }
}

/// Splits a comma-separated list, dropping empty entries.
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
