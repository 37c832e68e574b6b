//! GitHub API effect types.
//!
//! These types describe the GitHub operations the relay needs as data. The
//! octocrab-backed interpreter in [`crate::clients`] executes them; tests use a
//! recording mock.

use serde::{Deserialize, Serialize};

use crate::clients::{ApiError, Service};
use crate::types::{IssueNumber, RepoId};

/// Open/closed state of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Open,
    Closed,
}

/// A GitHub API effect.
///
/// Unlike a repository-scoped client, effects name their repository: a story
/// issue tracked in GitHub may live in a different repository than the review
/// issue that points at it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitHubEffect {
    // ─── Issue Queries ────────────────────────────────────────────────────────
    /// Fetch a single issue.
    GetIssue { repo: RepoId, number: IssueNumber },

    /// Run an issue search query and return one page of results.
    SearchIssues {
        query: String,
        /// 1-based page index.
        page: u32,
        per_page: u8,
    },

    // ─── Issue Mutations ──────────────────────────────────────────────────────
    /// Edit an issue body and/or state. `None` fields are left untouched.
    EditIssue {
        repo: RepoId,
        number: IssueNumber,
        body: Option<String>,
        state: Option<IssueState>,
    },

    /// Replace the full label set of an issue.
    ReplaceLabels {
        repo: RepoId,
        number: IssueNumber,
        labels: Vec<String>,
    },

    // ─── Comments ─────────────────────────────────────────────────────────────
    /// Post a new comment on an issue.
    PostComment {
        repo: RepoId,
        number: IssueNumber,
        body: String,
    },
}

impl GitHubEffect {
    /// Short operation name used in logs and errors.
    pub fn operation(&self) -> &'static str {
        match self {
            GitHubEffect::GetIssue { .. } => "issues.get",
            GitHubEffect::SearchIssues { .. } => "search.issues",
            GitHubEffect::EditIssue { .. } => "issues.edit",
            GitHubEffect::ReplaceLabels { .. } => "issues.replace_labels",
            GitHubEffect::PostComment { .. } => "issues.create_comment",
        }
    }
}

// ─── Response Types ───────────────────────────────────────────────────────────

/// Issue data returned from the GitHub API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueData {
    pub number: IssueNumber,
    pub title: String,
    /// Empty when the issue has no body.
    pub body: String,
    pub labels: Vec<String>,
    pub state: IssueState,
    pub html_url: String,
}

impl IssueData {
    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l == name)
    }
}

/// One page of issue search results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Total number of results across all pages.
    pub total_count: u64,
    pub items: Vec<IssueData>,
}

/// Response from a GitHub effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitHubResponse {
    Issue(IssueData),
    SearchPage(SearchPage),
    /// The label set after a replacement.
    Labels(Vec<String>),
    /// The effect completed with nothing to report.
    Ok,
}

impl GitHubResponse {
    fn kind(&self) -> &'static str {
        match self {
            GitHubResponse::Issue(_) => "issue",
            GitHubResponse::SearchPage(_) => "search page",
            GitHubResponse::Labels(_) => "labels",
            GitHubResponse::Ok => "ok",
        }
    }

    pub fn into_issue(self, operation: &'static str) -> Result<IssueData, ApiError> {
        match self {
            GitHubResponse::Issue(issue) => Ok(issue),
            other => Err(ApiError::unexpected_response(
                Service::GitHub,
                operation,
                other.kind(),
            )),
        }
    }

    pub fn into_labels(self, operation: &'static str) -> Result<Vec<String>, ApiError> {
        match self {
            GitHubResponse::Labels(labels) => Ok(labels),
            other => Err(ApiError::unexpected_response(
                Service::GitHub,
                operation,
                other.kind(),
            )),
        }
    }

    pub fn into_search_page(self, operation: &'static str) -> Result<SearchPage, ApiError> {
        match self {
            GitHubResponse::SearchPage(page) => Ok(page),
            other => Err(ApiError::unexpected_response(
                Service::GitHub,
                operation,
                other.kind(),
            )),
        }
    }
}
