//! Issue tracker adapters.
//!
//! Each backend keeps the story behind a review issue in step with the review
//! lifecycle:
//!
//! - [`github_issues`] uses GitHub issues and state labels
//! - [`jira`] attaches one remote link per review issue and transitions the
//!   story once every link is resolved
//! - [`pivotal`] moves the story state and its review/testing labels
//!
//! Backends are a closed set. [`Tracker`] and [`Story`] are tagged unions over
//! them, each variant borrowing its client and configuration for the duration
//! of one webhook request. [`registry::get`] picks the variant.
//!
//! Every operation is idempotent: webhooks are redelivered, and replaying a
//! transition must leave the story where the first delivery left it.

pub mod github_issues;
pub mod jira;
pub mod labels;
pub mod pivotal;
pub mod registry;

use thiserror::Error;

use crate::clients::ApiError;
use crate::effects::{Backends, IssueData};

pub use github_issues::{GitHubIssuesTracker, GitHubStory};
pub use jira::{JiraStory, JiraTracker};
pub use labels::{WorkflowLabelSet, best_testing_label, replace_workflow_labels};
pub use pivotal::{PivotalStory, PivotalTracker};
pub use registry::{BackendId, UnknownBackendError};

/// The review issue driving a lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    /// The review issue number, without `#`.
    pub id: String,
    pub url: String,
}

impl ReviewRequest {
    pub fn from_issue(issue: &IssueData) -> Self {
        ReviewRequest {
            id: issue.number.0.to_string(),
            url: issue.html_url.clone(),
        }
    }
}

/// What remains to be done after a review request was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// The tracker does not follow review closure itself; the caller marks the
    /// story as reviewed.
    NeedsReview,
    /// The tracker handled the closure, including any cascade.
    Settled,
}

#[derive(Debug, Error)]
pub enum StoryLookupError {
    #[error("malformed {backend} story key: {key:?}")]
    MalformedKey { backend: BackendId, key: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// A tracker adapter bound to one deployment's clients and configuration.
pub enum Tracker<'a, B: Backends> {
    GitHubIssues(GitHubIssuesTracker<'a, B::GitHub>),
    Jira(JiraTracker<'a, B::Jira>),
    PivotalTracker(PivotalTracker<'a, B::Pivotal>),
}

impl<'a, B: Backends> Tracker<'a, B> {
    pub fn backend(&self) -> BackendId {
        match self {
            Tracker::GitHubIssues(_) => BackendId::GitHubIssues,
            Tracker::Jira(_) => BackendId::Jira,
            Tracker::PivotalTracker(_) => BackendId::PivotalTracker,
        }
    }

    /// Fetches the story identified by a backend-specific key.
    pub async fn find_story(&self, key: &str) -> Result<Story<'a, B>, StoryLookupError> {
        Ok(match self {
            Tracker::GitHubIssues(t) => Story::GitHubIssues(t.find_story(key).await?),
            Tracker::Jira(t) => Story::Jira(t.find_story(key).await?),
            Tracker::PivotalTracker(t) => Story::PivotalTracker(t.find_story(key).await?),
        })
    }
}

/// A story fetched from its tracker.
pub enum Story<'a, B: Backends> {
    GitHubIssues(GitHubStory<'a, B::GitHub>),
    Jira(JiraStory<'a, B::Jira>),
    PivotalTracker(PivotalStory<'a, B::Pivotal>),
}

impl<B: Backends> Story<'_, B> {
    pub async fn on_review_request_opened(&mut self, rr: &ReviewRequest) -> Result<(), ApiError> {
        match self {
            Story::GitHubIssues(s) => s.on_review_request_opened(rr).await,
            Story::Jira(s) => s.on_review_request_opened(rr).await,
            Story::PivotalTracker(s) => s.on_review_request_opened(rr).await,
        }
    }

    pub async fn on_review_request_closed(
        &mut self,
        rr: &ReviewRequest,
    ) -> Result<CloseOutcome, ApiError> {
        match self {
            Story::GitHubIssues(s) => s.on_review_request_closed(rr).await,
            Story::Jira(s) => s.on_review_request_closed(rr).await,
            Story::PivotalTracker(s) => s.on_review_request_closed(rr).await,
        }
    }

    pub async fn on_review_request_reopened(&mut self, rr: &ReviewRequest) -> Result<(), ApiError> {
        match self {
            Story::GitHubIssues(s) => s.on_review_request_reopened(rr).await,
            Story::Jira(s) => s.on_review_request_reopened(rr).await,
            Story::PivotalTracker(s) => s.on_review_request_reopened(rr).await,
        }
    }

    pub async fn mark_as_reviewed(&mut self) -> Result<(), ApiError> {
        match self {
            Story::GitHubIssues(s) => s.mark_as_reviewed().await,
            Story::Jira(s) => s.mark_as_reviewed().await,
            Story::PivotalTracker(s) => s.mark_as_reviewed().await,
        }
    }
}

/// Comment announcing a new review request on trackers that take comments.
pub(crate) fn opened_comment(rr: &ReviewRequest) -> String {
    format!("Review request [#{}]({}) opened.", rr.id, rr.url)
}
