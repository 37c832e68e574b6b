//! GitHub webhook event types.
//!
//! Typed representations of the webhook events the relay handles, carrying only
//! the fields it needs.
//!
//! - `issues` - review issue and story lifecycle (opened, closed, reopened)
//! - `issue_comment` - `!reject` on story issues
//! - `commit_comment` - `!blocker` / `!mustfix` on reviewed commits
//! - `push` - `!unblock` in commit messages

use crate::effects::IssueState;
use crate::types::{IssueNumber, RepoId, Sha};

use super::router::EventKind;

/// A parsed GitHub webhook event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitHubEvent {
    Issues(IssuesEvent),
    IssueComment(IssueCommentEvent),
    CommitComment(CommitCommentEvent),
    Push(PushEvent),
}

impl GitHubEvent {
    /// Returns the repository this event belongs to.
    pub fn repo_id(&self) -> &RepoId {
        match self {
            GitHubEvent::Issues(e) => &e.repo,
            GitHubEvent::IssueComment(e) => &e.repo,
            GitHubEvent::CommitComment(e) => &e.repo,
            GitHubEvent::Push(e) => &e.repo,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            GitHubEvent::Issues(_) => EventKind::Issues,
            GitHubEvent::IssueComment(_) => EventKind::IssueComment,
            GitHubEvent::CommitComment(_) => EventKind::CommitComment,
            GitHubEvent::Push(_) => EventKind::Push,
        }
    }
}

/// Action performed on an issue.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IssuesAction {
    Opened,
    Closed,
    Reopened,
    /// Labeling, assignment, edits and the rest; never acted upon.
    Other(String),
}

impl IssuesAction {
    pub fn parse(action: &str) -> Self {
        match action {
            "opened" => IssuesAction::Opened,
            "closed" => IssuesAction::Closed,
            "reopened" => IssuesAction::Reopened,
            other => IssuesAction::Other(other.to_string()),
        }
    }
}

/// An issue as it appears in the webhook payload.
///
/// Labels in the payload can lag behind the issue itself, so handlers
/// re-fetch the issue before trusting them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub number: IssueNumber,
    pub title: String,
    pub state: IssueState,
    pub html_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuesEvent {
    pub repo: RepoId,
    pub action: IssuesAction,
    pub issue: IssueRef,
    /// Login of the user who triggered the event.
    pub sender: String,
}

/// Action performed on a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentAction {
    Created,
    Edited,
    Deleted,
}

/// A comment on an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueCommentEvent {
    pub repo: RepoId,
    pub action: CommentAction,
    pub issue: IssueRef,
    pub body: String,
    pub author: String,
}

/// A comment on a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitCommentEvent {
    pub repo: RepoId,
    pub action: CommentAction,
    pub commit_sha: Sha,
    /// Link to the comment; review blockers point here.
    pub html_url: String,
    pub body: String,
    pub author: String,
}

/// A single commit in a push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushCommit {
    pub sha: Sha,
    pub message: String,
    pub author_name: String,
}

impl PushCommit {
    /// The first line of the commit message.
    pub fn title(&self) -> &str {
        self.message.lines().next().unwrap_or_default().trim_end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    pub repo: RepoId,
    pub commits: Vec<PushCommit>,
}
