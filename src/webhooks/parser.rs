//! GitHub webhook payload parser.
//!
//! Parses raw webhook JSON into typed [`GitHubEvent`] values. Unknown fields are
//! ignored; missing required fields are errors.
//!
//! # Headers
//!
//! GitHub webhooks include these headers:
//! - `X-GitHub-Event` - Event type (e.g., "commit_comment")
//! - `X-Hub-Signature` - HMAC-SHA1 signature (verified elsewhere)

use serde::Deserialize;
use thiserror::Error;

use crate::effects::IssueState;
use crate::types::{IssueNumber, RepoId, Sha};

use super::events::{
    CommentAction, CommitCommentEvent, GitHubEvent, IssueCommentEvent, IssueRef, IssuesAction,
    IssuesEvent, PushCommit, PushEvent,
};
use super::router::EventKind;

/// Error type for webhook parsing failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON deserialization failed (includes missing required fields).
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Field has invalid value (e.g., unknown action).
    #[error("invalid field value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Parses a webhook payload into a typed event.
///
/// # Returns
///
/// * `Ok(Some(event))` - Successfully parsed a known event type
/// * `Ok(None)` - Unknown event type (ignored, not an error)
/// * `Err(e)` - Malformed payload or missing required fields
///
/// # Examples
///
/// ```
/// use review_relay::webhooks::parse_webhook;
///
/// let payload = br#"{
///     "action": "created",
///     "comment": {
///         "html_url": "https://github.com/acme/shop/commit/1a2b3c4#commitcomment-1",
///         "commit_id": "1a2b3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d",
///         "body": "!blocker payment race condition",
///         "user": { "login": "octocat" }
///     },
///     "repository": {
///         "owner": { "login": "acme" },
///         "name": "shop"
///     }
/// }"#;
///
/// let result = parse_webhook("commit_comment", payload);
/// assert!(matches!(result, Ok(Some(_))));
/// ```
pub fn parse_webhook(event_type: &str, payload: &[u8]) -> Result<Option<GitHubEvent>, ParseError> {
    EventKind::from_header(event_type)
        .map(|kind| parse_event(kind, payload))
        .transpose()
}

/// Parses a payload whose event type is already known.
pub fn parse_event(kind: EventKind, payload: &[u8]) -> Result<GitHubEvent, ParseError> {
    match kind {
        EventKind::Issues => parse_issues(payload).map(GitHubEvent::Issues),
        EventKind::IssueComment => parse_issue_comment(payload).map(GitHubEvent::IssueComment),
        EventKind::CommitComment => parse_commit_comment(payload).map(GitHubEvent::CommitComment),
        EventKind::Push => parse_push(payload).map(GitHubEvent::Push),
    }
}

// ============================================================================
// Raw payload structures for deserialization
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawRepository {
    owner: RawOwner,
    name: String,
}

/// Push payloads name the owner with `name`, all others with `login`.
#[derive(Debug, Deserialize)]
struct RawOwner {
    login: Option<String>,
    name: Option<String>,
}

impl RawRepository {
    fn into_repo_id(self) -> Result<RepoId, ParseError> {
        let owner = self
            .owner
            .login
            .or(self.owner.name)
            .ok_or(ParseError::InvalidField {
                field: "repository.owner",
                value: String::new(),
            })?;
        Ok(RepoId::new(owner, self.name))
    }
}

#[derive(Debug, Deserialize)]
struct RawUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    number: u64,
    title: String,
    state: IssueState,
    html_url: String,
}

impl From<RawIssue> for IssueRef {
    fn from(raw: RawIssue) -> Self {
        IssueRef {
            number: IssueNumber(raw.number),
            title: raw.title,
            state: raw.state,
            html_url: raw.html_url,
        }
    }
}

fn parse_comment_action(action: &str) -> Result<CommentAction, ParseError> {
    match action {
        "created" => Ok(CommentAction::Created),
        "edited" => Ok(CommentAction::Edited),
        "deleted" => Ok(CommentAction::Deleted),
        other => Err(ParseError::InvalidField {
            field: "action",
            value: other.to_string(),
        }),
    }
}

// ============================================================================
// issues event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawIssuesPayload {
    action: String,
    issue: RawIssue,
    repository: RawRepository,
    sender: RawUser,
}

fn parse_issues(payload: &[u8]) -> Result<IssuesEvent, ParseError> {
    let raw: RawIssuesPayload = serde_json::from_slice(payload)?;

    Ok(IssuesEvent {
        repo: raw.repository.into_repo_id()?,
        action: IssuesAction::parse(&raw.action),
        issue: raw.issue.into(),
        sender: raw.sender.login,
    })
}

// ============================================================================
// issue_comment event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawIssueCommentPayload {
    action: String,
    comment: RawIssueComment,
    issue: RawIssue,
    repository: RawRepository,
}

#[derive(Debug, Deserialize)]
struct RawIssueComment {
    body: Option<String>,
    user: RawUser,
}

fn parse_issue_comment(payload: &[u8]) -> Result<IssueCommentEvent, ParseError> {
    let raw: RawIssueCommentPayload = serde_json::from_slice(payload)?;

    Ok(IssueCommentEvent {
        repo: raw.repository.into_repo_id()?,
        action: parse_comment_action(&raw.action)?,
        issue: raw.issue.into(),
        body: raw.comment.body.unwrap_or_default(),
        author: raw.comment.user.login,
    })
}

// ============================================================================
// commit_comment event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawCommitCommentPayload {
    action: String,
    comment: RawCommitComment,
    repository: RawRepository,
}

#[derive(Debug, Deserialize)]
struct RawCommitComment {
    html_url: String,
    commit_id: String,
    body: Option<String>,
    user: RawUser,
}

fn parse_commit_comment(payload: &[u8]) -> Result<CommitCommentEvent, ParseError> {
    let raw: RawCommitCommentPayload = serde_json::from_slice(payload)?;

    if !is_full_sha(&raw.comment.commit_id) {
        return Err(ParseError::InvalidField {
            field: "comment.commit_id",
            value: raw.comment.commit_id,
        });
    }

    Ok(CommitCommentEvent {
        repo: raw.repository.into_repo_id()?,
        action: parse_comment_action(&raw.action)?,
        commit_sha: Sha::new(raw.comment.commit_id),
        html_url: raw.comment.html_url,
        body: raw.comment.body.unwrap_or_default(),
        author: raw.comment.user.login,
    })
}

// ============================================================================
// push event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawPushPayload {
    #[serde(default)]
    commits: Vec<RawPushCommit>,
    repository: RawRepository,
}

#[derive(Debug, Deserialize)]
struct RawPushCommit {
    id: String,
    message: String,
    author: RawCommitAuthor,
}

#[derive(Debug, Deserialize)]
struct RawCommitAuthor {
    name: String,
}

fn parse_push(payload: &[u8]) -> Result<PushEvent, ParseError> {
    let raw: RawPushPayload = serde_json::from_slice(payload)?;

    let commits = raw
        .commits
        .into_iter()
        .map(|c| {
            if !is_full_sha(&c.id) {
                return Err(ParseError::InvalidField {
                    field: "commits.id",
                    value: c.id,
                });
            }
            Ok(PushCommit {
                sha: Sha::new(c.id),
                message: c.message,
                author_name: c.author.name,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PushEvent {
        repo: raw.repository.into_repo_id()?,
        commits,
    })
}

fn is_full_sha(s: &str) -> bool {
    s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit())
}
