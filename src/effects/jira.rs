//! JIRA effect types.

use serde::{Deserialize, Serialize};

use crate::clients::{ApiError, Service};

/// A remote link attached to a JIRA issue, pointing at a GitHub review issue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteLink {
    /// Stable identifier; the review issue URL.
    pub global_id: String,
    pub title: String,
    pub url: String,
    pub resolved: bool,
    pub icon_url: String,
}

/// The subset of a JIRA issue the relay reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JiraIssue {
    pub key: String,
    /// Workflow status id.
    pub status_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JiraEffect {
    GetIssue { key: String },
    PerformTransition { key: String, transition_id: String },
    ListRemoteLinks { key: String },
    CreateRemoteLink { key: String, link: RemoteLink },
    /// Update the link with the same global id.
    UpdateRemoteLink { key: String, link: RemoteLink },
}

impl JiraEffect {
    pub fn operation(&self) -> &'static str {
        match self {
            JiraEffect::GetIssue { .. } => "issue.get",
            JiraEffect::PerformTransition { .. } => "issue.transition",
            JiraEffect::ListRemoteLinks { .. } => "remotelink.list",
            JiraEffect::CreateRemoteLink { .. } => "remotelink.create",
            JiraEffect::UpdateRemoteLink { .. } => "remotelink.update",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JiraResponse {
    Issue(JiraIssue),
    RemoteLinks(Vec<RemoteLink>),
    Ok,
}

impl JiraResponse {
    fn kind(&self) -> &'static str {
        match self {
            JiraResponse::Issue(_) => "issue",
            JiraResponse::RemoteLinks(_) => "remote links",
            JiraResponse::Ok => "ok",
        }
    }

    pub fn into_issue(self, operation: &'static str) -> Result<JiraIssue, ApiError> {
        match self {
            JiraResponse::Issue(issue) => Ok(issue),
            other => Err(ApiError::unexpected_response(
                Service::Jira,
                operation,
                other.kind(),
            )),
        }
    }

    pub fn into_remote_links(self, operation: &'static str) -> Result<Vec<RemoteLink>, ApiError> {
        match self {
            JiraResponse::RemoteLinks(links) => Ok(links),
            other => Err(ApiError::unexpected_response(
                Service::Jira,
                operation,
                other.kind(),
            )),
        }
    }
}
