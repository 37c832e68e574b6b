//! JIRA effect interpreter using the REST API v2.

use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::JiraCredentials;
use crate::effects::{JiraEffect, JiraInterpreter, JiraIssue, JiraResponse, RemoteLink};

use super::error::{ApiError, Service};

/// A JIRA client authenticated with basic auth (user + API token).
///
/// Without credentials every call fails with a not-configured error, so a
/// deployment that never references JIRA does not need them.
#[derive(Clone)]
pub struct JiraClient {
    http: Client,
    credentials: Option<JiraCredentials>,
}

impl JiraClient {
    pub fn new(http: Client, credentials: Option<JiraCredentials>) -> Self {
        Self { http, credentials }
    }

    fn credentials(&self, operation: &'static str) -> Result<&JiraCredentials, ApiError> {
        self.credentials
            .as_ref()
            .ok_or_else(|| ApiError::not_configured(Service::Jira, operation))
    }

    fn issue_url(&self, operation: &'static str, key: &str, suffix: &str) -> Result<String, ApiError> {
        let base = self.credentials(operation)?.base_url.trim_end_matches('/');
        Ok(format!("{}/rest/api/2/issue/{}{}", base, key, suffix))
    }

    async fn send(&self, operation: &'static str, request: RequestBuilder) -> Result<Response, ApiError> {
        let credentials = self.credentials(operation)?;
        let response = request
            .basic_auth(&credentials.username, Some(&credentials.api_token))
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(Service::Jira, operation, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::status(Service::Jira, operation, status.as_u16(), body));
        }
        Ok(response)
    }
}

impl std::fmt::Debug for JiraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraClient")
            .field("configured", &self.credentials.is_some())
            .finish_non_exhaustive()
    }
}

impl JiraInterpreter for JiraClient {
    async fn interpret(&self, effect: JiraEffect) -> Result<JiraResponse, ApiError> {
        let operation = effect.operation();
        debug!(operation, "Executing JIRA effect");

        match effect {
            JiraEffect::GetIssue { key } => {
                let url = self.issue_url(operation, &key, "?fields=status")?;
                let raw: RawIssue = json(operation, self.send(operation, self.http.get(url)).await?).await?;
                Ok(JiraResponse::Issue(JiraIssue {
                    key: raw.key,
                    status_id: raw.fields.status.id,
                }))
            }
            JiraEffect::PerformTransition { key, transition_id } => {
                let url = self.issue_url(operation, &key, "/transitions")?;
                let payload = TransitionRequest {
                    transition: TransitionId { id: transition_id },
                };
                self.send(operation, self.http.post(url).json(&payload)).await?;
                Ok(JiraResponse::Ok)
            }
            JiraEffect::ListRemoteLinks { key } => {
                let url = self.issue_url(operation, &key, "/remotelink")?;
                let raw: Vec<RawRemoteLink> =
                    json(operation, self.send(operation, self.http.get(url)).await?).await?;
                Ok(JiraResponse::RemoteLinks(
                    raw.into_iter().map(RemoteLink::from).collect(),
                ))
            }
            // JIRA creates or updates a remote link by its global id.
            JiraEffect::CreateRemoteLink { key, link } | JiraEffect::UpdateRemoteLink { key, link } => {
                let url = self.issue_url(operation, &key, "/remotelink")?;
                let payload = RawRemoteLink::from(link);
                self.send(operation, self.http.post(url).json(&payload)).await?;
                Ok(JiraResponse::Ok)
            }
        }
    }
}

async fn json<T: for<'de> Deserialize<'de>>(
    operation: &'static str,
    response: Response,
) -> Result<T, ApiError> {
    response
        .json()
        .await
        .map_err(|e| ApiError::from_reqwest(Service::Jira, operation, e))
}

// ─── Wire Types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawIssue {
    key: String,
    fields: RawIssueFields,
}

#[derive(Debug, Deserialize)]
struct RawIssueFields {
    status: RawStatus,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    id: String,
}

#[derive(Debug, Serialize)]
struct TransitionRequest {
    transition: TransitionId,
}

#[derive(Debug, Serialize)]
struct TransitionId {
    id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRemoteLink {
    #[serde(default)]
    global_id: String,
    object: RawRemoteObject,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawRemoteObject {
    url: String,
    title: String,
    #[serde(default)]
    icon: RawIcon,
    #[serde(default)]
    status: RawLinkStatus,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawIcon {
    #[serde(rename = "url16x16", default)]
    url: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawLinkStatus {
    #[serde(default)]
    resolved: bool,
}

impl From<RawRemoteLink> for RemoteLink {
    fn from(raw: RawRemoteLink) -> Self {
        RemoteLink {
            global_id: raw.global_id,
            title: raw.object.title,
            url: raw.object.url,
            resolved: raw.object.status.resolved,
            icon_url: raw.object.icon.url,
        }
    }
}

impl From<RemoteLink> for RawRemoteLink {
    fn from(link: RemoteLink) -> Self {
        RawRemoteLink {
            global_id: link.global_id,
            object: RawRemoteObject {
                url: link.url,
                title: link.title,
                icon: RawIcon { url: link.icon_url },
                status: RawLinkStatus {
                    resolved: link.resolved,
                },
            },
        }
    }
}
