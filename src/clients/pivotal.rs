//! Pivotal Tracker effect interpreter using the v5 REST API.

use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::effects::{
    PivotalEffect, PivotalInterpreter, PivotalResponse, StoryData, StoryState, StoryUpdate,
};

use super::error::{ApiError, Service};

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://www.pivotaltracker.com/services/v5";

/// A Pivotal Tracker client authenticated with an API token.
#[derive(Clone)]
pub struct PivotalClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl PivotalClient {
    pub fn new(http: Client, token: Option<String>) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL, token)
    }

    pub fn with_base_url(http: Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            token,
        }
    }

    fn story_url(&self, project_id: u64, story_id: u64) -> String {
        format!(
            "{}/projects/{}/stories/{}",
            self.base_url.trim_end_matches('/'),
            project_id,
            story_id
        )
    }

    async fn send(&self, operation: &'static str, request: RequestBuilder) -> Result<Response, ApiError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| ApiError::not_configured(Service::PivotalTracker, operation))?;

        let response = request
            .header("X-TrackerToken", token)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(Service::PivotalTracker, operation, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::status(
                Service::PivotalTracker,
                operation,
                status.as_u16(),
                body,
            ));
        }
        Ok(response)
    }
}

impl std::fmt::Debug for PivotalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PivotalClient")
            .field("base_url", &self.base_url)
            .field("configured", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl PivotalInterpreter for PivotalClient {
    async fn interpret(&self, effect: PivotalEffect) -> Result<PivotalResponse, ApiError> {
        let operation = effect.operation();
        debug!(operation, "Executing Pivotal Tracker effect");

        match effect {
            PivotalEffect::GetStory {
                project_id,
                story_id,
            } => {
                let url = self.story_url(project_id, story_id);
                let response = self.send(operation, self.http.get(url)).await?;
                let raw: RawStory = response
                    .json()
                    .await
                    .map_err(|e| ApiError::from_reqwest(Service::PivotalTracker, operation, e))?;
                Ok(PivotalResponse::Story(raw.into_story(project_id)))
            }
            PivotalEffect::UpdateStory {
                project_id,
                story_id,
                update,
            } => {
                let url = self.story_url(project_id, story_id);
                let payload = RawStoryUpdate::from(update);
                self.send(operation, self.http.put(url).json(&payload)).await?;
                Ok(PivotalResponse::Ok)
            }
            PivotalEffect::AddComment {
                project_id,
                story_id,
                text,
            } => {
                let url = format!("{}/comments", self.story_url(project_id, story_id));
                self.send(operation, self.http.post(url).json(&RawComment { text }))
                    .await?;
                Ok(PivotalResponse::Ok)
            }
        }
    }
}

// ─── Wire Types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawStory {
    id: u64,
    current_state: StoryState,
    #[serde(default)]
    labels: Vec<RawLabel>,
}

impl RawStory {
    fn into_story(self, project_id: u64) -> StoryData {
        StoryData {
            project_id,
            story_id: self.id,
            state: self.current_state,
            labels: self.labels.into_iter().map(|l| l.name).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RawLabel {
    name: String,
}

#[derive(Debug, Serialize)]
struct RawStoryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    current_state: Option<StoryState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<Vec<RawLabel>>,
}

impl From<StoryUpdate> for RawStoryUpdate {
    fn from(update: StoryUpdate) -> Self {
        RawStoryUpdate {
            current_state: update.current_state,
            labels: update
                .labels
                .map(|labels| labels.into_iter().map(|name| RawLabel { name }).collect()),
        }
    }
}

#[derive(Debug, Serialize)]
struct RawComment {
    text: String,
}
