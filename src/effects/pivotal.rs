//! Pivotal Tracker effect types.

use serde::{Deserialize, Serialize};

use crate::clients::{ApiError, Service};

/// Story workflow state as named by the Pivotal Tracker API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryState {
    Unscheduled,
    Planned,
    Unstarted,
    Started,
    Finished,
    Delivered,
    Accepted,
    Rejected,
}

impl StoryState {
    /// States at or past `finished`, which review transitions leave alone.
    pub fn is_finished_or_later(self) -> bool {
        matches!(
            self,
            StoryState::Finished | StoryState::Delivered | StoryState::Accepted
        )
    }
}

/// The subset of a story the relay reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryData {
    pub project_id: u64,
    pub story_id: u64,
    pub state: StoryState,
    pub labels: Vec<String>,
}

/// Fields to change on a story. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoryUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state: Option<StoryState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

impl StoryUpdate {
    pub fn is_empty(&self) -> bool {
        self.current_state.is_none() && self.labels.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PivotalEffect {
    GetStory {
        project_id: u64,
        story_id: u64,
    },
    UpdateStory {
        project_id: u64,
        story_id: u64,
        update: StoryUpdate,
    },
    AddComment {
        project_id: u64,
        story_id: u64,
        text: String,
    },
}

impl PivotalEffect {
    pub fn operation(&self) -> &'static str {
        match self {
            PivotalEffect::GetStory { .. } => "stories.get",
            PivotalEffect::UpdateStory { .. } => "stories.update",
            PivotalEffect::AddComment { .. } => "comments.create",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PivotalResponse {
    Story(StoryData),
    Ok,
}

impl PivotalResponse {
    pub fn into_story(self, operation: &'static str) -> Result<StoryData, ApiError> {
        match self {
            PivotalResponse::Story(story) => Ok(story),
            PivotalResponse::Ok => Err(ApiError::unexpected_response(
                Service::PivotalTracker,
                operation,
                "ok",
            )),
        }
    }
}
