//! Pivotal Tracker activity webhook payloads.
//!
//! Tracker posts one activity per user action, listing every resource the
//! action changed. Only the fields the relay reads are decoded.

use serde::Deserialize;

use crate::effects::StoryState;

use super::parser::ParseError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Activity {
    pub project: ActivityProject,
    #[serde(default)]
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ActivityProject {
    pub id: u64,
}

/// One changed resource.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Change {
    /// Resource kind, e.g. `story`, `comment` or `label`.
    pub kind: String,
    pub id: u64,
    #[serde(default)]
    pub new_values: ChangeValues,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChangeValues {
    /// Raw state name; not every resource kind has one.
    pub current_state: Option<String>,
}

impl Change {
    /// The state a story moved into, if this change is a story state change.
    pub fn new_story_state(&self) -> Option<StoryState> {
        if self.kind != "story" {
            return None;
        }
        let state = self.new_values.current_state.as_deref()?;
        serde_json::from_value(serde_json::Value::String(state.to_string())).ok()
    }
}

pub fn parse_activity(payload: &[u8]) -> Result<Activity, ParseError> {
    Ok(serde_json::from_slice(payload)?)
}
