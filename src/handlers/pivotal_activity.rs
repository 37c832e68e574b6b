//! Handler for Pivotal Tracker activity webhooks.
//!
//! A story moving to `rejected` goes back to development, so its review and
//! testing labels no longer apply and are dropped. Every change in the activity
//! is processed even if an earlier one failed; any failure fails the delivery.

use tracing::{debug, error, info};

use crate::clients::ApiError;
use crate::config::Config;
use crate::effects::{Backends, StoryState};
use crate::trackers::PivotalTracker;
use crate::webhooks::Activity;

use super::{HandlerError, Outcome};

pub async fn handle_activity<B: Backends>(
    backends: &B,
    config: &Config,
    activity: &Activity,
) -> Result<Outcome, HandlerError> {
    let tracker = PivotalTracker::new(backends.pivotal(), &config.pivotal);
    let project_id = activity.project.id;

    let mut pruned = 0;
    let mut first_error: Option<ApiError> = None;

    for change in &activity.changes {
        if change.new_story_state() != Some(StoryState::Rejected) {
            continue;
        }

        let result = async {
            let mut story = tracker.story(project_id, change.id).await?;
            story.prune_review_labels().await
        }
        .await;

        match result {
            Ok(()) => {
                info!(project = project_id, story = change.id, "Story rejected, review labels pruned");
                pruned += 1;
            }
            Err(e) => {
                error!(project = project_id, story = change.id, error = %e, "Failed to prune rejected story");
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e.into());
    }
    if pruned == 0 {
        debug!(project = project_id, "No rejected stories in activity");
        return Ok(Outcome::Ignored("no rejected stories"));
    }
    Ok(Outcome::Processed)
}
