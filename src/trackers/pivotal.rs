//! Pivotal Tracker as a story tracker.
//!
//! Story progress is the story state plus review and testing labels. Both
//! directions of the review lifecycle put the story back into `finished`
//! unless it has already moved past it.

use tracing::{debug, info};

use crate::clients::ApiError;
use crate::config::PivotalConfig;
use crate::effects::{PivotalEffect, PivotalInterpreter, StoryData, StoryState, StoryUpdate};

use super::labels::{WorkflowLabelSet, best_testing_label, replace_workflow_labels, same_labels};
use super::{BackendId, CloseOutcome, ReviewRequest, StoryLookupError, opened_comment};

/// Parses `<project id>/stories/<story id>`.
pub fn parse_story_key(key: &str) -> Option<(u64, u64)> {
    let (project, story) = key.trim().split_once("/stories/")?;
    Some((project.parse().ok()?, story.parse().ok()?))
}

pub struct PivotalTracker<'a, P> {
    pivotal: &'a P,
    config: &'a PivotalConfig,
}

impl<'a, P: PivotalInterpreter> PivotalTracker<'a, P> {
    pub fn new(pivotal: &'a P, config: &'a PivotalConfig) -> Self {
        Self { pivotal, config }
    }

    pub async fn find_story(&self, key: &str) -> Result<PivotalStory<'a, P>, StoryLookupError> {
        let (project_id, story_id) =
            parse_story_key(key).ok_or_else(|| StoryLookupError::MalformedKey {
                backend: BackendId::PivotalTracker,
                key: key.to_string(),
            })?;
        Ok(self.story(project_id, story_id).await?)
    }

    pub async fn story(&self, project_id: u64, story_id: u64) -> Result<PivotalStory<'a, P>, ApiError> {
        let effect = PivotalEffect::GetStory {
            project_id,
            story_id,
        };
        let operation = effect.operation();
        let story = self.pivotal.interpret(effect).await?.into_story(operation)?;

        Ok(PivotalStory {
            pivotal: self.pivotal,
            config: self.config,
            story,
        })
    }
}

pub struct PivotalStory<'a, P> {
    pivotal: &'a P,
    config: &'a PivotalConfig,
    story: StoryData,
}

impl<P: PivotalInterpreter> PivotalStory<'_, P> {
    pub fn story(&self) -> &StoryData {
        &self.story
    }

    pub async fn on_review_request_opened(&mut self, rr: &ReviewRequest) -> Result<(), ApiError> {
        self.pivotal
            .interpret(PivotalEffect::AddComment {
                project_id: self.story.project_id,
                story_id: self.story.story_id,
                text: opened_comment(rr),
            })
            .await?;
        Ok(())
    }

    pub async fn on_review_request_closed(
        &mut self,
        _rr: &ReviewRequest,
    ) -> Result<CloseOutcome, ApiError> {
        Ok(CloseOutcome::NeedsReview)
    }

    pub async fn on_review_request_reopened(&mut self, _rr: &ReviewRequest) -> Result<(), ApiError> {
        self.reset(&[]).await
    }

    pub async fn mark_as_reviewed(&mut self) -> Result<(), ApiError> {
        let reviewed = self.config.review_labels.reviewed.clone();
        self.reset(&[&reviewed]).await
    }

    /// Drops every review and testing label, as after the story was rejected.
    pub async fn prune_review_labels(&mut self) -> Result<(), ApiError> {
        let owned = WorkflowLabelSet::for_review(&self.config.review_labels);
        let labels = replace_workflow_labels(&self.story.labels, &owned, &[], &[]);
        self.update(StoryUpdate {
            current_state: None,
            labels: Some(labels),
        })
        .await
    }

    /// Moves the story back to `finished` with the review labels replaced by
    /// `add` and the best testing outcome.
    async fn reset(&mut self, add: &[&str]) -> Result<(), ApiError> {
        let owned = WorkflowLabelSet::for_review(&self.config.review_labels);
        let testing = best_testing_label(&self.story.labels, &self.config.review_labels);
        let keep: Vec<&str> = testing.into_iter().collect();
        let labels = replace_workflow_labels(&self.story.labels, &owned, add, &keep);

        let state = (!self.story.state.is_finished_or_later()).then_some(StoryState::Finished);
        self.update(StoryUpdate {
            current_state: state,
            labels: Some(labels),
        })
        .await
    }

    /// Sends the fields of `update` that differ from the current story.
    async fn update(&mut self, mut update: StoryUpdate) -> Result<(), ApiError> {
        if update.current_state == Some(self.story.state) {
            update.current_state = None;
        }
        if update
            .labels
            .as_ref()
            .is_some_and(|labels| same_labels(labels, &self.story.labels))
        {
            update.labels = None;
        }
        if update.is_empty() {
            debug!(story = self.story.story_id, "Story already up to date");
            return Ok(());
        }

        let effect = PivotalEffect::UpdateStory {
            project_id: self.story.project_id,
            story_id: self.story.story_id,
            update: update.clone(),
        };
        self.pivotal.interpret(effect).await?;

        if let Some(state) = update.current_state {
            self.story.state = state;
        }
        if let Some(labels) = update.labels {
            self.story.labels = labels;
        }
        info!(
            project = self.story.project_id,
            story = self.story.story_id,
            state = ?self.story.state,
            "Story updated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockPivotal;

    fn rr() -> ReviewRequest {
        ReviewRequest {
            id: "12".into(),
            url: "https://github.com/acme/shop/issues/12".into(),
        }
    }

    fn pivotal_with(state: StoryState, labels: &[&str]) -> MockPivotal {
        MockPivotal::new().with_story(StoryData {
            project_id: 100,
            story_id: 200,
            state,
            labels: labels.iter().map(|l| l.to_string()).collect(),
        })
    }

    async fn story<'a>(pivotal: &'a MockPivotal, config: &'a PivotalConfig) -> PivotalStory<'a, MockPivotal> {
        PivotalTracker::new(pivotal, config)
            .find_story("100/stories/200")
            .await
            .unwrap()
    }

    fn updates(pivotal: &MockPivotal) -> Vec<StoryUpdate> {
        pivotal
            .calls()
            .into_iter()
            .filter_map(|e| match e {
                PivotalEffect::UpdateStory { update, .. } => Some(update),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn story_keys() {
        assert_eq!(parse_story_key("100/stories/200"), Some((100, 200)));
        assert_eq!(parse_story_key("200"), None);
        assert_eq!(parse_story_key("x/stories/200"), None);
    }

    #[tokio::test]
    async fn opened_comments_on_story() {
        let pivotal = pivotal_with(StoryState::Finished, &[]);
        let config = PivotalConfig::default();

        story(&pivotal, &config)
            .await
            .on_review_request_opened(&rr())
            .await
            .unwrap();

        assert!(pivotal.calls().contains(&PivotalEffect::AddComment {
            project_id: 100,
            story_id: 200,
            text: "Review request [#12](https://github.com/acme/shop/issues/12) opened.".into(),
        }));
    }

    #[tokio::test]
    async fn mark_as_reviewed_from_started() {
        let pivotal = pivotal_with(StoryState::Started, &["api", "qa-"]);
        let config = PivotalConfig::default();

        story(&pivotal, &config).await.mark_as_reviewed().await.unwrap();

        assert_eq!(
            updates(&pivotal),
            vec![StoryUpdate {
                current_state: Some(StoryState::Finished),
                labels: Some(vec!["api".into(), "reviewed".into()]),
            }]
        );
    }

    #[tokio::test]
    async fn mark_as_reviewed_keeps_later_states() {
        for state in [StoryState::Finished, StoryState::Delivered, StoryState::Accepted] {
            let pivotal = pivotal_with(state, &["qa+"]);
            let config = PivotalConfig::default();

            story(&pivotal, &config).await.mark_as_reviewed().await.unwrap();

            assert_eq!(pivotal.story(100, 200).unwrap().state, state);
            assert_eq!(pivotal.story(100, 200).unwrap().labels, vec!["qa+", "reviewed"]);
        }
    }

    #[tokio::test]
    async fn earlier_states_reset_to_finished() {
        for state in [
            StoryState::Unscheduled,
            StoryState::Planned,
            StoryState::Unstarted,
            StoryState::Started,
            StoryState::Rejected,
        ] {
            let pivotal = pivotal_with(state, &[]);
            let config = PivotalConfig::default();

            story(&pivotal, &config)
                .await
                .on_review_request_reopened(&rr())
                .await
                .unwrap();

            assert_eq!(pivotal.story(100, 200).unwrap().state, StoryState::Finished);
        }
    }

    #[tokio::test]
    async fn reopened_prunes_review_labels_and_keeps_testing() {
        let pivotal = pivotal_with(StoryState::Delivered, &["reviewed", "no review", "qa-", "no qa", "api"]);
        let config = PivotalConfig::default();

        story(&pivotal, &config)
            .await
            .on_review_request_reopened(&rr())
            .await
            .unwrap();

        assert_eq!(
            updates(&pivotal),
            vec![StoryUpdate {
                current_state: None,
                labels: Some(vec!["no qa".into(), "api".into()]),
            }]
        );
    }

    #[tokio::test]
    async fn unchanged_story_is_not_updated() {
        let pivotal = pivotal_with(StoryState::Finished, &["reviewed"]);
        let config = PivotalConfig::default();

        story(&pivotal, &config).await.mark_as_reviewed().await.unwrap();

        assert!(updates(&pivotal).is_empty());
    }

    #[tokio::test]
    async fn prune_drops_all_review_labels() {
        let pivotal = pivotal_with(StoryState::Rejected, &["reviewed", "qa+", "api"]);
        let config = PivotalConfig::default();

        story(&pivotal, &config).await.prune_review_labels().await.unwrap();

        assert_eq!(pivotal.story(100, 200).unwrap().labels, vec!["api"]);
        assert_eq!(pivotal.story(100, 200).unwrap().state, StoryState::Rejected);
    }
}
