//! GitHub Issues as a story tracker.
//!
//! Story state is a set of labels on the story issue. Review closure does not
//! move the story by itself: the caller marks it as reviewed.

use tracing::{debug, info};

use crate::clients::ApiError;
use crate::config::GitHubIssuesConfig;
use crate::effects::{GitHubEffect, GitHubInterpreter, IssueData};
use crate::types::{IssueNumber, RepoId};

use super::labels::{WorkflowLabelSet, best_testing_label, replace_workflow_labels, same_labels};
use super::{BackendId, CloseOutcome, ReviewRequest, StoryLookupError, opened_comment};

/// Parses `owner/repo#number`.
pub fn parse_story_key(key: &str) -> Option<(RepoId, IssueNumber)> {
    let (repo, number) = key.trim().split_once('#')?;
    let number: u64 = number.parse().ok().filter(|n| *n > 0)?;
    Some((RepoId::parse(repo)?, IssueNumber(number)))
}

pub struct GitHubIssuesTracker<'a, G> {
    github: &'a G,
    config: &'a GitHubIssuesConfig,
}

impl<'a, G: GitHubInterpreter> GitHubIssuesTracker<'a, G> {
    pub fn new(github: &'a G, config: &'a GitHubIssuesConfig) -> Self {
        Self { github, config }
    }

    pub async fn find_story(&self, key: &str) -> Result<GitHubStory<'a, G>, StoryLookupError> {
        let (repo, number) =
            parse_story_key(key).ok_or_else(|| StoryLookupError::MalformedKey {
                backend: BackendId::GitHubIssues,
                key: key.to_string(),
            })?;

        let effect = GitHubEffect::GetIssue {
            repo: repo.clone(),
            number,
        };
        let operation = effect.operation();
        let issue = self.github.interpret(effect).await?.into_issue(operation)?;

        Ok(GitHubStory {
            github: self.github,
            config: self.config,
            repo,
            issue,
        })
    }
}

pub struct GitHubStory<'a, G> {
    github: &'a G,
    config: &'a GitHubIssuesConfig,
    repo: RepoId,
    issue: IssueData,
}

impl<G: GitHubInterpreter> GitHubStory<'_, G> {
    pub fn issue(&self) -> &IssueData {
        &self.issue
    }

    pub async fn on_review_request_opened(&mut self, rr: &ReviewRequest) -> Result<(), ApiError> {
        self.github
            .interpret(GitHubEffect::PostComment {
                repo: self.repo.clone(),
                number: self.issue.number,
                body: opened_comment(rr),
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
        let label = self.config.being_implemented_label.clone();
        self.set_state_label(&label).await
    }

    pub async fn mark_as_reviewed(&mut self) -> Result<(), ApiError> {
        let label = self.config.review_labels.reviewed.clone();
        self.set_state_label(&label).await
    }

    /// Replaces the workflow labels with `state`, carrying over the testing
    /// outcome.
    async fn set_state_label(&mut self, state: &str) -> Result<(), ApiError> {
        let owned = WorkflowLabelSet::for_github_issues(self.config);
        let testing = best_testing_label(&self.issue.labels, &self.config.review_labels);
        let keep: Vec<&str> = testing.into_iter().collect();

        let changed = replace_issue_labels(
            self.github,
            &self.repo,
            &mut self.issue,
            &owned,
            &[state],
            &keep,
        )
        .await?;
        if changed {
            info!(repo = %self.repo, issue = %self.issue.number, state, "Story state label set");
        }
        Ok(())
    }
}

/// Rewrites the workflow labels of an issue, skipping the call when nothing
/// would change. Returns whether the labels were replaced.
pub async fn replace_issue_labels<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    issue: &mut IssueData,
    owned: &WorkflowLabelSet,
    add: &[&str],
    keep: &[&str],
) -> Result<bool, ApiError> {
    let labels = replace_workflow_labels(&issue.labels, owned, add, keep);
    if same_labels(&labels, &issue.labels) {
        debug!(repo = %repo, issue = %issue.number, "Workflow labels already up to date");
        return Ok(false);
    }

    let effect = GitHubEffect::ReplaceLabels {
        repo: repo.clone(),
        number: issue.number,
        labels,
    };
    let operation = effect.operation();
    issue.labels = github.interpret(effect).await?.into_labels(operation)?;
    Ok(true)
}
