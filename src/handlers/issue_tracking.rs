//! Handler for GitHub Issues used as the story tracker.
//!
//! Story issues are the issues carrying one of the configured story labels.
//! Their workflow labels follow what people do to the issue directly:
//!
//! | Event | Behavior |
//! |-------|----------|
//! | `issues` closed | Drop every workflow label |
//! | `issues` reopened | Set `being implemented` |
//! | `issue_comment` created with `!reject` | Set `rejected` |

use tracing::{debug, info};

use crate::commands::{Command, parse_commands};
use crate::config::Config;
use crate::effects::{Backends, GitHubEffect, GitHubInterpreter};
use crate::trackers::WorkflowLabelSet;
use crate::trackers::github_issues::replace_issue_labels;
use crate::types::RepoId;
use crate::webhooks::{
    CommentAction, EventKind, GitHubEvent, IssueCommentEvent, IssueRef, IssuesAction, IssuesEvent,
    WebhookHandler,
};

use super::{HandlerError, Outcome};

pub struct IssueTrackingHandler<'a, B> {
    backends: &'a B,
    config: &'a Config,
}

impl<B: Backends> WebhookHandler for IssueTrackingHandler<'_, B> {
    const SUPPORTED_EVENTS: &'static [EventKind] = &[EventKind::Issues, EventKind::IssueComment];

    type Output = Outcome;
    type Error = HandlerError;

    async fn handle(&self, event: GitHubEvent) -> Result<Outcome, HandlerError> {
        match event {
            GitHubEvent::Issues(e) => self.on_issues(&e).await,
            GitHubEvent::IssueComment(e) => self.on_issue_comment(&e).await,
            GitHubEvent::CommitComment(_) | GitHubEvent::Push(_) => {
                Ok(Outcome::Ignored("unsupported event"))
            }
        }
    }
}

impl<'a, B: Backends> IssueTrackingHandler<'a, B> {
    pub fn new(backends: &'a B, config: &'a Config) -> Self {
        Self { backends, config }
    }

    async fn on_issues(&self, event: &IssuesEvent) -> Result<Outcome, HandlerError> {
        let labels = &self.config.github_issues;
        let add: &[&str] = match event.action {
            IssuesAction::Closed => &[],
            IssuesAction::Reopened => &[labels.being_implemented_label.as_str()],
            IssuesAction::Opened | IssuesAction::Other(_) => {
                return Ok(Outcome::Ignored("unsupported action"));
            }
        };
        self.set_workflow_labels(&event.repo, &event.issue, add).await
    }

    async fn on_issue_comment(&self, event: &IssueCommentEvent) -> Result<Outcome, HandlerError> {
        if event.action != CommentAction::Created {
            return Ok(Outcome::Ignored("unsupported action"));
        }
        if !parse_commands(&event.body).contains(&Command::Reject) {
            return Ok(Outcome::Ignored("no command"));
        }

        let rejected = self.config.github_issues.rejected_label.as_str();
        self.set_workflow_labels(&event.repo, &event.issue, &[rejected])
            .await
    }

    /// Replaces the workflow labels of a story issue with `add`.
    async fn set_workflow_labels(
        &self,
        repo: &RepoId,
        issue: &IssueRef,
        add: &[&str],
    ) -> Result<Outcome, HandlerError> {
        let github = self.backends.github();

        // Labels in the payload may be stale.
        debug!(repo = %repo, issue = %issue.number, "Re-fetching issue");
        let effect = GitHubEffect::GetIssue {
            repo: repo.clone(),
            number: issue.number,
        };
        let operation = effect.operation();
        let mut story = github.interpret(effect).await?.into_issue(operation)?;

        let config = &self.config.github_issues;
        if !config.story_labels.iter().any(|l| story.has_label(l)) {
            debug!(url = %story.html_url, "Not a story issue");
            return Ok(Outcome::Ignored("not a story issue"));
        }

        let owned = WorkflowLabelSet::for_github_issues(config);
        if !replace_issue_labels(github, repo, &mut story, &owned, add, &[]).await? {
            return Ok(Outcome::Ignored("labels up to date"));
        }

        info!(repo = %repo, issue = %story.number, labels = ?story.labels, "Story workflow labels replaced");
        Ok(Outcome::Processed)
    }
}
