//! JIRA as a story tracker.
//!
//! Every review issue becomes a remote link on the story. Closing a review
//! issue resolves its link; once no review link is left unresolved the story
//! is transitioned to reviewed.

use tracing::{info, warn};

use crate::clients::ApiError;
use crate::config::JiraConfig;
use crate::effects::{JiraEffect, JiraInterpreter, JiraIssue, RemoteLink};

use super::{BackendId, CloseOutcome, ReviewRequest, StoryLookupError};

const LINK_TITLE_PREFIX: &str = "Review issue #";

/// Returns true for keys shaped like `PROJ-12`.
pub fn is_issue_key(key: &str) -> bool {
    let Some((project, number)) = key.split_once('-') else {
        return false;
    };
    project.starts_with(|c: char| c.is_ascii_alphabetic())
        && project.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit())
}

fn link_title(rr: &ReviewRequest) -> String {
    format!("{}{}", LINK_TITLE_PREFIX, rr.id)
}

pub struct JiraTracker<'a, J> {
    jira: &'a J,
    config: &'a JiraConfig,
}

impl<'a, J: JiraInterpreter> JiraTracker<'a, J> {
    pub fn new(jira: &'a J, config: &'a JiraConfig) -> Self {
        Self { jira, config }
    }

    pub async fn find_story(&self, key: &str) -> Result<JiraStory<'a, J>, StoryLookupError> {
        let key = key.trim();
        if !is_issue_key(key) {
            return Err(StoryLookupError::MalformedKey {
                backend: BackendId::Jira,
                key: key.to_string(),
            });
        }

        let effect = JiraEffect::GetIssue {
            key: key.to_string(),
        };
        let operation = effect.operation();
        let issue = self.jira.interpret(effect).await?.into_issue(operation)?;

        Ok(JiraStory {
            jira: self.jira,
            config: self.config,
            issue,
        })
    }
}

pub struct JiraStory<'a, J> {
    jira: &'a J,
    config: &'a JiraConfig,
    issue: JiraIssue,
}

impl<J: JiraInterpreter> JiraStory<'_, J> {
    pub fn issue(&self) -> &JiraIssue {
        &self.issue
    }

    pub async fn on_review_request_opened(&mut self, rr: &ReviewRequest) -> Result<(), ApiError> {
        self.jira
            .interpret(JiraEffect::CreateRemoteLink {
                key: self.issue.key.clone(),
                link: self.link(rr, false),
            })
            .await?;
        info!(issue = %self.issue.key, review_issue = %rr.url, "Review link created");
        Ok(())
    }

    pub async fn on_review_request_closed(
        &mut self,
        rr: &ReviewRequest,
    ) -> Result<CloseOutcome, ApiError> {
        let links = self.list_links().await?;

        let (this, others): (Vec<&RemoteLink>, Vec<&RemoteLink>) =
            links.iter().partition(|link| self.is_link_for(link, rr));
        let all_resolved = others
            .iter()
            .filter(|link| link.title.starts_with(LINK_TITLE_PREFIX))
            .all(|link| link.resolved);

        if this.is_empty() {
            warn!(issue = %self.issue.key, review_issue = %rr.url, "Review link not found");
        } else if this.iter().all(|link| link.resolved) {
            info!(issue = %self.issue.key, review_issue = %rr.url, "Review link already resolved");
        } else {
            self.update_link(rr, true).await?;
        }

        if all_resolved {
            self.mark_as_reviewed().await?;
        }
        Ok(CloseOutcome::Settled)
    }

    pub async fn on_review_request_reopened(&mut self, rr: &ReviewRequest) -> Result<(), ApiError> {
        let links = self.list_links().await?;
        match links.iter().find(|link| self.is_link_for(link, rr)) {
            None => {
                warn!(issue = %self.issue.key, review_issue = %rr.url, "Review link not found");
            }
            Some(link) if !link.resolved => {}
            Some(_) => self.update_link(rr, false).await?,
        }
        Ok(())
    }

    pub async fn mark_as_reviewed(&mut self) -> Result<(), ApiError> {
        let status = self.issue.status_id.as_str();

        if status == self.config.being_implemented_status_id {
            info!(issue = %self.issue.key, "Story still being implemented, not marking as reviewed");
        } else if status == self.config.implemented_status_id {
            self.jira
                .interpret(JiraEffect::PerformTransition {
                    key: self.issue.key.clone(),
                    transition_id: self.config.mark_as_reviewed_transition_id.clone(),
                })
                .await?;
            info!(issue = %self.issue.key, "Story marked as reviewed");
        } else {
            warn!(
                issue = %self.issue.key,
                status,
                "Story is neither implemented nor being implemented, not marking as reviewed"
            );
        }
        Ok(())
    }

    fn link(&self, rr: &ReviewRequest, resolved: bool) -> RemoteLink {
        RemoteLink {
            global_id: rr.url.clone(),
            title: link_title(rr),
            url: rr.url.clone(),
            resolved,
            icon_url: if resolved {
                self.config.closed_icon_url.clone()
            } else {
                self.config.open_icon_url.clone()
            },
        }
    }

    fn is_link_for(&self, link: &RemoteLink, rr: &ReviewRequest) -> bool {
        link.global_id == rr.url || link.title == link_title(rr)
    }

    async fn list_links(&self) -> Result<Vec<RemoteLink>, ApiError> {
        let effect = JiraEffect::ListRemoteLinks {
            key: self.issue.key.clone(),
        };
        let operation = effect.operation();
        self.jira.interpret(effect).await?.into_remote_links(operation)
    }

    async fn update_link(&self, rr: &ReviewRequest, resolved: bool) -> Result<(), ApiError> {
        self.jira
            .interpret(JiraEffect::UpdateRemoteLink {
                key: self.issue.key.clone(),
                link: self.link(rr, resolved),
            })
            .await?;
        info!(issue = %self.issue.key, review_issue = %rr.url, resolved, "Review link updated");
        Ok(())
    }
}
