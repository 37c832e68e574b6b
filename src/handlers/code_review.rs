//! Handler for the code review endpoint.
//!
//! Keeps review issues, and the stories behind them, in step with what
//! happens on GitHub:
//!
//! | Event | Behavior |
//! |-------|----------|
//! | `issues` opened/closed/reopened | Forward to the story's tracker |
//! | `commit_comment` | `!blocker` / `!mustfix` add review blockers |
//! | `push` | `!unblock <n>` marks blockers fixed |

use tracing::{debug, info, warn};

use crate::checklist::{ReviewIssue, decode, encode};
use crate::commands::{Command, parse_commands};
use crate::config::Config;
use crate::effects::{Backends, GitHubEffect, GitHubInterpreter, IssueData, IssueState};
use crate::resolver::{ResolveError, find_review_issue};
use crate::trackers::{CloseOutcome, ReviewRequest, registry};
use crate::types::{IssueNumber, RepoId};
use crate::webhooks::{
    CommentAction, CommitCommentEvent, EventKind, GitHubEvent, IssuesAction, IssuesEvent,
    PushCommit, PushEvent, WebhookHandler,
};

use super::{HandlerError, Outcome};

pub struct CodeReviewHandler<'a, B> {
    backends: &'a B,
    config: &'a Config,
}

impl<B: Backends> WebhookHandler for CodeReviewHandler<'_, B> {
    const SUPPORTED_EVENTS: &'static [EventKind] =
        &[EventKind::Issues, EventKind::CommitComment, EventKind::Push];

    type Output = Outcome;
    type Error = HandlerError;

    async fn handle(&self, event: GitHubEvent) -> Result<Outcome, HandlerError> {
        match event {
            GitHubEvent::Issues(e) => self.on_issues(&e).await,
            GitHubEvent::CommitComment(e) => self.on_commit_comment(&e).await,
            GitHubEvent::Push(e) => self.on_push(&e).await,
            GitHubEvent::IssueComment(_) => Ok(Outcome::Ignored("unsupported event")),
        }
    }
}

impl<'a, B: Backends> CodeReviewHandler<'a, B> {
    pub fn new(backends: &'a B, config: &'a Config) -> Self {
        Self { backends, config }
    }

    fn github(&self) -> &'a B::GitHub {
        self.backends.github()
    }

    // ─── issues ───────────────────────────────────────────────────────────────

    async fn on_issues(&self, event: &IssuesEvent) -> Result<Outcome, HandlerError> {
        if matches!(event.action, IssuesAction::Other(_)) {
            return Ok(Outcome::Ignored("unsupported action"));
        }

        // Labels in the payload may be stale.
        debug!(repo = %event.repo, issue = %event.issue.number, "Re-fetching issue");
        let issue = get_issue(self.github(), &event.repo, event.issue.number).await?;
        if !issue.has_label(&self.config.review.review_label) {
            debug!(url = %issue.html_url, "Not a review issue");
            return Ok(Outcome::Ignored("not a review issue"));
        }

        if event.action == IssuesAction::Closed
            && !issue.has_label(&self.config.review.implemented_label)
        {
            self.reject_close(event).await?;
            return Ok(Outcome::Processed);
        }

        let ReviewIssue::Story(review) = decode(&issue.title, &issue.body)? else {
            debug!(url = %issue.html_url, "Commit review issue, no story to update");
            return Ok(Outcome::Ignored("commit review issue"));
        };

        let tracker = registry::get(&review.tracker, self.backends, self.config)?;
        let mut story = tracker.find_story(&review.story_key).await?;
        let rr = ReviewRequest::from_issue(&issue);

        match event.action {
            IssuesAction::Opened => story.on_review_request_opened(&rr).await?,
            IssuesAction::Reopened => story.on_review_request_reopened(&rr).await?,
            IssuesAction::Closed => {
                if story.on_review_request_closed(&rr).await? == CloseOutcome::NeedsReview {
                    story.mark_as_reviewed().await?;
                }
            }
            IssuesAction::Other(_) => return Ok(Outcome::Ignored("unsupported action")),
        }

        info!(
            repo = %event.repo,
            issue = %issue.number,
            tracker = %tracker.backend(),
            story = %review.story_key,
            action = ?event.action,
            "Review request forwarded to tracker"
        );
        Ok(Outcome::Processed)
    }

    /// Reopens a review issue that was closed before its story was implemented.
    async fn reject_close(&self, event: &IssuesEvent) -> Result<(), HandlerError> {
        info!(
            repo = %event.repo,
            issue = %event.issue.number,
            "Reopening review issue, not implemented yet"
        );

        self.github()
            .interpret(GitHubEffect::EditIssue {
                repo: event.repo.clone(),
                number: event.issue.number,
                body: None,
                state: Some(IssueState::Open),
            })
            .await?;
        self.github()
            .interpret(GitHubEffect::PostComment {
                repo: event.repo.clone(),
                number: event.issue.number,
                body: reject_close_comment(
                    &event.sender,
                    event.issue.number,
                    &self.config.review.implemented_label,
                ),
            })
            .await?;
        Ok(())
    }

    // ─── commit_comment ───────────────────────────────────────────────────────

    async fn on_commit_comment(&self, event: &CommitCommentEvent) -> Result<Outcome, HandlerError> {
        if event.action != CommentAction::Created {
            return Ok(Outcome::Ignored("unsupported action"));
        }

        let summaries: Vec<String> = parse_commands(&event.body)
            .into_iter()
            .filter_map(|cmd| match cmd {
                Command::Blocker { summary } => Some(summary),
                _ => None,
            })
            .collect();
        if summaries.is_empty() {
            debug!(url = %event.html_url, "No blocker command in comment");
            return Ok(Outcome::Ignored("no command"));
        }

        let issue = find_review_issue(
            self.github(),
            &event.repo,
            &self.config.review.review_label,
            &event.commit_sha,
            None,
        )
        .await?;
        let mut review = decode(&issue.title, &issue.body)?;

        let mut added = Vec::new();
        for summary in &summaries {
            if review.add_review_blocker(event.html_url.as_str(), summary.as_str(), false)
                && let Some(blocker) = review.review_blocker_items().last()
            {
                added.push(blocker.number);
            }
        }
        if added.is_empty() {
            debug!(issue = %issue.number, url = %event.html_url, "Blockers already recorded");
            return Ok(Outcome::Ignored("duplicate blocker"));
        }

        // A new blocker reopens the review.
        self.github()
            .interpret(GitHubEffect::EditIssue {
                repo: event.repo.clone(),
                number: issue.number,
                body: Some(encode(&review)),
                state: Some(IssueState::Open),
            })
            .await?;
        info!(
            repo = %event.repo,
            issue = %issue.number,
            blockers = ?added,
            "Review blockers linked to review issue"
        );

        for number in added {
            let Some(blocker) = review.checklist().review_blocker(number) else {
                continue;
            };
            self.github()
                .interpret(GitHubEffect::PostComment {
                    repo: event.repo.clone(),
                    number: issue.number,
                    body: blocker_comment(
                        number,
                        &blocker.comment_url,
                        &event.author,
                        issue.number,
                        &blocker.summary,
                    ),
                })
                .await?;
        }
        Ok(Outcome::Processed)
    }

    // ─── push ─────────────────────────────────────────────────────────────────

    async fn on_push(&self, event: &PushEvent) -> Result<Outcome, HandlerError> {
        let mut unblocked = 0;
        for commit in &event.commits {
            for command in parse_commands(&commit.message) {
                if let Command::Unblock(number) = command
                    && self.unblock(&event.repo, commit, number).await?
                {
                    unblocked += 1;
                }
            }
        }

        if unblocked == 0 {
            Ok(Outcome::Ignored("nothing to unblock"))
        } else {
            Ok(Outcome::Processed)
        }
    }

    /// Marks blocker `number` fixed on the review issue listing `commit`.
    ///
    /// Returns whether the blocker was newly marked. Problems with a single
    /// command are logged and skipped so the rest of the push is processed;
    /// only downstream failures abort.
    async fn unblock(
        &self,
        repo: &RepoId,
        commit: &PushCommit,
        number: u32,
    ) -> Result<bool, HandlerError> {
        let issue = match find_review_issue(
            self.github(),
            repo,
            &self.config.review.review_label,
            &commit.sha,
            Some(commit.title()),
        )
        .await
        {
            Ok(issue) => issue,
            Err(ResolveError::Api(e)) => return Err(e.into()),
            Err(e) => {
                warn!(commit = %commit.sha, blocker = number, error = %e, "!unblock: review issue not resolved");
                return Ok(false);
            }
        };

        let mut review = match decode(&issue.title, &issue.body) {
            Ok(review) => review,
            Err(e) => {
                warn!(issue = %issue.number, error = %e, "!unblock: cannot decode review issue");
                return Ok(false);
            }
        };

        match review.checklist_mut().mark_blocker_fixed(number) {
            None => {
                warn!(commit = %commit.sha, blocker = number, "!unblock: unknown blocker number");
                return Ok(false);
            }
            Some(false) => {
                debug!(issue = %issue.number, blocker = number, "Blocker already fixed");
                return Ok(false);
            }
            Some(true) => {}
        }

        self.github()
            .interpret(GitHubEffect::EditIssue {
                repo: repo.clone(),
                number: issue.number,
                body: Some(encode(&review)),
                state: None,
            })
            .await?;

        if let Some(blocker) = review.checklist().review_blocker(number) {
            self.github()
                .interpret(GitHubEffect::PostComment {
                    repo: repo.clone(),
                    number: issue.number,
                    body: unblock_comment(
                        number,
                        &blocker.comment_url,
                        commit.sha.as_str(),
                        &commit.author_name,
                    ),
                })
                .await?;
        }

        info!(repo = %repo, issue = %issue.number, blocker = number, "Review blocker unblocked");
        Ok(true)
    }
}

async fn get_issue<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    number: IssueNumber,
) -> Result<IssueData, HandlerError> {
    let effect = GitHubEffect::GetIssue {
        repo: repo.clone(),
        number,
    };
    let operation = effect.operation();
    Ok(github.interpret(effect).await?.into_issue(operation)?)
}

pub fn reject_close_comment(sender: &str, issue: IssueNumber, implemented_label: &str) -> String {
    format!(
        "@{sender} Reopening review issue #{issue}, the associated story is not implemented yet.\n\
         The review issue needs to be labeled with `{implemented_label}`, then it can be closed."
    )
}

pub fn blocker_comment(
    number: u32,
    comment_url: &str,
    author: &str,
    issue: IssueNumber,
    summary: &str,
) -> String {
    format!(
        "Review blocker [[{number}]]({comment_url}) was opened by @{author} for review issue #{issue}. \
         The summary follows:\n> {summary}"
    )
}

pub fn unblock_comment(number: u32, comment_url: &str, sha: &str, author: &str) -> String {
    format!(
        "Review blocker [[{number}]]({comment_url}) was unblocked by commit {sha} (authored by {author})."
    )
}
