//! Shared test utilities: recording mock interpreters and arbitrary generators
//! for property-based testing.

use std::collections::HashMap;
use std::sync::Mutex;

use proptest::prelude::*;

use crate::checklist::{CommitItem, ReviewBlockerItem};
use crate::clients::{ApiError, Service};
use crate::effects::{
    Clients, GitHubEffect, GitHubInterpreter, GitHubResponse, IssueData, IssueState, JiraEffect,
    JiraInterpreter, JiraIssue, JiraResponse, PivotalEffect, PivotalInterpreter, PivotalResponse,
    RemoteLink, SearchPage, StoryData,
};
use crate::types::{IssueNumber, RepoId, Sha};

// ─── Generators ───────────────────────────────────────────────────────────────

pub fn arb_sha7() -> impl Strategy<Value = Sha> {
    "[0-9a-f]{7}".prop_map(Sha::from)
}

pub fn arb_commit_item() -> impl Strategy<Value = CommitItem> {
    (
        "[0-9a-f]{7,40}",
        "[A-Za-z0-9][A-Za-z0-9 :,.()]{0,40}",
        any::<bool>(),
    )
        .prop_map(|(sha, title, done)| CommitItem {
            sha: Sha::new(sha),
            title,
            done,
        })
}

pub fn arb_review_blocker_item() -> impl Strategy<Value = ReviewBlockerItem> {
    (
        1u32..1000,
        "https://github\\.com/[a-z]{1,8}/[a-z]{1,8}/commit/[0-9a-f]{7}#commitcomment-[0-9]{1,6}",
        "[A-Za-z0-9 ,.()]{0,40}",
        any::<bool>(),
    )
        .prop_map(|(number, comment_url, summary, fixed)| ReviewBlockerItem {
            number,
            comment_url,
            summary,
            fixed,
        })
}

/// A free-text line that cannot be mistaken for a tag or a checklist item.
pub fn arb_note_line() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 ,.]{0,30}".prop_map(String::from)
}

// ─── Fixtures ─────────────────────────────────────────────────────────────────

pub fn repo() -> RepoId {
    RepoId::new("acme", "shop")
}

/// An open issue in [`repo`].
pub fn issue(number: u64, title: &str, body: &str, labels: &[&str]) -> IssueData {
    IssueData {
        number: IssueNumber(number),
        title: title.to_string(),
        body: body.to_string(),
        labels: labels.iter().map(|l| l.to_string()).collect(),
        state: IssueState::Open,
        html_url: format!("https://github.com/acme/shop/issues/{}", number),
    }
}

pub type MockBackends = Clients<MockGitHub, MockJira, MockPivotal>;

pub fn backends(github: MockGitHub) -> MockBackends {
    Clients {
        github,
        jira: MockJira::new(),
        pivotal: MockPivotal::new(),
    }
}

fn injected(service: Service, operation: &'static str) -> ApiError {
    ApiError::status(service, operation, 500, "injected failure")
}

fn not_found(service: Service, operation: &'static str) -> ApiError {
    ApiError::status(service, operation, 404, "Not Found")
}

// ─── GitHub ───────────────────────────────────────────────────────────────────

/// A GitHub interpreter backed by in-memory issues.
///
/// Edits are applied to the stored issues so later reads observe them. Every
/// effect is recorded in order.
#[derive(Default)]
pub struct MockGitHub {
    issues: Mutex<HashMap<(RepoId, IssueNumber), IssueData>>,
    search_pages: Mutex<HashMap<u32, SearchPage>>,
    failing: Option<&'static str>,
    calls: Mutex<Vec<GitHubEffect>>,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issue(self, repo: RepoId, issue: IssueData) -> Self {
        self.issues.lock().unwrap().insert((repo, issue.number), issue);
        self
    }

    /// Serves `page` for the given 1-based page index of any search.
    pub fn with_search_page(self, index: u32, page: SearchPage) -> Self {
        self.search_pages.lock().unwrap().insert(index, page);
        self
    }

    /// Fails every effect with the given operation name.
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.failing = Some(operation);
        self
    }

    pub fn calls(&self) -> Vec<GitHubEffect> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded calls other than reads.
    pub fn mutations(&self) -> Vec<GitHubEffect> {
        self.calls()
            .into_iter()
            .filter(|e| {
                !matches!(
                    e,
                    GitHubEffect::GetIssue { .. } | GitHubEffect::SearchIssues { .. }
                )
            })
            .collect()
    }

    pub fn comments(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|e| match e {
                GitHubEffect::PostComment { body, .. } => Some(body),
                _ => None,
            })
            .collect()
    }

    pub fn issue(&self, repo: &RepoId, number: u64) -> Option<IssueData> {
        self.issues
            .lock()
            .unwrap()
            .get(&(repo.clone(), IssueNumber(number)))
            .cloned()
    }
}

impl GitHubInterpreter for MockGitHub {
    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, ApiError> {
        let operation = effect.operation();
        self.calls.lock().unwrap().push(effect.clone());
        if self.failing == Some(operation) {
            return Err(injected(Service::GitHub, operation));
        }

        let mut issues = self.issues.lock().unwrap();
        match effect {
            GitHubEffect::GetIssue { repo, number } => issues
                .get(&(repo, number))
                .cloned()
                .map(GitHubResponse::Issue)
                .ok_or_else(|| not_found(Service::GitHub, operation)),
            GitHubEffect::SearchIssues { page, .. } => Ok(GitHubResponse::SearchPage(
                self.search_pages
                    .lock()
                    .unwrap()
                    .get(&page)
                    .cloned()
                    .unwrap_or(SearchPage {
                        total_count: 0,
                        items: Vec::new(),
                    }),
            )),
            GitHubEffect::EditIssue {
                repo,
                number,
                body,
                state,
            } => {
                let issue = issues
                    .get_mut(&(repo, number))
                    .ok_or_else(|| not_found(Service::GitHub, operation))?;
                if let Some(body) = body {
                    issue.body = body;
                }
                if let Some(state) = state {
                    issue.state = state;
                }
                Ok(GitHubResponse::Issue(issue.clone()))
            }
            GitHubEffect::ReplaceLabels {
                repo,
                number,
                labels,
            } => {
                let issue = issues
                    .get_mut(&(repo, number))
                    .ok_or_else(|| not_found(Service::GitHub, operation))?;
                issue.labels = labels.clone();
                Ok(GitHubResponse::Labels(labels))
            }
            GitHubEffect::PostComment { .. } => Ok(GitHubResponse::Ok),
        }
    }
}

// ─── JIRA ─────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockJira {
    issues: Mutex<HashMap<String, JiraIssue>>,
    links: Mutex<HashMap<String, Vec<RemoteLink>>>,
    calls: Mutex<Vec<JiraEffect>>,
}

impl MockJira {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_issue(self, key: &str, status_id: &str) -> Self {
        self.issues.lock().unwrap().insert(
            key.to_string(),
            JiraIssue {
                key: key.to_string(),
                status_id: status_id.to_string(),
            },
        );
        self
    }

    pub fn with_link(self, key: &str, link: RemoteLink) -> Self {
        self.links
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push(link);
        self
    }

    pub fn calls(&self) -> Vec<JiraEffect> {
        self.calls.lock().unwrap().clone()
    }

    pub fn links(&self, key: &str) -> Vec<RemoteLink> {
        self.links
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn transitions(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|e| match e {
                JiraEffect::PerformTransition { key, transition_id } => Some((key, transition_id)),
                _ => None,
            })
            .collect()
    }
}

impl JiraInterpreter for MockJira {
    async fn interpret(&self, effect: JiraEffect) -> Result<JiraResponse, ApiError> {
        let operation = effect.operation();
        self.calls.lock().unwrap().push(effect.clone());

        match effect {
            JiraEffect::GetIssue { key } => self
                .issues
                .lock()
                .unwrap()
                .get(&key)
                .cloned()
                .map(JiraResponse::Issue)
                .ok_or_else(|| not_found(Service::Jira, operation)),
            JiraEffect::PerformTransition { .. } => Ok(JiraResponse::Ok),
            JiraEffect::ListRemoteLinks { key } => Ok(JiraResponse::RemoteLinks(self.links(&key))),
            JiraEffect::CreateRemoteLink { key, link } | JiraEffect::UpdateRemoteLink { key, link } => {
                let mut links = self.links.lock().unwrap();
                let links = links.entry(key).or_default();
                match links.iter_mut().find(|l| l.global_id == link.global_id) {
                    Some(existing) => *existing = link,
                    None => links.push(link),
                }
                Ok(JiraResponse::Ok)
            }
        }
    }
}

// ─── Pivotal Tracker ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockPivotal {
    stories: Mutex<HashMap<(u64, u64), StoryData>>,
    calls: Mutex<Vec<PivotalEffect>>,
}

impl MockPivotal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_story(self, story: StoryData) -> Self {
        self.stories
            .lock()
            .unwrap()
            .insert((story.project_id, story.story_id), story);
        self
    }

    pub fn calls(&self) -> Vec<PivotalEffect> {
        self.calls.lock().unwrap().clone()
    }

    pub fn story(&self, project_id: u64, story_id: u64) -> Option<StoryData> {
        self.stories
            .lock()
            .unwrap()
            .get(&(project_id, story_id))
            .cloned()
    }
}

impl PivotalInterpreter for MockPivotal {
    async fn interpret(&self, effect: PivotalEffect) -> Result<PivotalResponse, ApiError> {
        let operation = effect.operation();
        self.calls.lock().unwrap().push(effect.clone());

        let mut stories = self.stories.lock().unwrap();
        match effect {
            PivotalEffect::GetStory {
                project_id,
                story_id,
            } => stories
                .get(&(project_id, story_id))
                .cloned()
                .map(PivotalResponse::Story)
                .ok_or_else(|| not_found(Service::PivotalTracker, operation)),
            PivotalEffect::UpdateStory {
                project_id,
                story_id,
                update,
            } => {
                let story = stories
                    .get_mut(&(project_id, story_id))
                    .ok_or_else(|| not_found(Service::PivotalTracker, operation))?;
                if let Some(state) = update.current_state {
                    story.state = state;
                }
                if let Some(labels) = update.labels {
                    story.labels = labels;
                }
                Ok(PivotalResponse::Story(story.clone()))
            }
            PivotalEffect::AddComment { .. } => Ok(PivotalResponse::Ok),
        }
    }
}
