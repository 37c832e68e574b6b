//! GitHub effect interpreter using octocrab.

use octocrab::Octocrab;
use octocrab::models;
use tracing::debug;

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse, IssueData, IssueState, SearchPage};
use crate::types::{IssueNumber, RepoId};

use super::error::ApiError;

/// A GitHub API client.
///
/// Not scoped to a repository: story issues tracked in GitHub may live outside
/// the repository whose review issues reference them.
#[derive(Clone)]
pub struct OctocrabClient {
    client: Octocrab,
}

impl OctocrabClient {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Creates a client authenticated with a personal access token.
    pub fn from_token(token: impl Into<String>) -> Result<Self, octocrab::Error> {
        let client = Octocrab::builder().personal_token(token.into()).build()?;
        Ok(Self::new(client))
    }
}

impl std::fmt::Debug for OctocrabClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OctocrabClient").finish_non_exhaustive()
    }
}

impl GitHubInterpreter for OctocrabClient {
    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, ApiError> {
        debug!(operation = effect.operation(), "Executing GitHub effect");

        match effect {
            GitHubEffect::GetIssue { repo, number } => get_issue(&self.client, &repo, number).await,
            GitHubEffect::SearchIssues {
                query,
                page,
                per_page,
            } => search_issues(&self.client, &query, page, per_page).await,
            GitHubEffect::EditIssue {
                repo,
                number,
                body,
                state,
            } => edit_issue(&self.client, &repo, number, body, state).await,
            GitHubEffect::ReplaceLabels {
                repo,
                number,
                labels,
            } => replace_labels(&self.client, &repo, number, labels).await,
            GitHubEffect::PostComment { repo, number, body } => {
                post_comment(&self.client, &repo, number, body).await
            }
        }
    }
}

// ─── Issue Operations ─────────────────────────────────────────────────────────

async fn get_issue(
    client: &Octocrab,
    repo: &RepoId,
    number: IssueNumber,
) -> Result<GitHubResponse, ApiError> {
    let issue = client
        .issues(&repo.owner, &repo.repo)
        .get(number.0)
        .await
        .map_err(|e| ApiError::from_octocrab("issues.get", e))?;

    Ok(GitHubResponse::Issue(issue_data(issue)))
}

async fn search_issues(
    client: &Octocrab,
    query: &str,
    page: u32,
    per_page: u8,
) -> Result<GitHubResponse, ApiError> {
    let result = client
        .search()
        .issues_and_pull_requests(query)
        .page(page)
        .per_page(per_page)
        .send()
        .await
        .map_err(|e| ApiError::from_octocrab("search.issues", e))?;

    let items: Vec<IssueData> = result.items.into_iter().map(issue_data).collect();
    Ok(GitHubResponse::SearchPage(SearchPage {
        total_count: result.total_count.unwrap_or(items.len() as u64),
        items,
    }))
}

async fn edit_issue(
    client: &Octocrab,
    repo: &RepoId,
    number: IssueNumber,
    body: Option<String>,
    state: Option<IssueState>,
) -> Result<GitHubResponse, ApiError> {
    let handler = client.issues(&repo.owner, &repo.repo);
    let mut update = handler.update(number.0);
    if let Some(body) = &body {
        update = update.body(body);
    }
    if let Some(state) = state {
        update = update.state(match state {
            IssueState::Open => models::IssueState::Open,
            IssueState::Closed => models::IssueState::Closed,
        });
    }

    let issue = update
        .send()
        .await
        .map_err(|e| ApiError::from_octocrab("issues.edit", e))?;

    Ok(GitHubResponse::Issue(issue_data(issue)))
}

async fn replace_labels(
    client: &Octocrab,
    repo: &RepoId,
    number: IssueNumber,
    labels: Vec<String>,
) -> Result<GitHubResponse, ApiError> {
    let labels = client
        .issues(&repo.owner, &repo.repo)
        .replace_all_labels(number.0, &labels)
        .await
        .map_err(|e| ApiError::from_octocrab("issues.replace_labels", e))?;

    Ok(GitHubResponse::Labels(
        labels.into_iter().map(|l| l.name).collect(),
    ))
}

async fn post_comment(
    client: &Octocrab,
    repo: &RepoId,
    number: IssueNumber,
    body: String,
) -> Result<GitHubResponse, ApiError> {
    client
        .issues(&repo.owner, &repo.repo)
        .create_comment(number.0, body)
        .await
        .map_err(|e| ApiError::from_octocrab("issues.create_comment", e))?;

    Ok(GitHubResponse::Ok)
}

fn issue_data(issue: models::issues::Issue) -> IssueData {
    IssueData {
        number: IssueNumber(issue.number),
        title: issue.title,
        body: issue.body.unwrap_or_default(),
        labels: issue.labels.into_iter().map(|l| l.name).collect(),
        state: match issue.state {
            models::IssueState::Closed => IssueState::Closed,
            _ => IssueState::Open,
        },
        html_url: issue.html_url.to_string(),
    }
}
