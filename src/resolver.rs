//! Commit-to-review-issue resolution.
//!
//! There is no database: the review issue tracking a commit is found by
//! searching issue bodies for the commit's checklist line. The search index is
//! fuzzy, so every candidate is confirmed with an exact substring check.
//!
//! Pagination is asymmetric. A page with exactly one exact match ends the
//! search without looking at later pages, so ambiguity is only detected within
//! a single page. Not-found is declared only after every page has been seen.

use thiserror::Error;
use tracing::debug;

use crate::clients::ApiError;
use crate::effects::{GitHubEffect, GitHubInterpreter, IssueData};
use crate::types::{RepoId, Sha};

/// Search results requested per page.
pub const PER_PAGE: u8 = 50;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no review issue found for commit {sha} in {repo}")]
    NotFound { repo: RepoId, sha: Sha },

    #[error("{count} review issues in {repo} match commit {sha}")]
    Ambiguous { repo: RepoId, sha: Sha, count: usize },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// The checklist substring identifying a commit.
///
/// Commit comments carry no commit title, in which case only the SHA part of
/// the line is matched.
pub fn search_pattern(sha: &Sha, title: Option<&str>) -> String {
    format!("] {}: {}", sha.short(), title.unwrap_or_default())
}

pub fn search_query(repo: &RepoId, review_label: &str, pattern: &str) -> String {
    format!(
        "\"{}\" repo:\"{}\" label:\"{}\" type:issue in:body",
        pattern, repo, review_label
    )
}

/// Finds the review issue whose commit checklist contains `sha`.
pub async fn find_review_issue<G: GitHubInterpreter>(
    github: &G,
    repo: &RepoId,
    review_label: &str,
    sha: &Sha,
    title: Option<&str>,
) -> Result<IssueData, ResolveError> {
    let pattern = search_pattern(sha, title);
    let query = search_query(repo, review_label, &pattern);

    let mut page = 1;
    let mut searched: u64 = 0;

    loop {
        let effect = GitHubEffect::SearchIssues {
            query: query.clone(),
            page,
            per_page: PER_PAGE,
        };
        let operation = effect.operation();
        let result = github.interpret(effect).await?.into_search_page(operation)?;

        let fetched = result.items.len() as u64;
        let mut matches: Vec<IssueData> = result
            .items
            .into_iter()
            .filter(|issue| issue.body.contains(&pattern))
            .collect();

        match matches.len() {
            0 => {}
            1 => {
                let issue = matches.remove(0);
                debug!(repo = %repo, sha = %sha, issue = %issue.number, "Resolved review issue");
                return Ok(issue);
            }
            count => {
                return Err(ResolveError::Ambiguous {
                    repo: repo.clone(),
                    sha: sha.clone(),
                    count,
                });
            }
        }

        searched += fetched;
        if fetched == 0 || searched >= result.total_count {
            return Err(ResolveError::NotFound {
                repo: repo.clone(),
                sha: sha.clone(),
            });
        }
        page += 1;
    }
}
