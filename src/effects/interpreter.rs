//! Effect interpreter traits.
//!
//! These traits define how effects are executed. The production implementations
//! live in [`crate::clients`]; tests use recording mocks from `test_utils`.
//!
//! The trait-based design enables:
//! - Mock interpreters for testing
//! - Logging of intended operations before they run

use std::future::Future;

use crate::clients::ApiError;

use super::github::{GitHubEffect, GitHubResponse};
use super::jira::{JiraEffect, JiraResponse};
use super::pivotal::{PivotalEffect, PivotalResponse};

/// Interprets GitHub effects against the GitHub API.
///
/// # Example (mock for testing)
///
/// ```ignore
/// struct MockGitHub {
///     issues: HashMap<(RepoId, IssueNumber), IssueData>,
/// }
///
/// impl GitHubInterpreter for MockGitHub {
///     async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, ApiError> {
///         match effect {
///             GitHubEffect::GetIssue { repo, number } => self.issues
///                 .get(&(repo, number))
///                 .cloned()
///                 .map(GitHubResponse::Issue)
///                 .ok_or_else(|| ApiError::status(Service::GitHub, "issues.get", 404, "not found")),
///             _ => Ok(GitHubResponse::Ok),
///         }
///     }
/// }
/// ```
pub trait GitHubInterpreter: Send + Sync {
    /// Execute a GitHub effect and return its response.
    fn interpret(
        &self,
        effect: GitHubEffect,
    ) -> impl Future<Output = Result<GitHubResponse, ApiError>> + Send;
}

/// Interprets JIRA effects against the JIRA REST API.
pub trait JiraInterpreter: Send + Sync {
    fn interpret(
        &self,
        effect: JiraEffect,
    ) -> impl Future<Output = Result<JiraResponse, ApiError>> + Send;
}

/// Interprets Pivotal Tracker effects against the Tracker v5 API.
pub trait PivotalInterpreter: Send + Sync {
    fn interpret(
        &self,
        effect: PivotalEffect,
    ) -> impl Future<Output = Result<PivotalResponse, ApiError>> + Send;
}

/// The set of interpreters one deployment talks to.
///
/// Handlers and the tracker registry are generic over this so that tests can
/// swap in mocks for all three services at once.
pub trait Backends: Send + Sync + 'static {
    type GitHub: GitHubInterpreter;
    type Jira: JiraInterpreter;
    type Pivotal: PivotalInterpreter;

    fn github(&self) -> &Self::GitHub;
    fn jira(&self) -> &Self::Jira;
    fn pivotal(&self) -> &Self::Pivotal;
}

/// Plain [`Backends`] bundle.
#[derive(Debug, Clone)]
pub struct Clients<G, J, P> {
    pub github: G,
    pub jira: J,
    pub pivotal: P,
}

impl<G, J, P> Backends for Clients<G, J, P>
where
    G: GitHubInterpreter + 'static,
    J: JiraInterpreter + 'static,
    P: PivotalInterpreter + 'static,
{
    type GitHub = G;
    type Jira = J;
    type Pivotal = P;

    fn github(&self) -> &G {
        &self.github
    }

    fn jira(&self) -> &J {
        &self.jira
    }

    fn pivotal(&self) -> &P {
        &self.pivotal
    }
}
