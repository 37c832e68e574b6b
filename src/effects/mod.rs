//! Effects-as-data for the GitHub, JIRA and Pivotal Tracker APIs.
//!
//! This module defines effect types that describe operations without executing them.
//! This enables:
//! - Tracker and handler logic that is testable against mock interpreters
//! - Logging of intended operations
//! - One error type ([`crate::clients::ApiError`]) for every downstream failure

pub mod github;
pub mod interpreter;
pub mod jira;
pub mod pivotal;

pub use github::{GitHubEffect, GitHubResponse, IssueData, IssueState, SearchPage};
pub use interpreter::{Backends, Clients, GitHubInterpreter, JiraInterpreter, PivotalInterpreter};
pub use jira::{JiraEffect, JiraIssue, JiraResponse, RemoteLink};
pub use pivotal::{PivotalEffect, PivotalResponse, StoryData, StoryState, StoryUpdate};
