//! API clients and effect interpreters.
//!
//! - [`OctocrabClient`] executes [`GitHubEffect`](crate::effects::GitHubEffect)s via octocrab
//! - [`JiraClient`] and [`PivotalClient`] execute tracker effects via reqwest
//!
//! All of them report failures as [`ApiError`]. None of them retry.

mod error;
mod github;
mod jira;
mod pivotal;

pub use error::{ApiError, ApiErrorKind, Service};
pub use github::OctocrabClient;
pub use jira::JiraClient;
pub use pivotal::PivotalClient;
