//! Core identifier types shared across the relay.

pub mod ids;

pub use ids::{IssueNumber, RepoId, Sha};
