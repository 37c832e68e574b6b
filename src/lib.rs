//! Review Relay - A GitHub bot that keeps code review issues and the stories
//! behind them in sync.
//!
//! Review issues on GitHub carry a checklist of commits and review blockers.
//! The relay reacts to GitHub and Pivotal Tracker webhooks by updating those
//! checklists and moving stories through their workflow in JIRA, Pivotal
//! Tracker or GitHub Issues.

pub mod checklist;
pub mod clients;
pub mod commands;
pub mod config;
pub mod effects;
pub mod handlers;
pub mod resolver;
pub mod server;
pub mod trackers;
pub mod types;
pub mod webhooks;

#[cfg(test)]
pub(crate) mod test_utils;
