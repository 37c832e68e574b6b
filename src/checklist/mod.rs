//! Review issue checklists.
//!
//! A review issue on GitHub carries its whole review state in its title and body:
//! which story or commit it reviews, which commits belong to it, and which review
//! blockers reviewers have raised. There is no database; the body is decoded on
//! every webhook, mutated in memory and written back.
//!
//! # Format
//!
//! ```text
//! Title: Review story PROJ-12: Payment checkout
//!
//! SF-Issue-Tracker: jira
//! SF-Story-Key: PROJ-12
//!
//! Free text written by humans is kept.
//!
//! The associated commits are following:
//! - [x] 1a2b3c4: Add checkout endpoint
//! - [ ] 5d6e7f8: Handle declined cards
//!
//! The following review blockers were opened by the reviewers:
//! - [ ] [[1]](https://github.com/o/r/commit/1a2b3c4#commitcomment-1) payment race condition
//! ```
//!
//! Commit review issues use the title `Review commit <sha>: <title>` and need no tags.

mod format;
mod parse;

use serde::{Deserialize, Serialize};

use crate::types::Sha;

pub use format::encode;
pub use parse::{DecodeError, decode};

/// Title prefix of a story review issue.
pub const STORY_TITLE_PREFIX: &str = "Review story";
/// Title prefix of a commit review issue.
pub const COMMIT_TITLE_PREFIX: &str = "Review commit";

/// Tag naming the tracker backend that holds the story.
pub const TRACKER_TAG: &str = "SF-Issue-Tracker";
/// Tag naming the project the story belongs to.
pub const PROJECT_TAG: &str = "SF-Project-Id";
/// Tag carrying the story key.
pub const STORY_KEY_TAG: &str = "SF-Story-Key";
/// Older spelling of [`STORY_KEY_TAG`], accepted when decoding.
pub const LEGACY_STORY_KEY_TAG: &str = "SF-Story-Id";

/// Heading rendered above the commit checklist.
pub const COMMITS_HEADING: &str = "The associated commits are following:";
/// Heading rendered above the blocker checklist.
pub const BLOCKERS_HEADING: &str = "The following review blockers were opened by the reviewers:";

/// One commit under review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitItem {
    /// Full SHA or an abbreviated prefix of at least 7 characters.
    pub sha: Sha,
    /// First line of the commit message.
    pub title: String,
    pub done: bool,
}

/// A reviewer-raised objection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewBlockerItem {
    /// 1-based, assigned once and never reused.
    pub number: u32,
    /// Link to the commit comment that raised the blocker.
    pub comment_url: String,
    pub summary: String,
    pub fixed: bool,
}

/// The mutable part of a review issue body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checklist {
    commits: Vec<CommitItem>,
    blockers: Vec<ReviewBlockerItem>,
    /// Free-text lines outside the lists and tags.
    notes: Vec<String>,
}

impl Checklist {
    /// Assembles a checklist from already-decoded parts.
    pub fn from_parts(
        commits: Vec<CommitItem>,
        blockers: Vec<ReviewBlockerItem>,
        notes: Vec<String>,
    ) -> Self {
        Checklist {
            commits,
            blockers,
            notes,
        }
    }

    pub fn commit_items(&self) -> &[CommitItem] {
        &self.commits
    }

    pub fn review_blocker_items(&self) -> &[ReviewBlockerItem] {
        &self.blockers
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    /// Appends a commit unless one with a matching SHA prefix is already listed.
    ///
    /// Returns whether the commit was added.
    pub fn add_commit(&mut self, sha: Sha, title: impl Into<String>, done: bool) -> bool {
        if self.commits.iter().any(|item| item.sha.matches(&sha)) {
            return false;
        }
        self.commits.push(CommitItem {
            sha,
            title: title.into(),
            done,
        });
        true
    }

    /// Appends a blocker with the next free number.
    ///
    /// A blocker with the same comment URL and summary counts as already present,
    /// which is what a redelivered comment webhook produces. Returns whether the
    /// blocker was added.
    pub fn add_review_blocker(
        &mut self,
        comment_url: impl Into<String>,
        summary: impl Into<String>,
        fixed: bool,
    ) -> bool {
        let comment_url = comment_url.into();
        let summary = summary.into();
        if self
            .blockers
            .iter()
            .any(|b| b.comment_url == comment_url && b.summary == summary)
        {
            return false;
        }
        self.blockers.push(ReviewBlockerItem {
            number: self.next_blocker_number(),
            comment_url,
            summary,
            fixed,
        });
        true
    }

    /// Returns the blocker with the given number.
    pub fn review_blocker(&self, number: u32) -> Option<&ReviewBlockerItem> {
        self.blockers.iter().find(|b| b.number == number)
    }

    /// Marks a blocker fixed.
    ///
    /// Returns `None` if no such blocker exists and `Some(false)` if it was
    /// already fixed.
    pub fn mark_blocker_fixed(&mut self, number: u32) -> Option<bool> {
        let blocker = self.blockers.iter_mut().find(|b| b.number == number)?;
        let changed = !blocker.fixed;
        blocker.fixed = true;
        Some(changed)
    }

    fn next_blocker_number(&self) -> u32 {
        self.blockers.iter().map(|b| b.number).max().unwrap_or(0) + 1
    }
}

/// Review issue for a story tracked in an external tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryReviewIssue {
    /// Tracker backend id, as understood by the tracker registry.
    pub tracker: String,
    pub story_key: String,
    pub project_id: Option<String>,
    pub story_title: String,
    pub checklist: Checklist,
}

/// Review issue for a single commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReviewIssue {
    pub commit_sha: Sha,
    pub commit_title: String,
    pub checklist: Checklist,
}

/// A decoded review issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewIssue {
    Story(StoryReviewIssue),
    Commit(CommitReviewIssue),
}

impl ReviewIssue {
    pub fn checklist(&self) -> &Checklist {
        match self {
            ReviewIssue::Story(issue) => &issue.checklist,
            ReviewIssue::Commit(issue) => &issue.checklist,
        }
    }

    pub fn checklist_mut(&mut self) -> &mut Checklist {
        match self {
            ReviewIssue::Story(issue) => &mut issue.checklist,
            ReviewIssue::Commit(issue) => &mut issue.checklist,
        }
    }

    /// Renders the issue title.
    pub fn title(&self) -> String {
        match self {
            ReviewIssue::Story(issue) => format!(
                "{} {}: {}",
                STORY_TITLE_PREFIX, issue.story_key, issue.story_title
            ),
            ReviewIssue::Commit(issue) => format!(
                "{} {}: {}",
                COMMIT_TITLE_PREFIX,
                issue.commit_sha.short(),
                issue.commit_title
            ),
        }
    }

    pub fn add_commit(&mut self, sha: Sha, title: impl Into<String>, done: bool) -> bool {
        self.checklist_mut().add_commit(sha, title, done)
    }

    pub fn add_review_blocker(
        &mut self,
        comment_url: impl Into<String>,
        summary: impl Into<String>,
        fixed: bool,
    ) -> bool {
        self.checklist_mut()
            .add_review_blocker(comment_url, summary, fixed)
    }

    pub fn commit_items(&self) -> &[CommitItem] {
        self.checklist().commit_items()
    }

    pub fn review_blocker_items(&self) -> &[ReviewBlockerItem] {
        self.checklist().review_blocker_items()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sha(s: &str) -> Sha {
        Sha::new(s)
    }

    // ─── add_commit ───

    #[test]
    fn add_commit_twice_is_idempotent() {
        let mut checklist = Checklist::default();

        assert!(checklist.add_commit(sha("1a2b3c4d5e"), "Add endpoint", false));
        assert!(!checklist.add_commit(sha("1a2b3c4d5e"), "Add endpoint", false));

        assert_eq!(checklist.commit_items().len(), 1);
    }

    #[test]
    fn add_commit_matches_abbreviated_sha() {
        let mut checklist = Checklist::default();
        checklist.add_commit(sha("1a2b3c4"), "Add endpoint", false);

        assert!(!checklist.add_commit(
            sha("1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b"),
            "Add endpoint",
            true
        ));
        assert_eq!(checklist.commit_items().len(), 1);
        assert!(!checklist.commit_items()[0].done);
    }

    #[test]
    fn add_commit_new_sha_appends_in_order() {
        let mut checklist = Checklist::default();
        assert!(checklist.add_commit(sha("aaaaaaa"), "first", false));
        assert!(checklist.add_commit(sha("bbbbbbb"), "second", true));

        let titles: Vec<_> = checklist
            .commit_items()
            .iter()
            .map(|c| c.title.as_str())
            .collect();
        assert_eq!(titles, vec!["first", "second"]);
    }

    // ─── add_review_blocker ───

    #[test]
    fn blockers_are_numbered_from_one_without_gaps() {
        let mut checklist = Checklist::default();
        for i in 0..5 {
            assert!(checklist.add_review_blocker(format!("https://c/{i}"), "summary", false));
        }

        let numbers: Vec<_> = checklist
            .review_blocker_items()
            .iter()
            .map(|b| b.number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn redelivered_blocker_is_not_added_again() {
        let mut checklist = Checklist::default();
        assert!(checklist.add_review_blocker("https://c/1", "race", false));
        assert!(!checklist.add_review_blocker("https://c/1", "race", false));
        assert_eq!(checklist.review_blocker_items().len(), 1);
    }

    #[test]
    fn one_comment_can_raise_several_blockers() {
        let mut checklist = Checklist::default();
        assert!(checklist.add_review_blocker("https://c/1", "race", false));
        assert!(checklist.add_review_blocker("https://c/1", "leak", false));
        assert_eq!(checklist.review_blocker_items()[1].number, 2);
    }

    #[test]
    fn blocker_numbers_continue_after_highest_existing() {
        let mut checklist = Checklist::from_parts(
            vec![],
            vec![ReviewBlockerItem {
                number: 4,
                comment_url: "https://c/4".into(),
                summary: "old".into(),
                fixed: true,
            }],
            vec![],
        );
        checklist.add_review_blocker("https://c/5", "new", false);
        assert_eq!(checklist.review_blocker_items()[1].number, 5);
    }

    #[test]
    fn mark_blocker_fixed_reports_changes() {
        let mut checklist = Checklist::default();
        checklist.add_review_blocker("https://c/1", "race", false);

        assert_eq!(checklist.mark_blocker_fixed(1), Some(true));
        assert_eq!(checklist.mark_blocker_fixed(1), Some(false));
        assert_eq!(checklist.mark_blocker_fixed(2), None);
        assert!(checklist.review_blocker(1).unwrap().fixed);
    }

    // ─── titles ───

    #[test]
    fn titles_use_variant_prefix() {
        let story = ReviewIssue::Story(StoryReviewIssue {
            tracker: "jira".into(),
            story_key: "PROJ-12".into(),
            project_id: None,
            story_title: "Payment checkout".into(),
            checklist: Checklist::default(),
        });
        assert_eq!(story.title(), "Review story PROJ-12: Payment checkout");

        let commit = ReviewIssue::Commit(CommitReviewIssue {
            commit_sha: sha("1a2b3c4d5e6f"),
            commit_title: "Fix typo".into(),
            checklist: Checklist::default(),
        });
        assert_eq!(commit.title(), "Review commit 1a2b3c4: Fix typo");
    }

    proptest! {
        /// Numbers stay strictly increasing and gap-free for any sequence of distinct blockers.
        #[test]
        fn prop_blocker_numbers_sequential(n in 1usize..30) {
            let mut checklist = Checklist::default();
            for i in 0..n {
                checklist.add_review_blocker(format!("https://c/{i}"), format!("s{i}"), false);
            }
            for (i, blocker) in checklist.review_blocker_items().iter().enumerate() {
                prop_assert_eq!(blocker.number as usize, i + 1);
            }
        }
    }
}
