//! Review issue rendering.

use super::{
    BLOCKERS_HEADING, COMMITS_HEADING, Checklist, CommitItem, PROJECT_TAG, ReviewBlockerItem,
    ReviewIssue, STORY_KEY_TAG, TRACKER_TAG,
};

/// Renders a review issue body from its in-memory state.
///
/// The layout is fixed: metadata tags, free-text notes, the commit checklist and,
/// if any blockers exist, the blocker checklist, separated by blank lines. Any list
/// content in the previous body is replaced wholesale.
pub fn encode(issue: &ReviewIssue) -> String {
    let mut blocks = Vec::new();

    if let ReviewIssue::Story(story) = issue {
        let mut tags = vec![format_tag(TRACKER_TAG, &story.tracker)];
        if let Some(project_id) = &story.project_id {
            tags.push(format_tag(PROJECT_TAG, project_id));
        }
        tags.push(format_tag(STORY_KEY_TAG, &story.story_key));
        blocks.push(tags.join("\n"));
    }

    let checklist = issue.checklist();
    if !checklist.notes().is_empty() {
        blocks.push(checklist.notes().join("\n"));
    }
    blocks.extend(format_lists(checklist));

    let mut body = blocks.join("\n\n");
    body.push('\n');
    body
}

fn format_lists(checklist: &Checklist) -> Vec<String> {
    let mut blocks = Vec::new();

    let mut commits = String::from(COMMITS_HEADING);
    for item in checklist.commit_items() {
        commits.push('\n');
        commits.push_str(&format_commit_item(item));
    }
    blocks.push(commits);

    if !checklist.review_blocker_items().is_empty() {
        let mut blockers = String::from(BLOCKERS_HEADING);
        for item in checklist.review_blocker_items() {
            blockers.push('\n');
            blockers.push_str(&format_blocker_item(item));
        }
        blocks.push(blockers);
    }

    blocks
}

fn format_tag(tag: &str, value: &str) -> String {
    format!("{}: {}", tag, value)
}

fn checkbox(checked: bool) -> &'static str {
    if checked { "- [x]" } else { "- [ ]" }
}

/// `- [x] <sha>: <title>`
pub(super) fn format_commit_item(item: &CommitItem) -> String {
    format!("{} {}: {}", checkbox(item.done), item.sha, item.title)
}

/// `- [ ] [[n]](<url>) <summary>`
pub(super) fn format_blocker_item(item: &ReviewBlockerItem) -> String {
    format!(
        "{} [[{}]]({}) {}",
        checkbox(item.fixed),
        item.number,
        item.comment_url,
        item.summary
    )
}
