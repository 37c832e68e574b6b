//! Review issue decoding.

use thiserror::Error;

use crate::types::Sha;

use super::{
    BLOCKERS_HEADING, COMMIT_TITLE_PREFIX, COMMITS_HEADING, Checklist, CommitItem,
    CommitReviewIssue, LEGACY_STORY_KEY_TAG, PROJECT_TAG, ReviewBlockerItem, ReviewIssue,
    STORY_KEY_TAG, STORY_TITLE_PREFIX, StoryReviewIssue, TRACKER_TAG,
};

/// Errors that can occur when decoding a review issue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The title starts with neither review issue prefix.
    #[error("unknown review issue type: {title:?}")]
    UnknownReviewIssueType { title: String },

    /// A required metadata line is absent from the body.
    #[error("review issue body is missing the {0} tag")]
    MissingTag(&'static str),

    /// A commit review issue title without `<sha>: <title>`.
    #[error("malformed commit review issue title: {title:?}")]
    MalformedTitle { title: String },
}

/// Decodes a review issue from its title and body.
///
/// # Errors
///
/// Returns [`DecodeError::UnknownReviewIssueType`] if the title is not a review
/// issue title, and [`DecodeError::MissingTag`] if a story review issue lacks its
/// tracker or story key.
///
/// # Examples
///
/// ```
/// use review_relay::checklist::{decode, ReviewIssue};
///
/// let body = "SF-Issue-Tracker: jira\nSF-Story-Key: PROJ-1\n\n- [ ] 1a2b3c4: Fix it\n";
/// let issue = decode("Review story PROJ-1: Checkout", body).unwrap();
///
/// assert!(matches!(issue, ReviewIssue::Story(_)));
/// assert_eq!(issue.commit_items().len(), 1);
/// ```
pub fn decode(title: &str, body: &str) -> Result<ReviewIssue, DecodeError> {
    if let Some(rest) = strip_title_prefix(title, STORY_TITLE_PREFIX) {
        decode_story(rest, body)
    } else if let Some(rest) = strip_title_prefix(title, COMMIT_TITLE_PREFIX) {
        decode_commit(title, rest, body)
    } else {
        Err(DecodeError::UnknownReviewIssueType {
            title: title.to_string(),
        })
    }
}

fn decode_story(title_rest: &str, body: &str) -> Result<ReviewIssue, DecodeError> {
    let scan = scan_body(body);

    let tracker = scan.tracker.ok_or(DecodeError::MissingTag(TRACKER_TAG))?;
    let story_key = scan.story_key.ok_or(DecodeError::MissingTag(STORY_KEY_TAG))?;

    let story_title = match title_rest.split_once(": ") {
        Some((key, title)) if key == story_key => title.to_string(),
        _ => title_rest.to_string(),
    };

    Ok(ReviewIssue::Story(StoryReviewIssue {
        tracker,
        story_key,
        project_id: scan.project_id,
        story_title,
        checklist: scan.checklist,
    }))
}

fn decode_commit(title: &str, title_rest: &str, body: &str) -> Result<ReviewIssue, DecodeError> {
    let malformed = || DecodeError::MalformedTitle {
        title: title.to_string(),
    };

    let (sha, commit_title) = title_rest.split_once(':').ok_or_else(malformed)?;
    if !is_sha(sha) {
        return Err(malformed());
    }
    let commit_title = commit_title.strip_prefix(' ').unwrap_or(commit_title);

    Ok(ReviewIssue::Commit(CommitReviewIssue {
        commit_sha: Sha::new(sha),
        commit_title: commit_title.to_string(),
        checklist: scan_body(body).checklist,
    }))
}

/// Strips a title prefix, requiring it to end at a word boundary.
fn strip_title_prefix<'a>(title: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = title.trim_start().strip_prefix(prefix)?;
    if rest.is_empty() {
        return Some(rest);
    }
    let trimmed = rest.trim_start();
    (trimmed.len() < rest.len()).then_some(trimmed)
}

/// Everything recovered from one pass over the body.
#[derive(Default)]
struct BodyScan {
    tracker: Option<String>,
    project_id: Option<String>,
    story_key: Option<String>,
    checklist: Checklist,
}

fn scan_body(body: &str) -> BodyScan {
    let mut scan = BodyScan::default();
    let mut commits = Vec::new();
    let mut blockers = Vec::new();
    let mut notes: Vec<String> = Vec::new();

    for line in body.lines() {
        let trimmed = line.trim();

        if let Some(value) = tag_value(trimmed, TRACKER_TAG) {
            scan.tracker.get_or_insert(value);
        } else if let Some(value) = tag_value(trimmed, PROJECT_TAG) {
            scan.project_id.get_or_insert(value);
        } else if let Some(value) = tag_value(trimmed, STORY_KEY_TAG)
            .or_else(|| tag_value(trimmed, LEGACY_STORY_KEY_TAG))
        {
            scan.story_key.get_or_insert(value);
        } else if let Some((checked, item)) = parse_checkbox(line.trim_start()) {
            if let Some(blocker) = parse_blocker_item(checked, item) {
                blockers.push(blocker);
            } else if let Some(commit) = parse_commit_item(checked, item) {
                commits.push(commit);
            } else {
                notes.push(line.to_string());
            }
        } else if trimmed == COMMITS_HEADING || trimmed == BLOCKERS_HEADING {
            continue;
        } else if trimmed.is_empty() {
            // Collapse runs of blank lines; the encoder adds its own spacing.
            if notes.last().is_some_and(|last| !last.is_empty()) {
                notes.push(String::new());
            }
        } else {
            notes.push(line.to_string());
        }
    }

    while notes.last().is_some_and(|last| last.is_empty()) {
        notes.pop();
    }

    scan.checklist = Checklist::from_parts(commits, blockers, notes);
    scan
}

/// Matches `<tag>: <value>`, returning a non-empty value.
fn tag_value(line: &str, tag: &str) -> Option<String> {
    let value = line.strip_prefix(tag)?.strip_prefix(':')?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Splits `- [ ] rest` / `- [x] rest` into the checkbox state and the rest.
fn parse_checkbox(line: &str) -> Option<(bool, &str)> {
    let rest = line.strip_prefix("- [")?;
    let mut chars = rest.chars();
    let checked = match chars.next()? {
        ' ' => false,
        'x' | 'X' => true,
        _ => return None,
    };
    let rest = chars.as_str().strip_prefix(']')?;
    let rest = rest.strip_prefix(' ').unwrap_or(rest);
    Some((checked, rest.trim_end_matches('\r')))
}

/// Parses `<sha>: <title>`.
fn parse_commit_item(done: bool, item: &str) -> Option<CommitItem> {
    let (sha, title) = item.split_once(':')?;
    if !is_sha(sha) {
        return None;
    }
    Some(CommitItem {
        sha: Sha::new(sha),
        title: title.strip_prefix(' ').unwrap_or(title).to_string(),
        done,
    })
}

/// Parses `[[n]](url) summary`.
fn parse_blocker_item(fixed: bool, item: &str) -> Option<ReviewBlockerItem> {
    let rest = item.strip_prefix("[[")?;
    let (number, rest) = rest.split_once("]](")?;
    let number: u32 = number.parse().ok().filter(|n| *n > 0)?;
    let (comment_url, summary) = rest.split_once(')')?;
    Some(ReviewBlockerItem {
        number,
        comment_url: comment_url.to_string(),
        summary: summary.strip_prefix(' ').unwrap_or(summary).to_string(),
        fixed,
    })
}

fn is_sha(s: &str) -> bool {
    (Sha::SHORT_LEN..=40).contains(&s.len()) && s.chars().all(|c| c.is_ascii_hexdigit())
}
