//! Workflow labels owned by the label-based trackers.
//!
//! A tracker only ever rewrites labels it owns. Everything else on a story is
//! somebody else's business and survives every transition untouched.

use crate::config::{GitHubIssuesConfig, ReviewLabels};

/// The label names a tracker adapter considers its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowLabelSet {
    owned: Vec<String>,
}

impl WorkflowLabelSet {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        WorkflowLabelSet {
            owned: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// State and review labels of GitHub Issues stories.
    pub fn for_github_issues(config: &GitHubIssuesConfig) -> Self {
        let review = &config.review_labels;
        Self::new([
            &config.approved_label,
            &config.being_implemented_label,
            &config.implemented_label,
            &review.reviewed,
            &review.skip_review,
            &review.testing_passed,
            &review.testing_failed,
            &review.testing_skipped,
            &config.staged_label,
            &config.rejected_label,
        ])
    }

    /// Review and testing labels only; story state lives elsewhere.
    pub fn for_review(labels: &ReviewLabels) -> Self {
        Self::new([
            &labels.reviewed,
            &labels.skip_review,
            &labels.testing_passed,
            &labels.testing_failed,
            &labels.testing_skipped,
        ])
    }

    pub fn owns(&self, label: &str) -> bool {
        self.owned.iter().any(|l| l == label)
    }
}

/// Computes the label set after a workflow transition.
///
/// The result keeps, in their current order, every label that is either not
/// owned or explicitly kept, then appends the `add` labels that are not
/// already present. Owned labels that are neither kept nor added are dropped.
pub fn replace_workflow_labels(
    current: &[String],
    owned: &WorkflowLabelSet,
    add: &[&str],
    keep: &[&str],
) -> Vec<String> {
    let mut labels: Vec<String> = current
        .iter()
        .filter(|label| {
            let name = label.as_str();
            !owned.owns(name) || keep.contains(&name) || add.contains(&name)
        })
        .cloned()
        .collect();

    for label in add {
        if !labels.iter().any(|l| l == label) {
            labels.push((*label).to_string());
        }
    }
    labels
}

/// Picks the testing outcome to carry across a transition.
///
/// Passed wins over skipped. A failed outcome is never carried: the story has
/// to go through testing again.
pub fn best_testing_label<'a>(current: &[String], labels: &'a ReviewLabels) -> Option<&'a str> {
    let has = |name: &str| current.iter().any(|l| l == name);

    if has(&labels.testing_passed) {
        Some(&labels.testing_passed)
    } else if has(&labels.testing_skipped) {
        Some(&labels.testing_skipped)
    } else {
        None
    }
}

/// Returns whether two label lists hold the same labels, ignoring order.
pub fn same_labels(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().all(|l| b.contains(l))
}
