//! Command types for `!command` tokens in comments and commit messages.

use serde::{Deserialize, Serialize};

/// A parsed `!command`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Raises a review blocker: `!blocker <summary>` at the start of a line.
    ///
    /// `!mustfix <summary>` is accepted as an older spelling.
    Blocker { summary: String },

    /// Marks blocker `n` fixed: `!unblock <n>` anywhere in a commit message.
    Unblock(u32),

    /// Rejects the story: `!reject` anywhere in an issue comment.
    Reject,
}
