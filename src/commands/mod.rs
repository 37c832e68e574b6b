//! Command parsing for `!command` tokens.
//!
//! # Supported Commands
//!
//! - `!blocker <summary>` (or `!mustfix <summary>`) in a commit comment raises a review blocker
//! - `!unblock <n>` in a commit message marks blocker `n` fixed
//! - `!reject` in a story issue comment rejects the story
//!
//! # Example
//!
//! ```
//! use review_relay::commands::{parse_commands, Command};
//!
//! let comment = "Careful here.\n!blocker payment race condition";
//! assert_eq!(
//!     parse_commands(comment),
//!     vec![Command::Blocker { summary: "payment race condition".into() }]
//! );
//! ```

mod parser;
mod types;

pub use parser::parse_commands;
pub use types::Command;
