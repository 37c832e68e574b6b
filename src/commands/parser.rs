//! Parser for `!command` tokens.
//!
//! Pure functions over comment and commit message text; the webhook handlers
//! decide which of the returned commands apply to them.

use super::types::Command;

/// Parses every command in the given text, in order of appearance.
///
/// # Parsing Rules
///
/// - `!blocker` and `!mustfix` must start a line (after optional indentation);
///   the rest of the line, trimmed, is the summary. An empty summary is ignored.
/// - `!unblock <n>` and `!reject` may appear anywhere as whitespace-separated
///   words. `<n>` may be written `#n` and must be positive.
/// - Command names are case-insensitive.
///
/// # Examples
///
/// ```
/// use review_relay::commands::{parse_commands, Command};
///
/// assert_eq!(
///     parse_commands("!blocker payment race condition"),
///     vec![Command::Blocker { summary: "payment race condition".into() }]
/// );
/// assert_eq!(
///     parse_commands("Fix the race\n\nThis closes !unblock 2"),
///     vec![Command::Unblock(2)]
/// );
/// assert_eq!(parse_commands("no command here"), vec![]);
/// ```
pub fn parse_commands(text: &str) -> Vec<Command> {
    let mut commands = Vec::new();

    for line in text.lines() {
        if let Some(cmd) = parse_line_command(line.trim_start()) {
            commands.push(cmd);
            continue;
        }
        parse_word_commands(line, &mut commands);
    }

    commands
}

/// Parses a command that owns the whole line.
fn parse_line_command(line: &str) -> Option<Command> {
    let rest = line.strip_prefix('!')?;
    let (cmd_word, summary) = split_first_word(rest);

    match cmd_word.to_ascii_lowercase().as_str() {
        "blocker" | "mustfix" => {
            let summary = summary.trim();
            (!summary.is_empty()).then(|| Command::Blocker {
                summary: summary.to_string(),
            })
        }
        _ => None,
    }
}

/// Collects commands that may appear anywhere in a line.
fn parse_word_commands(line: &str, commands: &mut Vec<Command>) {
    let mut words = line.split_whitespace().peekable();

    while let Some(word) = words.next() {
        if word.eq_ignore_ascii_case("!reject") {
            commands.push(Command::Reject);
        } else if word.eq_ignore_ascii_case("!unblock")
            && let Some(n) = words.peek().and_then(|next| parse_blocker_number(next))
        {
            words.next();
            commands.push(Command::Unblock(n));
        }
    }
}

/// Parses `n` or `#n`, tolerating trailing punctuation such as `2.` or `#2,`.
fn parse_blocker_number(word: &str) -> Option<u32> {
    let word = word.strip_prefix('#').unwrap_or(word);
    let digits = word.trim_end_matches(|c: char| c.is_ascii_punctuation());
    let n: u32 = digits.parse().ok()?;
    (n > 0).then_some(n)
}

/// Splits text at the first whitespace, returning (word, rest).
/// If no whitespace, returns (text, "").
fn split_first_word(text: &str) -> (&str, &str) {
    match text.find(|c: char| c.is_ascii_whitespace()) {
        Some(pos) => (&text[..pos], &text[pos..]),
        None => (text, ""),
    }
}
