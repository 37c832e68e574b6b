//! Event routing.
//!
//! GitHub sends every subscribed event type to an endpoint, most of which a
//! given handler has no use for. Each handler type declares the events it
//! handles in [`WebhookHandler::SUPPORTED_EVENTS`]; anything else is accepted
//! and dropped without decoding the payload.

use std::fmt;
use std::future::Future;

use tracing::debug;

use super::events::GitHubEvent;
use super::parser::{ParseError, parse_event};

/// The `X-GitHub-Event` values the relay knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Issues,
    IssueComment,
    CommitComment,
    Push,
}

const EVENT_KINDS: &[(&str, EventKind)] = &[
    ("issues", EventKind::Issues),
    ("issue_comment", EventKind::IssueComment),
    ("commit_comment", EventKind::CommitComment),
    ("push", EventKind::Push),
];

impl EventKind {
    pub fn from_header(value: &str) -> Option<Self> {
        EVENT_KINDS
            .iter()
            .find(|(name, _)| *name == value)
            .map(|(_, kind)| *kind)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Issues => "issues",
            EventKind::IssueComment => "issue_comment",
            EventKind::CommitComment => "commit_comment",
            EventKind::Push => "push",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A handler for decoded GitHub events.
pub trait WebhookHandler: Send + Sync {
    /// Events this handler processes. Only these are decoded and passed to
    /// [`handle`](Self::handle).
    const SUPPORTED_EVENTS: &'static [EventKind];

    type Output;
    type Error: From<ParseError>;

    fn handle(
        &self,
        event: GitHubEvent,
    ) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;
}

/// Decodes the payload and dispatches it to `handler`.
///
/// Returns `Ok(None)` when the event type is unknown or not supported by the
/// handler; such deliveries are acknowledged without doing any work.
pub async fn route<H: WebhookHandler>(
    handler: &H,
    event_type: &str,
    payload: &[u8],
) -> Result<Option<H::Output>, H::Error> {
    let Some(kind) = EventKind::from_header(event_type) else {
        debug!(event_type, "Ignoring unknown event type");
        return Ok(None);
    };
    if !H::SUPPORTED_EVENTS.contains(&kind) {
        debug!(event_type, "Ignoring unsupported event type");
        return Ok(None);
    }

    let event = parse_event(kind, payload)?;
    handler.handle(event).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records the kinds of events it receives.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<EventKind>>,
    }

    impl WebhookHandler for Recorder {
        const SUPPORTED_EVENTS: &'static [EventKind] = &[EventKind::Push];

        type Output = ();
        type Error = ParseError;

        async fn handle(&self, event: GitHubEvent) -> Result<(), ParseError> {
            self.seen.lock().unwrap().push(event.kind());
            Ok(())
        }
    }

    const PUSH: &[u8] = br#"{"commits": [], "repository": {"owner": {"login": "a"}, "name": "b"}}"#;

    #[test]
    fn header_table_round_trips() {
        for (name, kind) in EVENT_KINDS {
            assert_eq!(EventKind::from_header(name), Some(*kind));
            assert_eq!(kind.as_str(), *name);
        }
        assert_eq!(EventKind::from_header("pull_request"), None);
        assert_eq!(EventKind::from_header("Push"), None);
    }

    #[tokio::test]
    async fn supported_event_is_dispatched() {
        let handler = Recorder::default();
        let result = route(&handler, "push", PUSH).await.unwrap();

        assert_eq!(result, Some(()));
        assert_eq!(*handler.seen.lock().unwrap(), vec![EventKind::Push]);
    }

    #[tokio::test]
    async fn unknown_event_is_ignored() {
        let handler = Recorder::default();
        let result = route(&handler, "deployment_status", b"{}").await.unwrap();

        assert_eq!(result, None);
        assert!(handler.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsupported_event_is_ignored_without_decoding() {
        let handler = Recorder::default();
        let result = route(&handler, "issues", b"not json").await.unwrap();

        assert_eq!(result, None);
        assert!(handler.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_supported_event_is_an_error() {
        let handler = Recorder::default();
        let result = route(&handler, "push", b"{").await;

        assert!(matches!(result, Err(ParseError::JsonError(_))));
    }
}
