//! Event handlers behind the webhook endpoints.
//!
//! Each handler works against the [`Backends`](crate::effects::Backends) it is
//! given, so the same code runs against the real APIs and the recording mocks.
//!
//! | Endpoint | Handler | Events |
//! |----------|---------|--------|
//! | code review | [`CodeReviewHandler`] | `issues`, `commit_comment`, `push` |
//! | GitHub issue tracking | [`IssueTrackingHandler`] | `issues`, `issue_comment` |
//! | Pivotal Tracker activity | [`handle_activity`] | activity JSON |
//!
//! Every handler is safe to run twice on the same delivery.

mod code_review;
mod issue_tracking;
mod pivotal_activity;

use axum::http::StatusCode;
use thiserror::Error;

use crate::checklist::DecodeError;
use crate::clients::ApiError;
use crate::resolver::ResolveError;
use crate::trackers::{StoryLookupError, UnknownBackendError};
use crate::webhooks::ParseError;

pub use code_review::{CodeReviewHandler, blocker_comment, reject_close_comment, unblock_comment};
pub use issue_tracking::IssueTrackingHandler;
pub use pivotal_activity::handle_activity;

/// Errors that can occur during event handling.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] ParseError),

    #[error("invalid review issue: {0}")]
    Checklist(#[from] DecodeError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    UnknownBackend(#[from] UnknownBackendError),

    #[error(transparent)]
    StoryLookup(#[from] StoryLookupError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl HandlerError {
    /// The HTTP status reported to the webhook sender.
    ///
    /// Downstream failures are 500. Payloads the relay cannot act on are 4xx.
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            HandlerError::Checklist(_)
            | HandlerError::UnknownBackend(_)
            | HandlerError::Resolve(ResolveError::NotFound { .. })
            | HandlerError::Resolve(ResolveError::Ambiguous { .. })
            | HandlerError::StoryLookup(StoryLookupError::MalformedKey { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            HandlerError::Resolve(ResolveError::Api(_))
            | HandlerError::StoryLookup(StoryLookupError::Api(_))
            | HandlerError::Api(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// What a handler did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Something was written to GitHub or a tracker.
    Processed,
    /// Valid delivery with nothing to do.
    Ignored(&'static str),
}
