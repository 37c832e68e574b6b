//! Webhook decoding and dispatch.
//!
//! This module provides:
//! - Signature verification for GitHub deliveries (HMAC-SHA1)
//! - Typed GitHub events and their payload parser
//! - The event router that hands decoded events to a handler
//! - Pivotal Tracker activity payloads

pub mod activity;
pub mod events;
pub mod parser;
pub mod router;
pub mod signature;

pub use activity::{Activity, Change, parse_activity};
pub use events::{
    CommentAction, CommitCommentEvent, GitHubEvent, IssueCommentEvent, IssueRef, IssuesAction,
    IssuesEvent, PushCommit, PushEvent,
};
pub use parser::{ParseError, parse_event, parse_webhook};
pub use router::{EventKind, WebhookHandler, route};
pub use signature::{
    SignatureError, Verification, check_signature, compute_signature, format_signature_header,
    parse_signature_header, verify_signature,
};
