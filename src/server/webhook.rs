//! Webhook endpoint handlers.
//!
//! Each endpoint authenticates the delivery, hands the raw body to its event
//! handler and answers once processing is done. GitHub and Pivotal Tracker
//! redeliver on failure, so every error maps to a status that says whether a
//! retry can help.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::AppState;
use crate::effects::Backends;
use crate::handlers::{
    CodeReviewHandler, HandlerError, IssueTrackingHandler, Outcome, handle_activity,
};
use crate::webhooks::{ParseError, Verification, WebhookHandler, check_signature, parse_activity, route};

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub delivery ID.
const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header name for the GitHub HMAC-SHA1 signature.
const HEADER_SIGNATURE: &str = "x-hub-signature";

/// Errors that can occur when processing a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Missing required header.
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    /// Invalid signature or shared secret.
    #[error("invalid signature")]
    InvalidSignature,

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

impl From<ParseError> for WebhookError {
    fn from(err: ParseError) -> Self {
        WebhookError::Handler(err.into())
    }
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::MissingHeader(_) => StatusCode::BAD_REQUEST,
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::Handler(e) => e.status(),
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Webhook processing failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Webhook rejected");
        }

        (status, self.to_string()).into_response()
    }
}

/// Code review endpoint: `issues`, `commit_comment` and `push` events from the
/// repositories holding review issues.
///
/// # Response
///
/// - 202 Accepted: Processed, or nothing to do
/// - 400 Bad Request: Missing header or malformed payload
/// - 401 Unauthorized: Invalid signature
/// - 422 Unprocessable Entity: Review issue or story cannot be resolved
/// - 500 Internal Server Error: A downstream API call failed
pub async fn code_review_handler<B: Backends>(
    State(app_state): State<AppState<B>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError> {
    let handler = CodeReviewHandler::new(app_state.backends(), app_state.config());
    github_webhook(&app_state, &handler, &headers, &body).await
}

/// Issue tracking endpoint for GitHub Issues: `issues` and `issue_comment`
/// events from the repositories holding story issues.
pub async fn issue_tracking_handler<B: Backends>(
    State(app_state): State<AppState<B>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError> {
    let handler = IssueTrackingHandler::new(app_state.backends(), app_state.config());
    github_webhook(&app_state, &handler, &headers, &body).await
}

#[derive(Debug, Deserialize)]
pub struct SecretQuery {
    secret: Option<String>,
}

/// Pivotal Tracker activity endpoint.
///
/// Tracker cannot sign deliveries; the webhook URL carries the shared secret
/// as `?secret=...` instead.
pub async fn pivotal_activity_handler<B: Backends>(
    State(app_state): State<AppState<B>>,
    Query(query): Query<SecretQuery>,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError> {
    if let Some(secret) = &app_state.config().pivotal.webhook_secret
        && query.secret.as_deref() != Some(secret.as_str())
    {
        warn!("Pivotal Tracker webhook secret mismatch");
        return Err(WebhookError::InvalidSignature);
    }

    let activity = parse_activity(&body)?;
    debug!(
        project = activity.project.id,
        changes = activity.changes.len(),
        "Received Pivotal Tracker activity"
    );

    let outcome = handle_activity(app_state.backends(), app_state.config(), &activity).await?;
    Ok(accepted("activity", Some(outcome)))
}

/// Authenticates a GitHub delivery and routes it to `handler`.
async fn github_webhook<B: Backends, H>(
    app_state: &AppState<B>,
    handler: &H,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(StatusCode, &'static str), WebhookError>
where
    H: WebhookHandler<Output = Outcome, Error = HandlerError>,
{
    let event_type = get_header(headers, HEADER_EVENT)?;
    let delivery_id = get_header(headers, HEADER_DELIVERY).unwrap_or_default();

    debug!(delivery_id = %delivery_id, event_type = %event_type, "Received webhook");

    // Verify the signature before any parsing.
    let signature = headers.get(HEADER_SIGNATURE).and_then(|v| v.to_str().ok());
    let secret = app_state.config().github.webhook_secret.as_deref();
    match check_signature(body, signature, secret.map(str::as_bytes)) {
        Ok(Verification::Verified) => {}
        Ok(Verification::Skipped) => {
            debug!(delivery_id = %delivery_id, "No webhook secret configured, signature not checked");
        }
        Err(e) => {
            warn!(delivery_id = %delivery_id, error = %e, "Invalid webhook signature");
            return Err(WebhookError::InvalidSignature);
        }
    }

    let outcome = route(handler, &event_type, body).await?;
    Ok(accepted(&event_type, outcome))
}

fn accepted(event_type: &str, outcome: Option<Outcome>) -> (StatusCode, &'static str) {
    match outcome {
        Some(Outcome::Processed) => (StatusCode::ACCEPTED, "Accepted"),
        Some(Outcome::Ignored(reason)) => {
            debug!(event_type, reason, "Nothing to do");
            (StatusCode::ACCEPTED, "Accepted (ignored)")
        }
        None => (StatusCode::ACCEPTED, "Accepted (ignored)"),
    }
}

/// Extracts a required header value as a string.
fn get_header(headers: &HeaderMap, name: &'static str) -> Result<String, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or(WebhookError::MissingHeader(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::DecodeError;

    #[test]
    fn get_header_present() {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_EVENT, "push".parse().unwrap());

        assert_eq!(get_header(&headers, HEADER_EVENT).unwrap(), "push");
    }

    #[test]
    fn get_header_missing() {
        let headers = HeaderMap::new();
        assert!(matches!(
            get_header(&headers, HEADER_EVENT),
            Err(WebhookError::MissingHeader(HEADER_EVENT))
        ));
    }

    #[test]
    fn error_statuses() {
        assert_eq!(
            WebhookError::MissingHeader(HEADER_EVENT).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            WebhookError::InvalidSignature.status(),
            StatusCode::UNAUTHORIZED
        );
        let decode = WebhookError::from(HandlerError::from(DecodeError::MissingTag("SF-Story-Key")));
        assert_eq!(decode.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn ignored_outcomes_are_accepted() {
        assert_eq!(accepted("push", None).0, StatusCode::ACCEPTED);
        assert_eq!(
            accepted("push", Some(Outcome::Ignored("no command"))).0,
            StatusCode::ACCEPTED
        );
        assert_eq!(
            accepted("push", Some(Outcome::Processed)),
            (StatusCode::ACCEPTED, "Accepted")
        );
    }
}
