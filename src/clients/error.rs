//! Downstream API error type.
//!
//! Every failed call to GitHub, JIRA or Pivotal Tracker surfaces as an
//! [`ApiError`]. The relay does not retry: the error fails the current webhook
//! with HTTP 500 and the hosting service's redelivery converges the state.

use std::fmt;
use thiserror::Error;

/// The service a call was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    GitHub,
    Jira,
    PivotalTracker,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Service::GitHub => "GitHub",
            Service::Jira => "JIRA",
            Service::PivotalTracker => "Pivotal Tracker",
        };
        f.write_str(name)
    }
}

/// What went wrong with a downstream call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The request failed or the service answered with an error status.
    Request,
    /// Credentials for the service are not configured.
    NotConfigured,
    /// The interpreter answered with a response of the wrong shape.
    UnexpectedResponse,
}

/// A failed downstream API call.
#[derive(Debug, Error)]
pub struct ApiError {
    pub service: Service,

    /// The operation that failed (e.g. `issues.edit`), identifying the call site.
    pub operation: &'static str,

    pub kind: ApiErrorKind,

    /// The HTTP status code, if available.
    pub status_code: Option<u16>,

    /// A human-readable description of the error.
    pub message: String,

    /// The underlying client error, if available.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(
                f,
                "{} API error in {} (HTTP {}): {}",
                self.service, self.operation, code, self.message
            ),
            None => write!(
                f,
                "{} API error in {}: {}",
                self.service, self.operation, self.message
            ),
        }
    }
}

impl ApiError {
    /// Wraps an octocrab error.
    pub fn from_octocrab(operation: &'static str, err: octocrab::Error) -> Self {
        Self {
            service: Service::GitHub,
            operation,
            kind: ApiErrorKind::Request,
            status_code: extract_status_code(&err.to_string()),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Wraps a reqwest error.
    pub fn from_reqwest(service: Service, operation: &'static str, err: reqwest::Error) -> Self {
        Self {
            service,
            operation,
            kind: ApiErrorKind::Request,
            status_code: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// An error status with a response body but no client error behind it.
    pub fn status(
        service: Service,
        operation: &'static str,
        status_code: u16,
        message: impl Into<String>,
    ) -> Self {
        Self {
            service,
            operation,
            kind: ApiErrorKind::Request,
            status_code: Some(status_code),
            message: message.into(),
            source: None,
        }
    }

    pub fn not_configured(service: Service, operation: &'static str) -> Self {
        Self {
            service,
            operation,
            kind: ApiErrorKind::NotConfigured,
            status_code: None,
            message: format!("{} credentials are not configured", service),
            source: None,
        }
    }

    pub fn unexpected_response(service: Service, operation: &'static str, got: &str) -> Self {
        Self {
            service,
            operation,
            kind: ApiErrorKind::UnexpectedResponse,
            status_code: None,
            message: format!("unexpected {} response", got),
            source: None,
        }
    }
}

/// Extracts an HTTP status code from an octocrab error message, if present.
///
/// octocrab's `Error` has no stable status accessor across its variants, so
/// this looks for the `status: NNN` pattern and falls back to common codes.
/// `None` only affects the log line, never control flow.
fn extract_status_code(err_str: &str) -> Option<u16> {
    if let Some(idx) = err_str.find("status: ") {
        let digits: String = err_str[idx + 8..]
            .chars()
            .take_while(|c| c.is_ascii_digit())
            .collect();
        if let Ok(code) = digits.parse() {
            return Some(code);
        }
    }

    [404, 422, 403, 401, 429, 500, 502, 503]
        .into_iter()
        .find(|code| err_str.contains(&code.to_string()))
}
