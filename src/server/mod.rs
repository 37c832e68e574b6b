//! HTTP server for the review relay.
//!
//! This module implements the HTTP server that:
//! - Accepts webhooks from GitHub and Pivotal Tracker and processes them inline
//! - Provides health checks for liveness probes
//!
//! # Endpoints
//!
//! - `POST /codereview/github/events` - Review issue lifecycle, blockers and unblocks
//! - `POST /issuetracking/github/events` - GitHub Issues used as the story tracker
//! - `POST /issuetracking/pivotaltracker/events?secret=...` - Pivotal Tracker activity
//! - `POST /events/github`, `POST /events/pivotaltracker` - Older paths of the above
//! - `GET /health` - Returns 200 with the relay version

use std::sync::Arc;

use crate::config::Config;
use crate::effects::Backends;

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::{
    WebhookError, code_review_handler, issue_tracking_handler, pivotal_activity_handler,
};

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor. It holds the
/// configuration and the API clients for one deployment; both are read-only.
pub struct AppState<B> {
    inner: Arc<AppStateInner<B>>,
}

struct AppStateInner<B> {
    config: Config,
    backends: B,
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        AppState {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Backends> AppState<B> {
    pub fn new(config: Config, backends: B) -> Self {
        AppState {
            inner: Arc::new(AppStateInner { config, backends }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn backends(&self) -> &B {
        &self.inner.backends
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router<B: Backends>(app_state: AppState<B>) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/codereview/github/events", post(code_review_handler::<B>))
        .route("/issuetracking/github/events", post(issue_tracking_handler::<B>))
        .route(
            "/issuetracking/pivotaltracker/events",
            post(pivotal_activity_handler::<B>),
        )
        .route("/events/github", post(code_review_handler::<B>))
        .route("/events/pivotaltracker", post(pivotal_activity_handler::<B>))
        .route("/health", get(health_handler))
        .with_state(app_state)
}


#[cfg(test)]
mod integration_tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::checklist::decode;
    use crate::effects::{GitHubEffect, IssueState, SearchPage, StoryData, StoryState};
    use crate::test_utils::{MockBackends, MockGitHub, MockPivotal, backends, issue, repo};
    use crate::types::IssueNumber;
    use crate::webhooks::{compute_signature, format_signature_header};

    const SECRET: &str = "test-secret";
    const SHA: &str = "1a2b3c4d5e6f708192a3b4c5d6e7f8091a2b3c4d";

    fn config_with(vars: &[(&str, &str)]) -> Config {
        Config::from_lookup(|name| {
            if name == "RELAY_GITHUB_TOKEN" {
                return Some("t".into());
            }
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    fn signed_config() -> Config {
        config_with(&[
            ("RELAY_GITHUB_WEBHOOK_SECRET", SECRET),
            ("RELAY_PIVOTALTRACKER_WEBHOOK_SECRET", SECRET),
        ])
    }

    /// Builds the router over `backends` and keeps a handle for inspection.
    fn app(config: Config, backends: MockBackends) -> (axum::Router, AppState<MockBackends>) {
        let state = AppState::new(config, backends);
        (build_router(state.clone()), state)
    }

    /// Creates a webhook request signed with `secret`.
    fn github_request(uri: &str, secret: &[u8], event_type: &str, body: &serde_json::Value) -> Request<Body> {
        let body_bytes = serde_json::to_vec(body).unwrap();
        let signature_header = format_signature_header(&compute_signature(&body_bytes, secret));

        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-github-event", event_type)
            .header("x-github-delivery", "72d3162e-cc78-11e3-81ab-4c9367dc0958")
            .header("x-hub-signature", signature_header)
            .body(Body::from(body_bytes))
            .unwrap()
    }

    fn repository() -> serde_json::Value {
        json!({ "owner": { "login": "acme" }, "name": "shop" })
    }

    fn issues_payload(action: &str, number: u64) -> serde_json::Value {
        json!({
            "action": action,
            "issue": {
                "number": number,
                "title": "Review story PROJ-12: Checkout",
                "state": "closed",
                "html_url": format!("https://github.com/acme/shop/issues/{number}")
            },
            "repository": repository(),
            "sender": { "login": "alice" }
        })
    }

    fn commit_comment_payload(body: &str) -> serde_json::Value {
        json!({
            "action": "created",
            "comment": {
                "html_url": "https://github.com/acme/shop/commit/1a2b3c4#commitcomment-9",
                "commit_id": SHA,
                "body": body,
                "user": { "login": "carol" }
            },
            "repository": repository()
        })
    }

    fn review_issue() -> crate::effects::IssueData {
        issue(
            12,
            "Review story PROJ-12: Checkout",
            "SF-Issue-Tracker: jira\nSF-Story-Key: PROJ-12\n\n\
             The associated commits are following:\n- [ ] 1a2b3c4: Fix the race\n",
            &["review"],
        )
    }

    // ─── Health endpoint tests ───

    #[tokio::test]
    async fn health_returns_200() {
        let (app, _) = app(signed_config(), backends(MockGitHub::new()));

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(health["status"], "ok");
    }

    // ─── Code review endpoint tests ───

    #[tokio::test]
    async fn reject_close_returns_202_and_reopens() {
        let github = MockGitHub::new().with_issue(repo(), review_issue());
        let (app, state) = app(signed_config(), backends(github));

        let request = github_request(
            "/codereview/github/events",
            SECRET.as_bytes(),
            "issues",
            &issues_payload("closed", 12),
        );
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let github = &state.backends().github;
        assert_eq!(github.issue(&repo(), 12).unwrap().state, IssueState::Open);
        assert_eq!(github.comments().len(), 1);
    }

    #[tokio::test]
    async fn blocker_scenario_through_legacy_path() {
        let github = MockGitHub::new()
            .with_issue(repo(), review_issue())
            .with_search_page(
                1,
                SearchPage {
                    total_count: 1,
                    items: vec![review_issue()],
                },
            );
        let (app, state) = app(signed_config(), backends(github));

        let request = github_request(
            "/events/github",
            SECRET.as_bytes(),
            "commit_comment",
            &commit_comment_payload("!blocker payment race condition"),
        );
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let updated = state.backends().github.issue(&repo(), 12).unwrap();
        let decoded = decode(&updated.title, &updated.body).unwrap();
        let blockers = decoded.review_blocker_items();
        assert_eq!(blockers.len(), 1);
        assert_eq!(blockers[0].summary, "payment race condition");
        assert_eq!(state.backends().github.comments().len(), 1);
    }

    #[tokio::test]
    async fn invalid_signature_returns_401_without_calls() {
        let github = MockGitHub::new().with_issue(repo(), review_issue());
        let (app, state) = app(signed_config(), backends(github));

        let request = github_request(
            "/codereview/github/events",
            b"wrong-secret",
            "issues",
            &issues_payload("closed", 12),
        );
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(state.backends().github.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_signature_returns_401() {
        let (app, _) = app(signed_config(), backends(MockGitHub::new()));

        let request = Request::builder()
            .method("POST")
            .uri("/codereview/github/events")
            .header("x-github-event", "push")
            .body(Body::from("{}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unsigned_delivery_accepted_without_secret() {
        let github = MockGitHub::new().with_issue(repo(), review_issue());
        let (app, _) = app(config_with(&[]), backends(github));

        let body = serde_json::to_vec(&issues_payload("labeled", 12)).unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/codereview/github/events")
            .header("x-github-event", "issues")
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn missing_event_header_returns_400() {
        let (app, _) = app(signed_config(), backends(MockGitHub::new()));

        let body_bytes = b"{}".to_vec();
        let signature_header =
            format_signature_header(&compute_signature(&body_bytes, SECRET.as_bytes()));
        let request = Request::builder()
            .method("POST")
            .uri("/codereview/github/events")
            .header("x-hub-signature", signature_header)
            .body(Body::from(body_bytes))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_payload_returns_400() {
        let (app, _) = app(signed_config(), backends(MockGitHub::new()));

        let request = github_request(
            "/codereview/github/events",
            SECRET.as_bytes(),
            "issues",
            &json!({ "action": "closed" }),
        );
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_and_unsupported_events_return_202() {
        for (event_type, uri) in [
            ("deployment", "/codereview/github/events"),
            ("issue_comment", "/codereview/github/events"),
            ("push", "/issuetracking/github/events"),
        ] {
            let (app, state) = app(signed_config(), backends(MockGitHub::new()));
            let request = github_request(uri, SECRET.as_bytes(), event_type, &json!({}));

            let response = app.oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::ACCEPTED, "{event_type} on {uri}");
            assert!(state.backends().github.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn undecodable_review_issue_returns_422() {
        let broken = issue(12, "Review story PROJ-12: Checkout", "no tags here", &["review", "implemented"]);
        let github = MockGitHub::new().with_issue(repo(), broken);
        let (app, _) = app(signed_config(), backends(github));

        let request = github_request(
            "/codereview/github/events",
            SECRET.as_bytes(),
            "issues",
            &issues_payload("closed", 12),
        );
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn downstream_failure_returns_500() {
        let github = MockGitHub::new()
            .with_issue(repo(), review_issue())
            .failing_on("issues.edit");
        let (app, _) = app(signed_config(), backends(github));

        let request = github_request(
            "/codereview/github/events",
            SECRET.as_bytes(),
            "issues",
            &issues_payload("closed", 12),
        );
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    // ─── Issue tracking endpoint tests ───

    #[tokio::test]
    async fn reject_comment_labels_story() {
        let story = issue(5, "Checkout", "", &["enhancement", "implemented"]);
        let github = MockGitHub::new().with_issue(repo(), story);
        let (app, state) = app(signed_config(), backends(github));

        let payload = json!({
            "action": "created",
            "comment": { "body": "!reject", "user": { "login": "bob" } },
            "issue": {
                "number": 5,
                "title": "Checkout",
                "state": "open",
                "html_url": "https://github.com/acme/shop/issues/5"
            },
            "repository": repository()
        });
        let request = github_request(
            "/issuetracking/github/events",
            SECRET.as_bytes(),
            "issue_comment",
            &payload,
        );
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            state.backends().github.mutations(),
            vec![GitHubEffect::ReplaceLabels {
                repo: repo(),
                number: IssueNumber(5),
                labels: vec!["enhancement".into(), "rejected".into()],
            }]
        );
    }

    // ─── Pivotal Tracker endpoint tests ───

    fn pivotal_backends() -> MockBackends {
        let mut backends = backends(MockGitHub::new());
        backends.pivotal = MockPivotal::new().with_story(StoryData {
            project_id: 100,
            story_id: 200,
            state: StoryState::Rejected,
            labels: vec!["reviewed".into(), "qa-".into(), "api".into()],
        });
        backends
    }

    fn activity_request(uri: &str) -> Request<Body> {
        let body = json!({
            "kind": "story_update_activity",
            "project": { "id": 100 },
            "changes": [
                { "kind": "story", "id": 200, "new_values": { "current_state": "rejected" } }
            ]
        });
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn pivotal_activity_with_secret_prunes_labels() {
        let (app, state) = app(signed_config(), pivotal_backends());

        let response = app
            .oneshot(activity_request(&format!(
                "/issuetracking/pivotaltracker/events?secret={SECRET}"
            )))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            state.backends().pivotal.story(100, 200).unwrap().labels,
            vec!["api"]
        );
    }

    #[tokio::test]
    async fn pivotal_activity_secret_mismatch_returns_401() {
        for uri in [
            "/issuetracking/pivotaltracker/events?secret=nope",
            "/events/pivotaltracker",
        ] {
            let (app, state) = app(signed_config(), pivotal_backends());

            let response = app.oneshot(activity_request(uri)).await.unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
            assert!(state.backends().pivotal.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn pivotal_activity_without_secret_configured() {
        let (app, state) = app(config_with(&[]), pivotal_backends());

        let response = app
            .oneshot(activity_request("/events/pivotaltracker"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            state.backends().pivotal.story(100, 200).unwrap().labels,
            vec!["api"]
        );
    }
}
