//! HTTP endpoint for inbound Bot Framework activities.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::activity::Activity;
use crate::adapter::BotAdapter;
use crate::error::{ActivityError, Error};

/// Path the channel posts activities to.
pub const MESSAGES_PATH: &str = "/api/messages";

/// Shared state for the message routes.
#[derive(Clone)]
pub struct AppState {
    pub adapter: BotAdapter,
}

/// Structured error body: `{code, message}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

fn error_response(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            code,
            message: message.into(),
        }),
    )
        .into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Activity(err) => {
                warn!(error = %err, "Rejected inbound payload");
                error_response(StatusCode::BAD_REQUEST, "BadRequest", err.to_string())
            }
            err => {
                error!(error = %err, "Error processing {} request", MESSAGES_PATH);
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServer",
                    "Failed to process message request",
                )
            }
        }
    }
}

/// Build the router: `POST /api/messages` plus `/health`.
pub fn message_routes(adapter: BotAdapter) -> Router {
    Router::new()
        .route(
            MESSAGES_PATH,
            post(post_messages).fallback(method_not_allowed),
        )
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { adapter })
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "card-echo-bot"
    }))
}

/// POST /api/messages
///
/// 200 when the turn completed, 400 for a body that is not an activity,
/// 500 when the turn failed.
async fn post_messages(
    State(state): State<AppState>,
    payload: Result<Json<Activity>, JsonRejection>,
) -> Result<Json<serde_json::Value>, Error> {
    info!("POST {} received", MESSAGES_PATH);

    let Json(activity) =
        payload.map_err(|rejection| ActivityError::Malformed(rejection.body_text()))?;
    let outcome = state.adapter.process_activity(activity).await;
    info!("End of request chain reached");
    outcome.map(|()| Json(serde_json::json!({})))
}

/// Any non-POST method on /api/messages.
async fn method_not_allowed(method: Method) -> Response {
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        "MethodNotAllowed",
        format!("{method} is not allowed on this endpoint. Use POST instead."),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, header};
    use tower::ServiceExt;

    use super::*;
    use crate::bot::CardBot;
    use crate::cards::CardTemplate;
    use crate::channels::sender::testing::RecordingSender;

    fn app(sender: Arc<RecordingSender>) -> Router {
        let adapter = BotAdapter::new(CardBot::new(CardTemplate::bundled().unwrap()), sender);
        message_routes(adapter)
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::post(MESSAGES_PATH)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn get_is_method_not_allowed() {
        let resp = app(RecordingSender::new())
            .oneshot(
                Request::get(MESSAGES_PATH)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"type":"message","text":"hi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = json_body(resp).await;
        assert_eq!(body["code"], "MethodNotAllowed");
        assert_eq!(
            body["message"],
            "GET is not allowed on this endpoint. Use POST instead."
        );
    }

    #[tokio::test]
    async fn other_methods_are_not_allowed() {
        for method in [Method::PUT, Method::DELETE, Method::PATCH] {
            let resp = app(RecordingSender::new())
                .oneshot(
                    Request::builder()
                        .method(method.clone())
                        .uri(MESSAGES_PATH)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
            assert_eq!(json_body(resp).await["code"], "MethodNotAllowed");
        }
    }

    #[tokio::test]
    async fn post_message_replies_and_returns_ok() {
        let sender = RecordingSender::new();
        let resp = app(sender.clone())
            .oneshot(post_json(r#"{"type":"message","text":"hi there"}"#))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(sender.texts().await, vec!["You said: hi there"]);
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let sender = RecordingSender::new();
        let resp = app(sender.clone())
            .oneshot(post_json(r#"{"type": "message", "#))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["code"], "BadRequest");
        assert!(body["message"].as_str().unwrap().starts_with("Malformed activity"));
        assert_eq!(sender.attempts().await, 0);
    }

    #[tokio::test]
    async fn body_without_type_is_bad_request() {
        let resp = app(RecordingSender::new())
            .oneshot(post_json(r#"{"text": "hi"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delivery_failure_is_internal_server_error() {
        let sender = RecordingSender::failing_after(0);
        let resp = app(sender)
            .oneshot(post_json(r#"{"type":"message","text":"hi"}"#))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(resp).await;
        assert_eq!(body["code"], "InternalServer");
        assert_eq!(body["message"], "Failed to process message request");
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let resp = app(RecordingSender::new())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["status"], "ok");
    }
}
