// Chat endpoints - submit/poll tasks and the synchronous relay

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use super::error::ApiError;
use super::state::AppState;
use crate::config::VERSION;
use crate::gateway::ChatRequest;
use crate::tasks::{Task, TaskStatus};

/// Response for POST /api/chat
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub task_id: String,
    pub status: TaskStatus,
}

/// Response for POST /chat
#[derive(Debug, Serialize)]
pub struct SyncChatResponse {
    /// Assistant text, or the failure description when the call failed
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub tasks: usize,
}

fn require_message(request: &ChatRequest) -> Result<(), ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".to_string()));
    }
    Ok(())
}

/// POST /api/chat - Queue a chat message, answer with the task id at once
pub async fn submit_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    require_message(&request)?;

    let task_id = state.tasks.submit(request);
    tracing::info!(task_id = %task_id, "Chat task queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            task_id,
            status: TaskStatus::Pending,
        }),
    ))
}

/// GET /api/chat/:task_id - Current state of a queued chat
pub async fn poll_chat(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(state.tasks.poll(&task_id)?))
}

/// POST /chat - Relay one message and wait for the answer
///
/// Upstream failures still produce a 200 whose `response` carries the
/// explanation, so a chat UI can render it as the assistant's reply.
pub async fn chat_sync(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<SyncChatResponse>, ApiError> {
    require_message(&request)?;

    let body = match state.runner.run(request).await {
        Ok(response) => SyncChatResponse {
            response,
            error: None,
        },
        Err(err) => {
            tracing::warn!(error = %err, "Synchronous chat failed");
            let message = err.to_string();
            SyncChatResponse {
                response: message.clone(),
                error: Some(message),
            }
        }
    };
    Ok(Json(body))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: VERSION,
        tasks: state.tasks.task_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use crate::tasks::ChatRunner;
    use async_trait::async_trait;
    use axum::response::IntoResponse;
    use std::sync::Arc;
    use std::time::Duration;

    /// Echoes the message back, or fails when it says so
    struct EchoRunner;

    #[async_trait]
    impl ChatRunner for EchoRunner {
        async fn run(&self, request: ChatRequest) -> Result<String, GatewayError> {
            if request.message == "fail" {
                return Err(GatewayError::NoEndpoint);
            }
            Ok(format!("echo: {}", request.message))
        }
    }

    fn state() -> AppState {
        AppState::new(Arc::new(EchoRunner))
    }

    #[tokio::test]
    async fn test_submit_then_poll_until_done() {
        let state = state();

        let (status, Json(submitted)) =
            submit_chat(State(state.clone()), Json(ChatRequest::new("Rome")))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(submitted.status, TaskStatus::Pending);

        let mut task = None;
        for _ in 0..200 {
            let Json(polled) = poll_chat(State(state.clone()), Path(submitted.task_id.clone()))
                .await
                .unwrap();
            if polled.status.is_terminal() {
                task = Some(polled);
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let task = task.expect("task should finish");
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.result.as_deref(), Some("echo: Rome"));
    }

    #[tokio::test]
    async fn test_poll_unknown_task_is_404() {
        let err = poll_chat(State(state()), Path("nope".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let err = submit_chat(State(state()), Json(ChatRequest::new("  ")))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = chat_sync(State(state()), Json(ChatRequest::new("")))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sync_chat_returns_answer() {
        let Json(body) = chat_sync(State(state()), Json(ChatRequest::new("Kyoto")))
            .await
            .unwrap();
        assert_eq!(body.response, "echo: Kyoto");
        assert!(body.error.is_none());
    }

    #[tokio::test]
    async fn test_sync_chat_failure_is_still_text() {
        let Json(body) = chat_sync(State(state()), Json(ChatRequest::new("fail")))
            .await
            .unwrap();
        assert_eq!(body.response, GatewayError::NoEndpoint.to_string());
        assert_eq!(body.error.as_deref(), Some(body.response.as_str()));
    }

    #[tokio::test]
    async fn test_health_reports_version() {
        let Json(body) = health(State(state())).await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.version, VERSION);
        assert_eq!(body.tasks, 0);
    }
}
