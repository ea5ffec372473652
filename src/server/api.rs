use axum::{
    body::{ Body, Bytes },
    extract::State,
    http::{ header::{ CACHE_CONTROL, CONTENT_TYPE }, StatusCode },
    response::{ IntoResponse, Response },
    routing::post,
    Json,
    Router,
};
use log::{ debug, info };
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{ Any, CorsLayer };
use crate::models::api::{ ChatCompletion, ChatRequest };
use crate::models::chat::{ Role, WireMessage };

/// Sent before any reply text so clients can start reading immediately.
const FILLER: &[u8] = b" ";
const CHUNK_CHARS: usize = 4;

#[derive(Clone)]
struct AppState {
    chunk_delay: Duration,
}

pub fn router(chunk_delay: Duration) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/chat", post(stream_handler))
        .route("/api/chatMock", post(batch_handler))
        .layer(cors)
        .with_state(AppState { chunk_delay })
}

/// Deterministic reply standing in for a model. Empty when the request
/// carries no text at all.
pub fn echo_reply(messages: &[WireMessage]) -> String {
    if messages.iter().all(|m| m.content.trim().is_empty()) {
        return String::new();
    }
    let last_user = messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.trim())
        .unwrap_or_default();
    format!("Echo: {}", last_user)
}

fn split_chunks(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

async fn stream_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>
) -> Response {
    let reply = echo_reply(&request.messages);
    if reply.is_empty() {
        return (StatusCode::OK, "").into_response();
    }
    info!("Streaming reply of {} chars for {} messages", reply.chars().count(), request.messages.len());

    let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(32);
    let delay = state.chunk_delay;
    tokio::spawn(async move {
        if tx.send(Ok(Bytes::from_static(FILLER))).await.is_err() {
            return;
        }
        for chunk in split_chunks(&reply, CHUNK_CHARS) {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if tx.send(Ok(Bytes::from(chunk))).await.is_err() {
                debug!("Client disconnected mid-stream");
                return;
            }
        }
    });

    (
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8"),
            (CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(ReceiverStream::new(rx)),
    ).into_response()
}

async fn batch_handler(Json(request): Json<ChatRequest>) -> Json<ChatCompletion> {
    let reply = echo_reply(&request.messages);
    info!("Batch reply of {} chars for {} messages", reply.chars().count(), request.messages.len());
    Json(ChatCompletion::assistant(reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use tower::ServiceExt;

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn echo_uses_last_user_message() {
        let messages = vec![
            WireMessage { role: Role::User, content: "first".to_string() },
            WireMessage { role: Role::Assistant, content: "Echo: first".to_string() },
            WireMessage { role: Role::User, content: " second ".to_string() }
        ];
        assert_eq!(echo_reply(&messages), "Echo: second");
        assert_eq!(echo_reply(&[]), "");
    }

    #[test]
    fn chunks_never_split_characters() {
        let chunks = split_chunks("سلام دنیا", 3);
        assert_eq!(chunks.concat(), "سلام دنیا");
        assert!(chunks.iter().all(|c| c.chars().count() <= 3));
    }

    #[tokio::test]
    async fn stream_route_sends_filler_then_text() {
        let app = router(Duration::ZERO);
        let response = app
            .oneshot(post_json("/api/chat", serde_json::json!({
                "messages": [{ "role": "user", "content": "hi there" }]
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(response.headers()[CACHE_CONTROL], "no-cache");
        assert_eq!(body_text(response).await, " Echo: hi there");
    }

    #[tokio::test]
    async fn stream_route_returns_empty_body_for_empty_prompt() {
        let app = router(Duration::ZERO);
        let response = app
            .oneshot(post_json("/api/chat", serde_json::json!({ "messages": [] })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn batch_route_returns_single_choice() {
        let app = router(Duration::ZERO);
        let response = app
            .oneshot(post_json("/api/chatMock", serde_json::json!({
                "messages": [{ "role": "user", "content": "ping" }]
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let payload: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "Echo: ping" } }]
            })
        );
    }

    #[tokio::test]
    async fn malformed_body_is_rejected() {
        let app = router(Duration::ZERO);
        let response = app
            .oneshot(post_json("/api/chatMock", serde_json::json!({ "prompt": "x" })))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
