//! Mock Messages API server for tests

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// A request observed by the mock server
#[derive(Debug, Clone)]
pub struct Recorded {
    pub headers: HeaderMap,
    pub body: Value,
}

/// Canned reply for the mock server
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
    pub request_id: Option<&'static str>,
    pub delay: Option<Duration>,
}

impl Reply {
    pub fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            request_id: None,
            delay: None,
        }
    }

    pub fn text(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            request_id: None,
            delay: None,
        }
    }

    pub fn with_request_id(mut self, id: &'static str) -> Self {
        self.request_id = Some(id);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Clone)]
struct MockState {
    reply: Reply,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

/// Handle to a running mock server
pub struct MockServer {
    pub addr: SocketAddr,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

impl MockServer {
    /// Start a server on an ephemeral port answering `POST /v1/messages`
    pub async fn start(reply: Reply) -> Self {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            reply,
            recorded: recorded.clone(),
        };
        let app = Router::new()
            .route("/v1/messages", post(messages))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, recorded }
    }

    pub fn uri(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn requests(&self) -> Vec<Recorded> {
        self.recorded.lock().await.clone()
    }
}

async fn messages(
    State(state): State<MockState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.recorded.lock().await.push(Recorded { headers, body });

    let reply = state.reply;
    if let Some(delay) = reply.delay {
        tokio::time::sleep(delay).await;
    }

    let mut response = (reply.status, reply.body).into_response();
    response.headers_mut().insert(
        "content-type",
        "application/json".parse().unwrap(),
    );
    if let Some(id) = reply.request_id {
        response
            .headers_mut()
            .insert("request-id", id.parse().unwrap());
    }
    response
}

/// A well-formed Messages API success body
pub fn message_response_json() -> Value {
    json!({
        "id": "msg_test123",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": "Hello! How can I help you today?"}],
        "model": "claude-3-haiku-20240307",
        "stop_reason": "end_turn",
        "stop_sequence": null,
        "usage": {"input_tokens": 8, "output_tokens": 12}
    })
}

/// An Anthropic error envelope
pub fn error_response_json(error_type: &str, message: &str) -> Value {
    json!({
        "type": "error",
        "error": {"type": error_type, "message": message}
    })
}

/// An address on which nothing is listening
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
