use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::cli::chat::conversation_state::{Role, Turn};

/// Audit action that marks the visitor as a qualified lead.
pub const UNLOCK_SENTINEL: &str = "UNLOCK_CALENDLY";

/// The three ways a chat exchange can fail. They all end up as the same
/// fallback message for the visitor but are logged apart for operators.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("unexpected response body: {0}")]
    Protocol(#[from] serde_json::Error),
}

impl GateError {
    pub fn kind(&self) -> &'static str {
        match self {
            GateError::Transport(_) => "transport",
            GateError::Server { .. } => "server",
            GateError::Protocol(_) => "protocol",
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    history: Vec<HistoryEntry<'a>>,
}

#[derive(Debug, Serialize)]
struct HistoryEntry<'a> {
    role: Role,
    parts: Vec<&'a str>,
}

impl<'a> From<&'a Turn> for HistoryEntry<'a> {
    fn from(turn: &'a Turn) -> Self {
        Self {
            role: turn.role(),
            parts: vec![turn.text()],
        }
    }
}

/// Lead qualification signal the backend may attach to a reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuditSignal {
    pub action: String,
    #[serde(default)]
    pub score: f64,
}

impl AuditSignal {
    pub fn unlocks_scheduling(&self) -> bool {
        self.action == UNLOCK_SENTINEL
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub silent_audit: Option<AuditSignal>,
}

pub struct GateClient {
    endpoint: Url,
    client: reqwest::Client,
}

impl GateClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send one message along with the turns that came before it.
    ///
    /// A single attempt is made. There is no timeout beyond whatever the
    /// transport itself enforces.
    pub async fn send(&self, message: &str, history: &[Turn]) -> Result<ChatReply, GateError> {
        let request_body = ChatRequest {
            message,
            history: history.iter().map(HistoryEntry::from).collect(),
        };

        debug!(
            endpoint = %self.endpoint,
            history_len = request_body.history.len(),
            "Sending message to chat endpoint"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!(%status, "Chat endpoint rejected the request: {}", body);
            return Err(GateError::Server { status, body });
        }

        debug!("Received response from chat endpoint: {}", body);

        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GateClient {
        let endpoint = Url::parse(&format!("{}/chat", server.uri())).unwrap();
        GateClient::new(endpoint)
    }

    #[tokio::test]
    async fn first_message_sends_empty_history() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({ "message": "Hello", "history": [] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Hi there" })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server).send("Hello", &[]).await.unwrap();
        assert_eq!(reply.response, "Hi there");
        assert_eq!(reply.silent_audit, None);
    }

    #[tokio::test]
    async fn history_is_sent_as_role_and_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_json(json!({
                "message": "Budget is 2M",
                "history": [
                    { "role": "user", "parts": ["Hello"] },
                    { "role": "model", "parts": ["Hi there"] }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "Noted" })))
            .expect(1)
            .mount(&server)
            .await;

        let history = vec![Turn::user("Hello"), Turn::model("Hi there")];
        let reply = client_for(&server).send("Budget is 2M", &history).await.unwrap();
        assert_eq!(reply.response, "Noted");
    }

    #[tokio::test]
    async fn parses_silent_audit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "Let's talk",
                "silent_audit": { "action": "UNLOCK_CALENDLY", "score": 0.92 }
            })))
            .mount(&server)
            .await;

        let reply = client_for(&server).send("Hello", &[]).await.unwrap();
        let audit = reply.silent_audit.expect("audit signal");
        assert!(audit.unlocks_scheduling());
        assert_eq!(audit.score, 0.92);
    }

    #[test]
    fn other_audit_actions_do_not_unlock() {
        let audit: AuditSignal = serde_json::from_value(json!({ "action": "HOLD", "score": 0.1 })).unwrap();
        assert!(!audit.unlocks_scheduling());
    }

    #[tokio::test]
    async fn non_success_status_is_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let err = client_for(&server).send("Hello", &[]).await.unwrap_err();
        match err {
            GateError::Server { status, body } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn wrong_shape_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": "nope" })))
            .mount(&server)
            .await;

        let err = client_for(&server).send("Hello", &[]).await.unwrap_err();
        assert_eq!(err.kind(), "protocol");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = GateClient::new(Url::parse(&format!("http://127.0.0.1:{port}/chat")).unwrap());
        let err = client.send("Hello", &[]).await.unwrap_err();
        assert_eq!(err.kind(), "transport");
    }
}
