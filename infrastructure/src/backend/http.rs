//! HTTP chat backend adapter.
//!
//! Implements [`ChatBackend`] against the assistant's two endpoints:
//!
//! - **one-shot**: `POST {chat_path}` with `{"message", "session_id"}`,
//!   JSON reply carrying the allocated session id;
//! - **streaming**: `POST {stream_path}` with the same body shape, chunked
//!   body of newline-delimited SSE-style lines decoded by
//!   [`SseLineDecoder`].
//!
//! Non-2xx responses carry a JSON `{"detail": ...}` body which is read
//! eagerly before the error is raised. Credentials ride on the client's
//! cookie store, never on explicit headers.
//!
//! Streaming responses are read by a spawned task that forwards decoded
//! events over a bounded channel; when the caller drops its
//! [`StreamHandle`] (cancellation), the forwarding send fails, the task
//! returns, and dropping the response body aborts the connection.

use crate::backend::sse::SseLineDecoder;
use crate::config::BackendConfig;
use async_trait::async_trait;
use futures::StreamExt;
use safra_application::{BackendError, ChatBackend, OneShotReply, StreamHandle};
use safra_domain::StreamEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Wire shape of both chat endpoints' request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    session_id: Option<&'a str>,
}

/// Wire shape of the one-shot success response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    session_id: String,
    text: String,
    #[serde(default)]
    message_id: Option<String>,
}

/// Wire shape of non-2xx error bodies.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Chat backend over HTTP with cookie-borne credentials.
pub struct HttpChatBackend {
    client: reqwest::Client,
    chat_url: String,
    stream_url: String,
}

impl HttpChatBackend {
    /// Build a backend from configuration.
    ///
    /// The cookie store carries the session credential the same way a
    /// browser would; no auth headers are set here.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            client,
            chat_url: config.chat_url(),
            stream_url: config.stream_url(),
        })
    }

    async fn post(
        &self,
        url: &str,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<reqwest::Response, BackendError> {
        let response = self
            .client
            .post(url)
            .json(&ChatRequest {
                message,
                session_id,
            })
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Read the error body before raising, while the response is alive
        let detail = read_detail(response).await;
        Err(BackendError::Api {
            status: status.as_u16(),
            detail,
        })
    }
}

/// Extract the backend's `detail` message from a failed response, falling
/// back to the raw body or the status text.
async fn read_detail(response: reqwest::Response) -> String {
    let status = response.status();
    match response.text().await {
        Ok(body) => match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => parsed.detail,
            Err(_) if !body.trim().is_empty() => body,
            Err(_) => status.to_string(),
        },
        Err(_) => status.to_string(),
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn complete(
        &self,
        message: &str,
        session_id: Option<&str>,
    ) -> Result<OneShotReply, BackendError> {
        debug!(session = session_id, "one-shot exchange");
        let response = self.post(&self.chat_url, message, session_id).await?;
        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Protocol(e.to_string()))?;

        Ok(OneShotReply {
            session_id: reply.session_id,
            text: reply.text,
            message_id: reply.message_id,
        })
    }

    async fn open_stream(
        &self,
        message: &str,
        session_id: &str,
    ) -> Result<StreamHandle, BackendError> {
        debug!(session = session_id, "streaming exchange");
        let response = self
            .post(&self.stream_url, message, Some(session_id))
            .await?;

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(forward_events(response, tx));
        Ok(StreamHandle::new(rx))
    }
}

/// Reader task: decode body chunks and forward events until the stream
/// terminates or the receiver hangs up.
async fn forward_events(response: reqwest::Response, tx: mpsc::Sender<StreamEvent>) {
    let mut decoder = SseLineDecoder::new();
    let mut body = response.bytes_stream();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                // Mid-stream transport failure surfaces as a stream error
                let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                return;
            }
        };
        trace!("stream chunk: {} bytes", chunk.len());

        for event in decoder.feed(&chunk) {
            let terminal = event.is_terminal();
            if tx.send(event).await.is_err() {
                // Receiver dropped: the exchange was cancelled
                return;
            }
            if terminal {
                return;
            }
        }
    }

    // Body ended without a terminal event; flush any buffered partial line
    if let Some(event) = decoder.finish() {
        let _ = tx.send(event).await;
    }
}
