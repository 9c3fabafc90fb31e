// Streamchat — HTTP client
//
// One outbound operation: POST the completion request and hand back the
// delta stream. Each call opens its own independent request/response pair;
// there is no shared mutable state between invocations and no internal
// retry. Dropping the returned stream closes the underlying connection,
// which is the cancellation mechanism.

use crate::config::Config;
use crate::error::{ChatError, ChatResult};
use crate::request::CompletionRequest;
use crate::sse::DeltaStream;
use bytes::Bytes;
use futures::Stream;
use log::{error, info};
use reqwest::Client;
use std::pin::Pin;
use std::time::Duration;

/// The delta stream produced by a live completion request.
pub type CompletionStream =
    DeltaStream<Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>>;

pub struct ChatClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ChatClient {
    /// Build a client from resolved configuration.
    ///
    /// Connect timeout is 10 s. There is deliberately no overall request
    /// timeout — a long generation keeps the response body open for as
    /// long as the model is producing tokens.
    pub fn new(config: Config) -> ChatResult<Self> {
        if config.api_key.is_empty() {
            return Err(ChatError::Config("API key is missing".into()));
        }
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ChatError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(ChatClient {
            client,
            endpoint: config.endpoint,
            api_key: config.api_key,
        })
    }

    /// Send one streaming completion request.
    ///
    /// A non-2xx status or connection failure surfaces as
    /// `ChatError::Transport` before any delta is produced. A 2xx response
    /// yields the lazy delta stream; malformed frames inside it are
    /// skipped, never raised (see sse.rs).
    pub async fn stream_completion(
        &self,
        request: &CompletionRequest,
    ) -> ChatResult<CompletionStream> {
        info!(
            "[chat] POST {} (max_tokens={}, temperature={})",
            self.endpoint, request.max_tokens, request.temperature
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                "[chat] completion request failed: {} {}",
                status.as_u16(),
                truncate_utf8(&body, 500)
            );
            return Err(ChatError::Transport(format!(
                "API error {}: {}",
                status.as_u16(),
                truncate_utf8(&body, 200)
            )));
        }

        let bytes: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>> =
            Box::pin(response.bytes_stream());
        Ok(DeltaStream::new(bytes))
    }
}

/// Truncate to at most `max` bytes without splitting a UTF-8 character.
pub(crate) fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ── Tests ──────────────────────────────────────────────────────────────────
