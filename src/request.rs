// Streamchat — Completion request types
// These serialize to the exact wire format the completion endpoint expects.
// Independent of the HTTP layer; client.rs only ever sees the final JSON.

use serde::{Deserialize, Serialize};

// ── Messages ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "you",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

// ── Sampling parameters ────────────────────────────────────────────────────

/// Caller-facing generation knobs, forwarded verbatim into the request body.
/// No local validation — the remote API enforces its own ranges.
#[derive(Debug, Clone, Copy)]
pub struct SamplingParams {
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        SamplingParams {
            max_tokens: 1000,
            temperature: 0.7,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

// ── Completion request ─────────────────────────────────────────────────────

/// One outbound completion request. Constructed per user turn, sent once,
/// discarded after the stream ends or errors. `stream` is always true —
/// this client has no non-streaming path.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub stream: bool,
}

impl CompletionRequest {
    /// Build a streaming request carrying a single user message.
    pub fn from_prompt(prompt: &str, params: &SamplingParams) -> Self {
        CompletionRequest {
            messages: vec![ChatMessage {
                role: Role::User,
                content: prompt.to_string(),
            }],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            frequency_penalty: params.frequency_penalty,
            presence_penalty: params.presence_penalty,
            stream: true,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
