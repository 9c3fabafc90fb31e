// ── Streamchat: Error Types ────────────────────────────────────────────────
// Single canonical error enum for the crate, built with `thiserror`.
//
// Design rules:
//   • Exactly two variants, matching the two failure classes the client can
//     hit: bad local configuration vs. a failed network exchange.
//   • Malformed stream frames are NOT errors — the decoder skips them
//     (see sse.rs), so they never reach this enum.
//   • No variant carries secret material (API keys) in its message.

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ChatError {
    /// Endpoint or API key absent or unusable at construction time.
    /// Raised before any request is attempted.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network / HTTP failure while opening or reading the stream:
    /// connection error, timeout, non-2xx status, mid-stream read failure.
    /// Raised once; stream production stops, nothing is replayed.
    #[error("Transport error: {0}")]
    Transport(String),
}

// ── Conversions ────────────────────────────────────────────────────────────

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        ChatError::Transport(e.to_string())
    }
}

// Lets an infallible byte source drive `DeltaStream` directly.
impl From<std::convert::Infallible> for ChatError {
    fn from(e: std::convert::Infallible) -> Self {
        match e {}
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All fallible operations in this crate return this type.
pub type ChatResult<T> = Result<T, ChatError>;
