// Streamchat — streaming chat client for OpenAI-compatible completion
// endpoints.
//
// Layering (one-way dependencies):
//   sse        — pure stream decoding, knows nothing about HTTP
//   request    — wire-format request types
//   client     — one HTTP operation: POST + hand back the delta stream
//   config     — endpoint + API key resolution (env / keychain / file)
//   transcript — caller-owned conversation state
//   error      — the crate's two-variant error taxonomy
//
// The binary (src/main.rs) wires these into an interactive chat loop.

pub mod client;
pub mod config;
pub mod error;
pub mod request;
pub mod sse;
pub mod transcript;

pub use client::{ChatClient, CompletionStream};
pub use error::{ChatError, ChatResult};
