// Streamchat — Conversation transcript
//
// An explicit, explicitly-scoped conversation-state object. The caller owns
// it and passes it into rendering; nothing in this crate keeps ambient
// global session state. The transcript is display-only — requests always
// carry just the latest prompt, never the accumulated history.

use crate::request::Role;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Flat, append-only record of one chat session.
#[derive(Debug, Default, Serialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Transcript::default()
    }

    /// Append one entry, stamped with the current time.
    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
