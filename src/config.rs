// Streamchat — Configuration
//
// Resolves the two things the client needs before any request is made:
// the completion endpoint URL and the API key. The key is never read from
// a flag or a config file — it lives in the environment or the OS keychain
// (the delegated secrets store). A missing key is fatal at construction
// time; no request is attempted without one.
//
// Endpoint precedence: --endpoint flag → STREAMCHAT_ENDPOINT env →
// `endpoint` in ~/.streamchat/config.toml.

use crate::error::{ChatError, ChatResult};
use log::{info, warn};
use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable holding the completion endpoint URL.
pub const ENDPOINT_ENV: &str = "STREAMCHAT_ENDPOINT";

/// Environment variable holding the API key (overrides the keychain).
pub const API_KEY_ENV: &str = "STREAMCHAT_API_KEY";

const KEYRING_SERVICE: &str = "streamchat";
const KEYRING_USER: &str = "api-key";

// ── Resolved configuration ─────────────────────────────────────────────────

/// Everything the client needs to open a streamed completion request.
#[derive(Debug, Clone)]
pub struct Config {
    /// Full chat-completions URL, including any deployment path and
    /// query parameters the hosting service requires.
    pub endpoint: String,
    pub api_key: String,
}

impl Config {
    /// Resolve endpoint and API key from flag, environment, config file,
    /// and keychain. Fails with `ChatError::Config` if either is missing.
    pub fn resolve(endpoint_flag: Option<String>) -> ChatResult<Self> {
        let endpoint = endpoint_flag
            .or_else(|| std::env::var(ENDPOINT_ENV).ok().filter(|v| !v.is_empty()))
            .or_else(|| load_config_file().endpoint)
            .ok_or_else(|| {
                ChatError::Config(format!(
                    "no completion endpoint configured (pass --endpoint, set {}, or add \
                     `endpoint` to {})",
                    ENDPOINT_ENV,
                    config_file_path().display()
                ))
            })?;
        let api_key = resolve_api_key()?;
        info!("[chat] using endpoint {}", endpoint);
        Ok(Config { endpoint, api_key })
    }
}

// ── Config file ────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    endpoint: Option<String>,
}

fn config_file_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".streamchat")
        .join("config.toml")
}

fn load_config_file() -> ConfigFile {
    let path = config_file_path();
    let Ok(raw) = std::fs::read_to_string(&path) else {
        return ConfigFile::default();
    };
    match toml::from_str(&raw) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("[chat] ignoring malformed config file {}: {}", path.display(), e);
            ConfigFile::default()
        }
    }
}

// ── API key (env → keychain) ───────────────────────────────────────────────

fn resolve_api_key() -> ChatResult<String> {
    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.is_empty() {
            return Ok(key);
        }
    }
    match keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER).and_then(|e| e.get_password()) {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => Err(ChatError::Config(format!(
            "API key is missing (set {} or run `streamchat set-key`)",
            API_KEY_ENV
        ))),
    }
}

/// Store the API key in the OS keychain.
pub fn store_api_key(key: &str) -> ChatResult<()> {
    keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
        .and_then(|e| e.set_password(key))
        .map_err(|e| ChatError::Config(format!("failed to store API key in keychain: {}", e)))
}

/// Remove the API key from the OS keychain.
pub fn clear_api_key() -> ChatResult<()> {
    keyring::Entry::new(KEYRING_SERVICE, KEYRING_USER)
        .and_then(|e| e.delete_credential())
        .map_err(|e| ChatError::Config(format!("failed to remove API key from keychain: {}", e)))
}

// ── Tests ──────────────────────────────────────────────────────────────────
