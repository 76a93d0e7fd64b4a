//! Per-request transport options.
//!
//! `RequestOptions` is the full, typed set of knobs with defaults.
//! `OptionOverrides` carries only the keys a caller wants to change; merging
//! is shallow and key-by-key.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How DELETE requests are put on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeleteMode {
    /// Send a real `DELETE` verb with no body.
    #[default]
    CustomVerb,
    /// Route DELETE through the GET branch (no custom verb, no body).
    LegacyGet,
}

/// Transport options applied to every job of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    /// Deadline for the whole job in milliseconds. 0 means no deadline.
    pub timeout_ms: u64,
    /// Connect deadline in milliseconds. 0 means bounded only by `timeout_ms`.
    pub connect_timeout_ms: u64,
    pub follow_redirects: bool,
    /// Sent verbatim as `Accept-Encoding`. The body is returned undecoded.
    pub encoding: Option<String>,
    /// Keep the response header block in the raw transport output.
    pub include_headers: bool,
    pub user_agent: String,
    pub delete_mode: DeleteMode,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            connect_timeout_ms: 0,
            follow_redirects: true,
            encoding: None,
            include_headers: true,
            user_agent: default_user_agent(),
            delete_mode: DeleteMode::CustomVerb,
        }
    }
}

impl RequestOptions {
    pub fn timeout(&self) -> Option<Duration> {
        non_zero_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero_millis(self.connect_timeout_ms)
    }

    /// Copy of these options with every key present in `overrides` replaced.
    pub fn merged(&self, overrides: &OptionOverrides) -> RequestOptions {
        let mut merged = self.clone();
        if let Some(v) = overrides.timeout_ms {
            merged.timeout_ms = v;
        }
        if let Some(v) = overrides.connect_timeout_ms {
            merged.connect_timeout_ms = v;
        }
        if let Some(v) = overrides.follow_redirects {
            merged.follow_redirects = v;
        }
        if let Some(v) = &overrides.encoding {
            merged.encoding = Some(v.clone());
        }
        if let Some(v) = overrides.include_headers {
            merged.include_headers = v;
        }
        if let Some(v) = &overrides.user_agent {
            merged.user_agent = v.clone();
        }
        if let Some(v) = overrides.delete_mode {
            merged.delete_mode = v;
        }
        merged
    }

    /// Load options from JSON. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Caller-supplied option keys. `None` leaves the default in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionOverrides {
    pub timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub follow_redirects: Option<bool>,
    pub encoding: Option<String>,
    pub include_headers: Option<bool>,
    pub user_agent: Option<String>,
    pub delete_mode: Option<DeleteMode>,
}

impl OptionOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }

    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = Some(ms);
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = Some(follow);
        self
    }

    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    pub fn include_headers(mut self, include: bool) -> Self {
        self.include_headers = Some(include);
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn delete_mode(mut self, mode: DeleteMode) -> Self {
        self.delete_mode = Some(mode);
        self
    }
}

/// `fanout/<version> (Rust; <os>)`
pub fn default_user_agent() -> String {
    format!(
        "fanout/{} (Rust; {})",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}

fn non_zero_millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}
