//! Construction-time configuration of a request executor.
//!
//! # Design
//! The outer SDK passes a loosely-typed object (`timeout`, `timeoutMsg`,
//! `restrictedMethods`, all optional). It is deserialized into
//! [`RawRequestConfig`] and normalized once into the immutable
//! [`RequestConfig`] every call reads. Falsy values fall back to defaults
//! (`0` timeout, empty message); an explicit empty `restrictedMethods`
//! array is kept and means no call kind is ever timed out.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Deserialize;

use crate::error::AdapterError;
use crate::types::MethodKind;

/// Message logged when a deadline elapses, unless the config overrides it.
pub const DEFAULT_TIMEOUT_MESSAGE: &str = "请求在指定时间内未完成，已中断";

/// Config object as supplied by the outer SDK.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRequestConfig {
    /// Milliseconds; `0` or absent means unbounded.
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub timeout_msg: Option<String>,
    #[serde(default)]
    pub restricted_methods: Option<Vec<MethodKind>>,
}

/// Immutable executor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestConfig {
    timeout: Duration,
    timeout_message: String,
    restricted_methods: BTreeSet<MethodKind>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::ZERO,
            timeout_message: DEFAULT_TIMEOUT_MESSAGE.to_string(),
            restricted_methods: MethodKind::ALL.into_iter().collect(),
        }
    }
}

impl RequestConfig {
    /// A config timing out every call kind after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    pub fn with_timeout_message(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        if !message.is_empty() {
            self.timeout_message = message;
        }
        self
    }

    pub fn with_restricted_methods(mut self, methods: impl IntoIterator<Item = MethodKind>) -> Self {
        self.restricted_methods = methods.into_iter().collect();
        self
    }

    /// Parse the SDK's JSON config object.
    pub fn from_json(text: &str) -> Result<Self, AdapterError> {
        let raw: RawRequestConfig =
            serde_json::from_str(text).map_err(|e| AdapterError::Config(e.to_string()))?;
        Ok(raw.into())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn timeout_message(&self) -> &str {
        &self.timeout_message
    }

    pub fn restricted_methods(&self) -> &BTreeSet<MethodKind> {
        &self.restricted_methods
    }

    /// Whether calls of `kind` get a deadline at all.
    pub fn applies_to(&self, kind: MethodKind) -> bool {
        !self.timeout.is_zero() && self.restricted_methods.contains(&kind)
    }
}

impl From<RawRequestConfig> for RequestConfig {
    fn from(raw: RawRequestConfig) -> Self {
        let mut config = RequestConfig::new(Duration::from_millis(raw.timeout.unwrap_or(0)));
        if let Some(message) = raw.timeout_msg {
            config = config.with_timeout_message(message);
        }
        if let Some(methods) = raw.restricted_methods {
            config = config.with_restricted_methods(methods);
        }
        config
    }
}
