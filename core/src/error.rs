//! Error types for the OPPO adapter.
//!
//! # Design
//! `HostError` is the failure object a host primitive hands to its `fail`
//! callback (`{errMsg, errCode}` on the wire). It stays serializable because
//! `upload` resolves with it as-is instead of rejecting. `AdapterError` is
//! what a caller can actually observe as an `Err`: only `download` rejects
//! with a transport failure, the other variants come from construction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error code attached to failures synthesized by the timeout governor.
pub const ERR_CODE_TIMEOUT: i64 = -1;

/// Error code attached to calls whose host dropped every callback.
pub const ERR_CODE_ABANDONED: i64 = -2;

/// Error code attached to tasks aborted by the host without a reason.
pub const ERR_CODE_ABORTED: i64 = -3;

/// Failure reported by a host transport primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("{err_msg}")]
pub struct HostError {
    pub err_msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err_code: Option<i64>,
}

impl HostError {
    pub fn new(err_msg: impl Into<String>, err_code: Option<i64>) -> Self {
        Self {
            err_msg: err_msg.into(),
            err_code,
        }
    }

    /// Failure routed through a call after its deadline elapsed.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(message, Some(ERR_CODE_TIMEOUT))
    }

    /// The host released the call without ever invoking `success` or `fail`.
    pub fn abandoned() -> Self {
        Self::new("host released the call without settling it", Some(ERR_CODE_ABANDONED))
    }

    pub fn aborted() -> Self {
        Self::new("abort", Some(ERR_CODE_ABORTED))
    }

    pub fn is_timeout(&self) -> bool {
        self.err_code == Some(ERR_CODE_TIMEOUT)
    }
}

/// Errors surfaced by the adapter to its caller.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The host transport failed the call (only `download` rejects with this).
    #[error("host transfer failed: {0}")]
    Transport(#[from] HostError),

    /// The construction config could not be parsed.
    #[error("invalid request config: {0}")]
    Config(String),

    /// A timer could not be created for lack of a runtime.
    #[error("timer unavailable: {0}")]
    Timer(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_error_uses_camel_case_wire_names() {
        let err = HostError::new("net::ERR_FAILED", Some(1000));
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["errMsg"], "net::ERR_FAILED");
        assert_eq!(json["errCode"], 1000);
    }

    #[test]
    fn host_error_without_code_omits_field() {
        let json = serde_json::to_value(HostError::new("fail", None)).unwrap();
        assert!(json.get("errCode").is_none());
        let back: HostError = serde_json::from_str(r#"{"errMsg":"fail"}"#).unwrap();
        assert_eq!(back.err_code, None);
    }

    #[test]
    fn transport_error_displays_host_message() {
        let err = AdapterError::from(HostError::timeout("too slow"));
        assert_eq!(err.to_string(), "host transfer failed: too slow");
    }

    #[test]
    fn timeout_is_recognized() {
        assert!(HostError::timeout("x").is_timeout());
        assert!(!HostError::aborted().is_timeout());
    }
}
