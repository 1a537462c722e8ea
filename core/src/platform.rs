//! Host environment detection.
//!
//! # Design
//! Detection is a pure predicate over a [`PlatformCapabilities`] snapshot
//! instead of a probe of process globals. The embedding layer fills the
//! snapshot in once (it can arrive as JSON over the FFI boundary) and the
//! SDK asks [`is_match`] whether this adapter should be selected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Provider name reported by OPPO mini-game hosts.
pub const OPPO_PROVIDER: &str = "OPPO";

/// Which host primitives exist, as observed by the embedding layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlatformCapabilities {
    /// The `qg` namespace is defined.
    pub has_qg: bool,
    pub on_hide: bool,
    pub off_hide: bool,
    pub on_show: bool,
    pub off_show: bool,
    pub get_system_info_sync: bool,
    pub get_provider: bool,
    pub local_storage: bool,
    pub local_storage_get_item: bool,
    pub local_storage_set_item: bool,
    pub web_socket: bool,
    pub xml_http_request: bool,
    /// Result of `qg.getProvider()`, if it could be called.
    pub provider: Option<String>,
    /// Result of `qg.getSystemInfoSync()`, if it could be called.
    pub system_info: Option<Value>,
}

impl PlatformCapabilities {
    /// Snapshot of a host exposing every primitive the adapter needs.
    pub fn oppo(system_info: Value) -> Self {
        Self {
            has_qg: true,
            on_hide: true,
            off_hide: true,
            on_show: true,
            off_show: true,
            get_system_info_sync: true,
            get_provider: true,
            local_storage: true,
            local_storage_get_item: true,
            local_storage_set_item: true,
            web_socket: true,
            xml_http_request: true,
            provider: Some(OPPO_PROVIDER.to_string()),
            system_info: Some(system_info),
        }
    }

    fn has_primitives(&self) -> bool {
        self.has_qg
            && self.on_hide
            && self.off_hide
            && self.on_show
            && self.off_show
            && self.get_system_info_sync
            && self.get_provider
            && self.local_storage
            && self.local_storage_get_item
            && self.local_storage_set_item
            && self.web_socket
            && self.xml_http_request
    }
}

/// Whether the snapshot describes an OPPO mini-game host.
pub fn is_match(caps: &PlatformCapabilities) -> bool {
    if !caps.has_primitives() {
        return false;
    }
    let is_oppo = caps
        .provider
        .as_deref()
        .is_some_and(|p| p.to_uppercase() == OPPO_PROVIDER);
    if !is_oppo {
        return false;
    }
    matches!(&caps.system_info, Some(info) if !matches!(info, Value::Null | Value::Bool(false)))
}
