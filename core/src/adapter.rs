//! Adapter assembly for the outer SDK.
//!
//! # Design
//! The SDK probes every known platform adapter with `is_match` and builds
//! the first one that matches through `gen_adapter`. The descriptor hands
//! out host primitives as trait objects; `req_class` is a factory because
//! the SDK creates request executors with its own config.

use std::sync::Arc;

use crate::config::RequestConfig;
use crate::host::{HostTransport, WebSocketConnector};
use crate::platform::{is_match, PlatformCapabilities};
use crate::request::OppoRequest;
use crate::storage::{LocalStorage, StorageType};
use crate::timer::Timer;

/// Runtime name this adapter registers under.
pub const RUNTIME: &str = "oppo_game";

/// Everything the embedding layer provides from the host.
#[derive(Clone)]
pub struct HostBindings {
    pub capabilities: PlatformCapabilities,
    pub transport: Arc<dyn HostTransport>,
    pub timer: Arc<dyn Timer>,
    pub local_storage: Arc<dyn LocalStorage>,
    pub web_socket: Arc<dyn WebSocketConnector>,
}

/// Factory for request executors bound to the host transport.
#[derive(Clone)]
pub struct RequestClass {
    transport: Arc<dyn HostTransport>,
    timer: Arc<dyn Timer>,
}

impl RequestClass {
    pub fn instantiate(&self, config: RequestConfig) -> OppoRequest {
        OppoRequest::new(Arc::clone(&self.transport), Arc::clone(&self.timer), config)
    }
}

/// Descriptor consumed by the outer SDK.
pub struct SdkAdapter {
    pub root: PlatformCapabilities,
    pub req_class: RequestClass,
    pub ws_class: Arc<dyn WebSocketConnector>,
    pub local_storage: Arc<dyn LocalStorage>,
    /// The host has no session storage, so sessions live in local storage.
    pub primary_storage: StorageType,
}

pub fn gen_adapter(bindings: &HostBindings) -> SdkAdapter {
    SdkAdapter {
        root: bindings.capabilities.clone(),
        req_class: RequestClass {
            transport: Arc::clone(&bindings.transport),
            timer: Arc::clone(&bindings.timer),
        },
        ws_class: Arc::clone(&bindings.web_socket),
        local_storage: Arc::clone(&bindings.local_storage),
        primary_storage: StorageType::Local,
    }
}

/// Registration entry the SDK iterates over.
pub struct AdapterModule {
    pub runtime: &'static str,
    pub is_match: fn(&PlatformCapabilities) -> bool,
    pub gen_adapter: fn(&HostBindings) -> SdkAdapter,
}

pub const ADAPTER: AdapterModule = AdapterModule {
    runtime: RUNTIME,
    is_match,
    gen_adapter,
};
