//! Network adapter core for OPPO mini-game hosts.
//!
//! # Overview
//! Lets a cross-platform SDK run `get`/`post`/`upload`/`download` calls on
//! top of the host's own primitives. The host owns all I/O
//! (host-does-IO pattern): this crate builds the host payloads, turns the
//! host's success/fail callbacks into futures with a fixed response shape,
//! and enforces a per-call-kind timeout.
//!
//! # Design
//! - `OppoRequest` is the executor; `TimeoutGovernor` decides and arms
//!   deadlines; `settle` guarantees a call settles exactly once.
//! - Host primitives, timers and storage are traits, so tests drive time
//!   and transport deterministically (`ManualTimer`).
//! - `is_match` / `gen_adapter` are pure functions over injected host
//!   descriptors.
//! - Payload types serialize in the host's camelCase so they can cross an
//!   FFI boundary as JSON.

pub mod adapter;
pub mod config;
pub mod error;
pub mod host;
pub mod http;
pub mod platform;
pub mod request;
pub mod settle;
pub mod storage;
pub mod timeout;
pub mod timer;
pub mod types;
pub mod url_format;

pub use adapter::{gen_adapter, AdapterModule, HostBindings, RequestClass, SdkAdapter, ADAPTER, RUNTIME};
pub use config::{RawRequestConfig, RequestConfig, DEFAULT_TIMEOUT_MESSAGE};
pub use error::{AdapterError, HostError};
pub use host::{HostTransport, TransportTask, WebSocketConnector, WebSocketTask};
pub use http::{
    DownloadFileRequest, DownloadFileResponse, HttpMethod, HttpRequest, HttpResponse, RequestBody,
    UploadFileRequest, UploadFileResponse,
};
pub use platform::{is_match, PlatformCapabilities};
pub use request::{OppoRequest, ResponseFuture, SdkRequest};
pub use settle::{Pending, Responder};
pub use storage::{LocalStorage, MemoryStorage, StorageType};
pub use timeout::TimeoutGovernor;
pub use timer::{ManualTimer, Timer, TimerHandle, TokioTimer};
pub use types::{
    DownloadOptions, FormData, MethodKind, Payload, RequestOptions, ResponseObject, ResponseType,
    UploadOptions,
};
pub use url_format::format_url;
