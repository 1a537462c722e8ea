//! Seams to the host runtime's primitives.
//!
//! # Design
//! The host owns all I/O. Each primitive takes plain request data plus a
//! [`Responder`] and returns a [`TransportTask`] handle right away; the host
//! later calls `success` or `fail` on the responder, from whatever thread
//! or event loop it runs. Only `abort` is required of the handle: the
//! timeout governor uses it to cancel a transfer, and it must tolerate
//! being called on a task that already finished.

use crate::error::HostError;
use crate::http::{
    DownloadFileRequest, DownloadFileResponse, HttpRequest, HttpResponse, UploadFileRequest,
    UploadFileResponse,
};
use crate::settle::Responder;

/// Handle to an in-flight host transfer.
///
/// Dropping the handle must not cancel the transfer.
pub trait TransportTask: Send + Sync {
    fn abort(&self) -> Result<(), HostError>;
}

/// Network primitives of the host runtime.
pub trait HostTransport: Send + Sync + 'static {
    /// Run a generic request and report its terminal state.
    ///
    /// A request that ends without a response (network error, abort) may be
    /// reported either through `fail` or as a `status == 0` success.
    fn request(&self, request: HttpRequest, responder: Responder<HttpResponse>) -> Box<dyn TransportTask>;

    /// Start a platform upload task.
    fn upload_file(
        &self,
        request: UploadFileRequest,
        responder: Responder<UploadFileResponse>,
    ) -> Box<dyn TransportTask>;

    /// Start a platform download task; the file lands at a temporary path.
    fn download_file(
        &self,
        request: DownloadFileRequest,
        responder: Responder<DownloadFileResponse>,
    ) -> Box<dyn TransportTask>;
}

/// A connected host WebSocket.
pub trait WebSocketTask: Send + Sync {
    fn send(&self, message: &str) -> Result<(), HostError>;
    fn close(&self, code: Option<u16>, reason: Option<&str>) -> Result<(), HostError>;
}

/// The host's WebSocket constructor.
pub trait WebSocketConnector: Send + Sync {
    fn connect(&self, url: &str, protocols: &[String]) -> Result<Box<dyn WebSocketTask>, HostError>;
}
