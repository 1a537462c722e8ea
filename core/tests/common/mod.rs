//! Scripted host transport shared by the executor tests.
//!
//! Every primitive records its payload and parks the responder so a test can
//! settle the call at the moment it chooses. Aborting a task counts the
//! abort and, unless disabled, fails the call the way a real host task does.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use oppo_adapter_core::{
    DownloadFileRequest, DownloadFileResponse, HostError, HostTransport, HttpRequest, HttpResponse,
    Responder, TransportTask, UploadFileRequest, UploadFileResponse,
};
use parking_lot::Mutex;

pub struct ScriptedTask {
    aborts: Arc<AtomicUsize>,
    on_abort: Option<Box<dyn Fn() + Send + Sync>>,
}

impl TransportTask for ScriptedTask {
    fn abort(&self) -> Result<(), HostError> {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        if let Some(on_abort) = &self.on_abort {
            on_abort();
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct ScriptedHost {
    pub requests: Mutex<Vec<HttpRequest>>,
    pub uploads: Mutex<Vec<UploadFileRequest>>,
    pub downloads: Mutex<Vec<DownloadFileRequest>>,
    http_responders: Mutex<Vec<Responder<HttpResponse>>>,
    upload_responders: Mutex<Vec<Responder<UploadFileResponse>>>,
    download_responders: Mutex<Vec<Responder<DownloadFileResponse>>>,
    aborts: Arc<AtomicUsize>,
    /// When set, aborting a task does not route a failure into the call.
    pub silent_abort: bool,
}

impl ScriptedHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_silent_abort() -> Arc<Self> {
        Arc::new(Self {
            silent_abort: true,
            ..Self::default()
        })
    }

    pub fn aborts(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }

    pub fn http(&self, idx: usize) -> Responder<HttpResponse> {
        self.http_responders.lock()[idx].clone()
    }

    pub fn upload(&self, idx: usize) -> Responder<UploadFileResponse> {
        self.upload_responders.lock()[idx].clone()
    }

    pub fn download(&self, idx: usize) -> Responder<DownloadFileResponse> {
        self.download_responders.lock()[idx].clone()
    }

    fn task<T: Send + 'static>(&self, responder: &Responder<T>) -> Box<dyn TransportTask> {
        let on_abort: Option<Box<dyn Fn() + Send + Sync>> = if self.silent_abort {
            None
        } else {
            let responder = responder.clone();
            Some(Box::new(move || {
                responder.fail(HostError::aborted());
            }))
        };
        Box::new(ScriptedTask {
            aborts: Arc::clone(&self.aborts),
            on_abort,
        })
    }
}

impl HostTransport for ScriptedHost {
    fn request(&self, request: HttpRequest, responder: Responder<HttpResponse>) -> Box<dyn TransportTask> {
        self.requests.lock().push(request);
        let task = self.task(&responder);
        self.http_responders.lock().push(responder);
        task
    }

    fn upload_file(
        &self,
        request: UploadFileRequest,
        responder: Responder<UploadFileResponse>,
    ) -> Box<dyn TransportTask> {
        self.uploads.lock().push(request);
        let task = self.task(&responder);
        self.upload_responders.lock().push(responder);
        task
    }

    fn download_file(
        &self,
        request: DownloadFileRequest,
        responder: Responder<DownloadFileResponse>,
    ) -> Box<dyn TransportTask> {
        self.downloads.lock().push(request);
        let task = self.task(&responder);
        self.download_responders.lock().push(responder);
        task
    }
}

pub fn ok_body(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: Vec::new(),
        body: body.to_string(),
    }
}
