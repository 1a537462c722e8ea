//! Host transport and timer backed by a C vtable.
//!
//! Responders wait in a table keyed by transfer id until the host reports
//! back; timer handles wait in a second table keyed by timer id until the
//! host fires them. Vtable functions are always called with both tables
//! unlocked, so a host may complete a transfer from inside `send_request`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use oppo_adapter_core::{
    DownloadFileRequest, DownloadFileResponse, HostError, HostTransport, HttpRequest, HttpResponse, Responder,
    Timer, TimerHandle, TransportTask, UploadFileRequest, UploadFileResponse,
};
use parking_lot::Mutex;
use serde::Serialize;

use crate::types::{parse_host_error, to_c_string, FfiHostVTable, FfiStatus};

/// The responder of one in-flight transfer.
pub(crate) enum Transfer {
    Request(Responder<HttpResponse>),
    Upload(Responder<UploadFileResponse>),
    Download(Responder<DownloadFileResponse>),
}

pub(crate) struct HostShared {
    vtable: FfiHostVTable,
    transfers: Mutex<HashMap<u64, Transfer>>,
    timers: Mutex<HashMap<u64, TimerHandle>>,
    next_transfer: AtomicU64,
}

impl HostShared {
    pub(crate) fn new(vtable: FfiHostVTable) -> Arc<Self> {
        Arc::new(Self {
            vtable,
            transfers: Mutex::new(HashMap::new()),
            timers: Mutex::new(HashMap::new()),
            next_transfer: AtomicU64::new(1),
        })
    }

    fn start(
        self: &Arc<Self>,
        transfer: Transfer,
        request: &impl Serialize,
        call: extern "C" fn(*mut std::ffi::c_void, u64, *const std::os::raw::c_char),
    ) -> Box<dyn TransportTask> {
        let transfer_id = self.next_transfer.fetch_add(1, Ordering::Relaxed);
        let json = match serde_json::to_string(request) {
            Ok(json) => to_c_string(json),
            Err(err) => {
                fail_transfer(transfer, HostError::new(err.to_string(), None));
                return Box::new(VTableTask {
                    shared: Arc::clone(self),
                    transfer_id,
                });
            }
        };
        self.transfers.lock().insert(transfer_id, transfer);
        tracing::trace!(transfer_id, "handing transfer to host");
        call(self.vtable.ctx, transfer_id, json.as_ptr());
        Box::new(VTableTask {
            shared: Arc::clone(self),
            transfer_id,
        })
    }

    /// Deliver a host success payload to a transfer.
    ///
    /// A payload that does not parse for the transfer's kind fails the call
    /// instead, so it still settles.
    pub(crate) fn complete_success(&self, transfer_id: u64, json: &str) -> FfiStatus {
        let Some(transfer) = self.transfers.lock().remove(&transfer_id) else {
            tracing::debug!(transfer_id, "success for unknown transfer");
            return FfiStatus::InvalidArgument;
        };
        let parsed = match &transfer {
            Transfer::Request(responder) => {
                serde_json::from_str(json).map(|response| responder.success(response))
            }
            Transfer::Upload(responder) => {
                serde_json::from_str(json).map(|response| responder.success(response))
            }
            Transfer::Download(responder) => {
                serde_json::from_str(json).map(|response| responder.success(response))
            }
        };
        match parsed {
            Ok(_) => FfiStatus::Ok,
            Err(err) => {
                tracing::warn!(transfer_id, error = %err, "malformed host response");
                fail_transfer(transfer, HostError::new(format!("malformed host response: {err}"), None));
                FfiStatus::InvalidArgument
            }
        }
    }

    pub(crate) fn complete_fail(&self, transfer_id: u64, json: &str) -> FfiStatus {
        let Some(transfer) = self.transfers.lock().remove(&transfer_id) else {
            tracing::debug!(transfer_id, "failure for unknown transfer");
            return FfiStatus::InvalidArgument;
        };
        fail_transfer(transfer, parse_host_error(json));
        FfiStatus::Ok
    }

    pub(crate) fn fire_timer(&self, timer_id: u64) -> FfiStatus {
        let handle = self.timers.lock().remove(&timer_id);
        match handle {
            Some(handle) => {
                handle.fire();
                FfiStatus::Ok
            }
            None => FfiStatus::InvalidArgument,
        }
    }

    /// Cancel every armed deadline and release every parked responder.
    pub(crate) fn shutdown(&self) {
        let timers: Vec<TimerHandle> = self.timers.lock().drain().map(|(_, handle)| handle).collect();
        for handle in timers {
            handle.cancel();
        }
        self.transfers.lock().clear();
    }
}

fn fail_transfer(transfer: Transfer, err: HostError) -> bool {
    match transfer {
        Transfer::Request(responder) => responder.fail(err),
        Transfer::Upload(responder) => responder.fail(err),
        Transfer::Download(responder) => responder.fail(err),
    }
}

struct VTableTask {
    shared: Arc<HostShared>,
    transfer_id: u64,
}

impl TransportTask for VTableTask {
    fn abort(&self) -> Result<(), HostError> {
        // A transfer the host already finished is not aborted again.
        if self.shared.transfers.lock().remove(&self.transfer_id).is_none() {
            return Ok(());
        }
        let code = (self.shared.vtable.abort)(self.shared.vtable.ctx, self.transfer_id);
        if code == 0 {
            Ok(())
        } else {
            Err(HostError::new("host abort failed", Some(i64::from(code))))
        }
    }
}

pub(crate) struct VTableHost {
    pub(crate) shared: Arc<HostShared>,
}

impl HostTransport for VTableHost {
    fn request(&self, request: HttpRequest, responder: Responder<HttpResponse>) -> Box<dyn TransportTask> {
        let call = self.shared.vtable.send_request;
        self.shared.start(Transfer::Request(responder), &request, call)
    }

    fn upload_file(
        &self,
        request: UploadFileRequest,
        responder: Responder<UploadFileResponse>,
    ) -> Box<dyn TransportTask> {
        let call = self.shared.vtable.upload_file;
        self.shared.start(Transfer::Upload(responder), &request, call)
    }

    fn download_file(
        &self,
        request: DownloadFileRequest,
        responder: Responder<DownloadFileResponse>,
    ) -> Box<dyn TransportTask> {
        let call = self.shared.vtable.download_file;
        self.shared.start(Transfer::Download(responder), &request, call)
    }
}

/// `setTimeout`/`clearTimeout` through the vtable.
pub(crate) struct VTableTimer {
    pub(crate) shared: Arc<HostShared>,
}

impl Timer for VTableTimer {
    fn schedule(&self, delay: Duration, handle: TimerHandle) {
        let timer_id = handle.id();
        let shared = Arc::clone(&self.shared);
        handle.on_cancel(move || {
            shared.timers.lock().remove(&timer_id);
            (shared.vtable.clear_timeout)(shared.vtable.ctx, timer_id);
        });
        self.shared.timers.lock().insert(timer_id, handle);
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        (self.shared.vtable.set_timeout)(self.shared.vtable.ctx, timer_id, delay_ms);
    }
}
