//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Payloads cross the boundary as JSON text in the same camelCase shapes
//! the core crate serializes, so only identifiers, status codes and the
//! host vtable need a C layout. Ownership of strings never changes hands:
//! every `*const c_char` handed to a callback is valid only for the
//! duration of that callback.

use std::collections::HashMap;
use std::ffi::{c_void, CString};
use std::os::raw::c_char;
use std::sync::Arc;

use oppo_adapter_core::{AdapterError, HostError, ResponseObject};
use serde_json::json;

use crate::host::HostShared;

/// Result code passed to completion callbacks and returned by entry points.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiStatus {
    /// The call resolved; the JSON is a response object.
    Ok = 0,
    /// The call rejected with a host error; the JSON is `{errMsg, errCode?}`.
    Transport = 1,
    Config = 2,
    Timer = 3,
    /// Malformed JSON or an unknown transfer/timer id.
    InvalidArgument = 4,
    NullArg = 5,
    Panic = 6,
}

/// Invoked once per call with its outcome. `json` is only valid during the
/// callback.
pub type FfiDoneCallback =
    extern "C" fn(user_data: *mut c_void, request_id: u64, status: FfiStatus, json: *const c_char);

/// Host primitives the adapter drives.
///
/// Each transfer function receives a fresh `transfer_id` and the request
/// as JSON; the host reports back through `oppo_complete_success` or
/// `oppo_complete_fail` with the same id, possibly before returning.
/// `set_timeout` must arrange a later `oppo_fire_timer(timer_id)` unless
/// `clear_timeout` is called for that id first.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct FfiHostVTable {
    pub ctx: *mut c_void,
    pub send_request: extern "C" fn(ctx: *mut c_void, transfer_id: u64, request_json: *const c_char),
    pub upload_file: extern "C" fn(ctx: *mut c_void, transfer_id: u64, request_json: *const c_char),
    pub download_file: extern "C" fn(ctx: *mut c_void, transfer_id: u64, request_json: *const c_char),
    /// Returns 0 on success; anything else is reported as an abort failure.
    pub abort: extern "C" fn(ctx: *mut c_void, transfer_id: u64) -> i32,
    pub set_timeout: extern "C" fn(ctx: *mut c_void, timer_id: u64, delay_ms: u64),
    pub clear_timeout: extern "C" fn(ctx: *mut c_void, timer_id: u64),
}

// The host guarantees `ctx` may be used from whichever thread calls into
// the adapter.
unsafe impl Send for FfiHostVTable {}
unsafe impl Sync for FfiHostVTable {}

/// Opaque adapter handle. C callers receive a pointer to this and pass it
/// back into every FFI function.
pub struct FfiAdapter {
    pub(crate) request: oppo_adapter_core::OppoRequest,
    pub(crate) host: Arc<HostShared>,
    pub(crate) calls: parking_lot::Mutex<CallTable>,
}

/// Calls whose completion callback has not run yet.
#[derive(Default)]
pub(crate) struct CallTable {
    pub(crate) next_id: u64,
    pub(crate) pending: HashMap<u64, PendingCall>,
}

pub(crate) struct PendingCall {
    pub(crate) future: oppo_adapter_core::ResponseFuture,
    pub(crate) done: FfiDoneCallback,
    pub(crate) user_data: UserData,
}

/// Opaque caller pointer, handed back untouched.
#[derive(Clone, Copy)]
pub(crate) struct UserData(pub(crate) *mut c_void);

unsafe impl Send for UserData {}

/// A finished call waiting for its callback.
pub(crate) struct Completion {
    pub(crate) request_id: u64,
    pub(crate) done: FfiDoneCallback,
    pub(crate) user_data: UserData,
    pub(crate) status: FfiStatus,
    pub(crate) json: CString,
}

impl Completion {
    pub(crate) fn new(
        request_id: u64,
        call: PendingCall,
        outcome: Result<ResponseObject, AdapterError>,
    ) -> Self {
        let (status, json) = outcome_json(outcome);
        Self {
            request_id,
            done: call.done,
            user_data: call.user_data,
            status,
            json,
        }
    }

    pub(crate) fn deliver(self) {
        (self.done)(self.user_data.0, self.request_id, self.status, self.json.as_ptr());
    }
}

pub(crate) fn outcome_json(outcome: Result<ResponseObject, AdapterError>) -> (FfiStatus, CString) {
    let (status, text) = match outcome {
        Ok(response) => (FfiStatus::Ok, serde_json::to_string(&response)),
        Err(AdapterError::Transport(err)) => (FfiStatus::Transport, serde_json::to_string(&err)),
        Err(AdapterError::Config(msg)) => (FfiStatus::Config, Ok(json!({ "errMsg": msg }).to_string())),
        Err(AdapterError::Timer(msg)) => (FfiStatus::Timer, Ok(json!({ "errMsg": msg }).to_string())),
    };
    let text = text.unwrap_or_else(|err| json!({ "errMsg": err.to_string() }).to_string());
    (status, to_c_string(text))
}

/// Interior NULs cannot cross as C strings; they are dropped.
pub(crate) fn to_c_string(text: String) -> CString {
    CString::new(text).unwrap_or_else(|err| {
        let mut bytes = err.into_vec();
        bytes.retain(|b| *b != 0);
        CString::new(bytes).unwrap_or_default()
    })
}

/// Parse a host failure object, falling back to using the raw text as the
/// message.
pub(crate) fn parse_host_error(text: &str) -> HostError {
    serde_json::from_str(text).unwrap_or_else(|_| HostError::new(text, None))
}
