//! C-ABI wrapper around `oppo-adapter-core`.
//!
//! # Overview
//! Lets a native mini-game host drive the adapter without linking to an
//! async runtime. The host supplies its primitives as an [`FfiHostVTable`];
//! the adapter calls them with JSON payloads and the host reports back
//! through `oppo_complete_*` and `oppo_fire_timer`.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Calls are futures polled with a no-op waker. Every entry point that can
//!   settle a call polls the outstanding ones afterwards and runs their
//!   `done` callbacks with no lock held, so callbacks may start new calls.
//! - Strings passed to callbacks are borrowed for the duration of the call;
//!   nothing returned by this crate needs freeing except the adapter itself.

mod host;
pub mod types;

use std::ffi::{c_void, CStr};
use std::future::Future;
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use oppo_adapter_core::{
    is_match, DownloadOptions, OppoRequest, PlatformCapabilities, RequestConfig, RequestOptions, ResponseFuture,
    UploadOptions,
};
use serde::de::DeserializeOwned;

use host::{HostShared, VTableHost, VTableTimer};
use types::*;

fn read_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

impl FfiAdapter {
    /// Poll every outstanding call once and deliver the finished ones.
    fn drive(&self) {
        let mut cx = Context::from_waker(Waker::noop());
        let mut finished = Vec::new();
        {
            let mut calls = self.calls.lock();
            let ready: Vec<_> = calls
                .pending
                .iter_mut()
                .filter_map(|(id, call)| match Pin::new(&mut call.future).poll(&mut cx) {
                    Poll::Ready(outcome) => Some((*id, outcome)),
                    Poll::Pending => None,
                })
                .collect();
            for (id, outcome) in ready {
                if let Some(call) = calls.pending.remove(&id) {
                    finished.push(Completion::new(id, call, outcome));
                }
            }
        }
        finished.sort_by_key(|completion| completion.request_id);
        for completion in finished {
            completion.deliver();
        }
    }

    fn track(&self, future: ResponseFuture, done: FfiDoneCallback, user_data: *mut c_void) -> u64 {
        let request_id = {
            let mut calls = self.calls.lock();
            calls.next_id += 1;
            let request_id = calls.next_id;
            calls.pending.insert(
                request_id,
                PendingCall {
                    future,
                    done,
                    user_data: UserData(user_data),
                },
            );
            request_id
        };
        self.drive();
        request_id
    }
}

impl Drop for FfiAdapter {
    fn drop(&mut self) {
        self.host.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Adapter lifecycle
// ---------------------------------------------------------------------------

/// Create an adapter over the host primitives in `vtable`.
///
/// `config_json` may be null for the defaults (no timeout). Returns null if
/// `vtable` is null, the config does not parse, or an internal panic occurs.
/// The vtable is copied. The caller must free the returned pointer with
/// `oppo_adapter_free`.
#[unsafe(no_mangle)]
pub extern "C" fn oppo_adapter_new(
    vtable: *const FfiHostVTable,
    config_json: *const c_char,
) -> *mut FfiAdapter {
    catch_unwind(|| {
        if vtable.is_null() {
            return std::ptr::null_mut();
        }
        let vtable = unsafe { *vtable };
        let config = if config_json.is_null() {
            RequestConfig::default()
        } else {
            let parsed = read_str(config_json)
                .ok_or_else(|| oppo_adapter_core::AdapterError::Config("config is not UTF-8".to_string()))
                .and_then(RequestConfig::from_json);
            match parsed {
                Ok(config) => config,
                Err(err) => {
                    tracing::warn!(error = %err, "rejecting adapter config");
                    return std::ptr::null_mut();
                }
            }
        };
        let shared = HostShared::new(vtable);
        let request = OppoRequest::new(
            Arc::new(VTableHost {
                shared: Arc::clone(&shared),
            }),
            Arc::new(VTableTimer {
                shared: Arc::clone(&shared),
            }),
            config,
        );
        Box::into_raw(Box::new(FfiAdapter {
            request,
            host: shared,
            calls: parking_lot::Mutex::new(CallTable::default()),
        }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free an adapter created by `oppo_adapter_new`. Safe to call with null.
///
/// Armed deadlines are cleared through `clear_timeout`; calls still in
/// flight are dropped without invoking their `done` callback. Must not be
/// called from inside a callback of the same adapter.
#[unsafe(no_mangle)]
pub extern "C" fn oppo_adapter_free(adapter: *mut FfiAdapter) {
    if !adapter.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(adapter) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

fn start_call<O: DeserializeOwned>(
    adapter: *const FfiAdapter,
    options_json: *const c_char,
    done: Option<FfiDoneCallback>,
    user_data: *mut c_void,
    issue: fn(&OppoRequest, O) -> ResponseFuture,
) -> u64 {
    catch_unwind(AssertUnwindSafe(|| {
        let Some(done) = done else {
            return 0;
        };
        if adapter.is_null() {
            return 0;
        }
        let adapter = unsafe { &*adapter };
        let Some(text) = read_str(options_json) else {
            return 0;
        };
        let options: O = match serde_json::from_str(text) {
            Ok(options) => options,
            Err(err) => {
                tracing::warn!(error = %err, "rejecting call options");
                return 0;
            }
        };
        let future = issue(&adapter.request, options);
        adapter.track(future, done, user_data)
    }))
    .unwrap_or(0)
}

/// Start a `get`. `options_json` is `{url, headers?, data?, responseType?}`.
///
/// Returns the request id passed to `done`, or 0 if an argument is null or
/// the options do not parse (`done` is not invoked then). `done` may run
/// before this function returns.
#[unsafe(no_mangle)]
pub extern "C" fn oppo_request_get(
    adapter: *const FfiAdapter,
    options_json: *const c_char,
    done: Option<FfiDoneCallback>,
    user_data: *mut c_void,
) -> u64 {
    start_call::<RequestOptions>(adapter, options_json, done, user_data, OppoRequest::get)
}

/// Start a `post`. Same contract as `oppo_request_get`.
#[unsafe(no_mangle)]
pub extern "C" fn oppo_request_post(
    adapter: *const FfiAdapter,
    options_json: *const c_char,
    done: Option<FfiDoneCallback>,
    user_data: *mut c_void,
) -> u64 {
    start_call::<RequestOptions>(adapter, options_json, done, user_data, OppoRequest::post)
}

/// Start an `upload`. `options_json` is `{url, file, data?, headers?}`.
#[unsafe(no_mangle)]
pub extern "C" fn oppo_request_upload(
    adapter: *const FfiAdapter,
    options_json: *const c_char,
    done: Option<FfiDoneCallback>,
    user_data: *mut c_void,
) -> u64 {
    start_call::<UploadOptions>(adapter, options_json, done, user_data, OppoRequest::upload)
}

/// Start a `download`. `options_json` is `{url, headers?}`. Only this call
/// kind reports `FfiStatus::Transport` to `done`.
#[unsafe(no_mangle)]
pub extern "C" fn oppo_request_download(
    adapter: *const FfiAdapter,
    options_json: *const c_char,
    done: Option<FfiDoneCallback>,
    user_data: *mut c_void,
) -> u64 {
    start_call::<DownloadOptions>(adapter, options_json, done, user_data, OppoRequest::download)
}

// ---------------------------------------------------------------------------
// Host events
// ---------------------------------------------------------------------------

fn host_event(adapter: *const FfiAdapter, event: impl FnOnce(&FfiAdapter) -> FfiStatus) -> FfiStatus {
    catch_unwind(AssertUnwindSafe(|| {
        if adapter.is_null() {
            return FfiStatus::NullArg;
        }
        let adapter = unsafe { &*adapter };
        let status = event(adapter);
        adapter.drive();
        status
    }))
    .unwrap_or(FfiStatus::Panic)
}

/// Report a finished transfer. `response_json` is the payload the host's
/// `success` callback received for the transfer's kind.
///
/// Returns `InvalidArgument` for an unknown (already settled or aborted)
/// transfer, or for a payload that does not parse; the call then fails.
#[unsafe(no_mangle)]
pub extern "C" fn oppo_complete_success(
    adapter: *const FfiAdapter,
    transfer_id: u64,
    response_json: *const c_char,
) -> FfiStatus {
    host_event(adapter, |adapter| match read_str(response_json) {
        Some(text) => adapter.host.complete_success(transfer_id, text),
        None => adapter
            .host
            .complete_fail(transfer_id, r#"{"errMsg":"missing host response"}"#),
    })
}

/// Report a failed transfer. `error_json` is `{errMsg, errCode?}`; any
/// other text becomes the error message.
#[unsafe(no_mangle)]
pub extern "C" fn oppo_complete_fail(
    adapter: *const FfiAdapter,
    transfer_id: u64,
    error_json: *const c_char,
) -> FfiStatus {
    host_event(adapter, |adapter| {
        let text = read_str(error_json).unwrap_or("");
        adapter.host.complete_fail(transfer_id, text)
    })
}

/// Fire a deadline armed through `set_timeout`.
///
/// Returns `InvalidArgument` if the timer already fired or was cleared.
#[unsafe(no_mangle)]
pub extern "C" fn oppo_fire_timer(adapter: *const FfiAdapter, timer_id: u64) -> FfiStatus {
    host_event(adapter, |adapter| adapter.host.fire_timer(timer_id))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Whether the described host is an OPPO mini-game host.
///
/// `capabilities_json` is a camelCase `PlatformCapabilities` object. Null or
/// malformed input yields false.
#[unsafe(no_mangle)]
pub extern "C" fn oppo_is_match(capabilities_json: *const c_char) -> bool {
    catch_unwind(|| {
        read_str(capabilities_json)
            .and_then(|text| serde_json::from_str::<PlatformCapabilities>(text).ok())
            .is_some_and(|caps| is_match(&caps))
    })
    .unwrap_or(false)
}

/// Number of calls whose `done` callback has not run yet. 0 for null.
#[unsafe(no_mangle)]
pub extern "C" fn oppo_pending_count(adapter: *const FfiAdapter) -> u32 {
    catch_unwind(AssertUnwindSafe(|| {
        if adapter.is_null() {
            return 0;
        }
        let adapter = unsafe { &*adapter };
        u32::try_from(adapter.calls.lock().pending.len()).unwrap_or(u32::MAX)
    }))
    .unwrap_or(0)
}
