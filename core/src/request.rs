//! Request executor for the OPPO host.
//!
//! # Design
//! `OppoRequest` turns each SDK call into one host primitive call and a
//! [`ResponseFuture`]. Every call follows the same path: build the host
//! payload, open a settlement channel, hand the responder to the host, then
//! let the [`TimeoutGovernor`] arm a deadline bound to that responder.
//! Whichever of success, failure or deadline reaches the responder first
//! settles the call; the others are ignored.
//!
//! How a failure surfaces differs per call kind and is part of the contract:
//! - `get`/`post` never fail; a request that ends without a response
//!   resolves with `statusCode: 0`.
//! - `upload` resolves with the host error object as the result.
//! - `download` rejects with [`AdapterError::Transport`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::RequestConfig;
use crate::error::{AdapterError, HostError};
use crate::host::{HostTransport, TransportTask};
use crate::http::{
    DownloadFileRequest, DownloadFileResponse, HttpMethod, HttpRequest, HttpResponse, RequestBody,
    UploadFileRequest, UploadFileResponse,
};
use crate::settle::{self, Responder};
use crate::timeout::TimeoutGovernor;
use crate::timer::Timer;
use crate::types::{DownloadOptions, MethodKind, Payload, RequestOptions, ResponseObject, UploadOptions};
use crate::url_format::{format_url, DEFAULT_PROTOCOL};

/// Form field that remaps a 200 upload status.
pub const SUCCESS_ACTION_STATUS: &str = "success_action_status";

/// Multipart field name the uploaded file is sent under.
pub const UPLOAD_FILE_FIELD: &str = "file";

/// Eventual result of one executor call.
pub struct ResponseFuture {
    inner: Pin<Box<dyn Future<Output = Result<ResponseObject, AdapterError>> + Send>>,
}

impl ResponseFuture {
    fn new(future: impl Future<Output = Result<ResponseObject, AdapterError>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(future),
        }
    }
}

impl Future for ResponseFuture {
    type Output = Result<ResponseObject, AdapterError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl std::fmt::Debug for ResponseFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ResponseFuture")
    }
}

/// Request surface shared by every platform adapter.
pub trait SdkRequest: Send + Sync {
    fn get(&self, options: RequestOptions) -> ResponseFuture;
    fn post(&self, options: RequestOptions) -> ResponseFuture;
    fn upload(&self, options: UploadOptions) -> ResponseFuture;
    fn download(&self, options: DownloadOptions) -> ResponseFuture;
}

/// Executor bound to one host transport and one immutable config.
pub struct OppoRequest {
    host: Arc<dyn HostTransport>,
    governor: TimeoutGovernor,
}

impl OppoRequest {
    pub fn new(host: Arc<dyn HostTransport>, timer: Arc<dyn Timer>, config: RequestConfig) -> Self {
        Self {
            host,
            governor: TimeoutGovernor::new(config, timer),
        }
    }

    pub fn config(&self) -> &RequestConfig {
        self.governor.config()
    }

    pub fn get(&self, options: RequestOptions) -> ResponseFuture {
        self.request(HttpMethod::Get, options)
    }

    pub fn post(&self, options: RequestOptions) -> ResponseFuture {
        self.request(HttpMethod::Post, options)
    }

    pub fn upload(&self, options: UploadOptions) -> ResponseFuture {
        let call_id = Uuid::new_v4();
        let status_field = options
            .data
            .as_ref()
            .and_then(|data| data.get(SUCCESS_ACTION_STATUS))
            .cloned();
        let request = build_upload_request(options);
        tracing::debug!(call_id = %call_id, method = "upload", url = %request.url, "issuing host upload");

        let (responder, pending) = settle::channel::<UploadFileResponse>(call_id);
        let task = self.host.upload_file(request, responder.clone());
        self.supervise(MethodKind::Upload, task, responder);

        ResponseFuture::new(async move {
            match pending.await {
                Ok(response) => Ok(normalize_upload_response(response, status_field.as_ref())),
                Err(err) => {
                    tracing::debug!(call_id = %call_id, error = %err, "upload failed, resolving with host error");
                    Ok(ResponseObject::from(err))
                }
            }
        })
    }

    pub fn download(&self, options: DownloadOptions) -> ResponseFuture {
        let call_id = Uuid::new_v4();
        let request = DownloadFileRequest {
            url: format_url(DEFAULT_PROTOCOL, &options.url, None),
            header: options.headers,
        };
        tracing::debug!(call_id = %call_id, method = "download", url = %request.url, "issuing host download");

        let (responder, pending) = settle::channel::<DownloadFileResponse>(call_id);
        let task = self.host.download_file(request, responder.clone());
        self.supervise(MethodKind::Download, task, responder);

        ResponseFuture::new(async move {
            let response = pending.await.map_err(|err| {
                tracing::debug!(call_id = %call_id, error = %err, "download failed");
                AdapterError::Transport(err)
            })?;
            Ok(normalize_download_response(response))
        })
    }

    fn request(&self, method: HttpMethod, options: RequestOptions) -> ResponseFuture {
        let kind = match method {
            HttpMethod::Get => MethodKind::Get,
            HttpMethod::Post => MethodKind::Post,
        };
        let call_id = Uuid::new_v4();
        let request = build_http_request(method, options);
        tracing::debug!(call_id = %call_id, method = %kind, url = %request.url, "issuing host request");

        let (responder, pending) = settle::channel::<HttpResponse>(call_id);
        let task = self.host.request(request, responder.clone());
        self.supervise(kind, task, responder);

        ResponseFuture::new(async move {
            let response = pending.await.unwrap_or_else(|err| {
                tracing::debug!(call_id = %call_id, error = %err, "request ended without a response");
                HttpResponse::default()
            });
            Ok(normalize_http_response(response))
        })
    }

    /// Arm the call's deadline unless the host already settled it.
    fn supervise<T: Send + 'static>(
        &self,
        kind: MethodKind,
        task: Box<dyn TransportTask>,
        responder: Responder<T>,
    ) {
        if responder.is_settled() {
            return;
        }
        let task: Arc<dyn TransportTask> = Arc::from(task);
        let message = self.config().timeout_message().to_string();
        let expiring = responder.clone();
        let handle = self.governor.start_timer(kind, task, move || {
            expiring.fail(HostError::timeout(message));
        });
        if let Some(handle) = handle {
            responder.attach_timer(handle);
        }
    }
}

impl SdkRequest for OppoRequest {
    fn get(&self, options: RequestOptions) -> ResponseFuture {
        OppoRequest::get(self, options)
    }

    fn post(&self, options: RequestOptions) -> ResponseFuture {
        OppoRequest::post(self, options)
    }

    fn upload(&self, options: UploadOptions) -> ResponseFuture {
        OppoRequest::upload(self, options)
    }

    fn download(&self, options: DownloadOptions) -> ResponseFuture {
        OppoRequest::download(self, options)
    }
}

/// Build the generic host request for `get`/`post`.
///
/// `get` folds an object payload into the query string and sends no body;
/// `post` sends forms untouched and everything else as JSON text, with a
/// falsy or absent payload sent as `{}`.
pub(crate) fn build_http_request(method: HttpMethod, options: RequestOptions) -> HttpRequest {
    let RequestOptions {
        url,
        headers,
        data,
        response_type,
    } = options;

    let query = match (method, &data) {
        (HttpMethod::Get, Some(Payload::Json(Value::Object(map)))) => Some(map),
        _ => None,
    };
    let url = format_url(DEFAULT_PROTOCOL, &url, query);

    let body = match method {
        HttpMethod::Get => None,
        HttpMethod::Post => Some(match data {
            Some(Payload::Form(form)) => RequestBody::Form(form),
            Some(Payload::Json(value)) if !is_falsy(&value) => RequestBody::Json(value.to_string()),
            _ => RequestBody::Json("{}".to_string()),
        }),
    };

    HttpRequest {
        method,
        url,
        headers: headers.into_iter().collect(),
        body,
        response_type,
    }
}

pub(crate) fn build_upload_request(options: UploadOptions) -> UploadFileRequest {
    let UploadOptions {
        url,
        file,
        data,
        headers,
    } = options;
    let mut form_data = data.unwrap_or_default();
    form_data.insert(UPLOAD_FILE_FIELD.to_string(), Value::String(file.clone()));
    UploadFileRequest {
        url: format_url(DEFAULT_PROTOCOL, &url, None),
        file_path: file,
        name: UPLOAD_FILE_FIELD.to_string(),
        form_data,
        header: headers,
    }
}

/// Status code plus best-effort JSON body; a non-JSON body leaves `data`
/// unset.
pub(crate) fn normalize_http_response(response: HttpResponse) -> ResponseObject {
    let mut result = ResponseObject::with_status(response.status);
    match serde_json::from_str::<Value>(&response.body) {
        Ok(data) => result.data = Some(data),
        Err(err) => tracing::trace!(error = %err, "response body is not JSON"),
    }
    result
}

pub(crate) fn normalize_upload_response(
    response: UploadFileResponse,
    status_field: Option<&Value>,
) -> ResponseObject {
    let data = match response.data {
        Some(data) if !is_falsy(&data) => data,
        _ => Value::Object(Map::new()),
    };
    let mut result = ResponseObject {
        status_code: response.status_code,
        data: Some(data),
        ..ResponseObject::default()
    };
    if response.status_code != 200 {
        return result;
    }
    if let Some(field) = status_field.filter(|v| !is_falsy(v)) {
        match parse_status_override(field) {
            Some(code) => result.status_code = code,
            None => tracing::warn!(value = %field, "ignoring unparseable {SUCCESS_ACTION_STATUS}"),
        }
    }
    result
}

/// A 200 with a temp file collapses to `{statusCode, tempFilePath}`;
/// anything else is handed back as the host reported it.
pub(crate) fn normalize_download_response(response: DownloadFileResponse) -> ResponseObject {
    match response.temp_file_path {
        Some(path) if response.status_code == 200 && !path.is_empty() => ResponseObject {
            status_code: 200,
            temp_file_path: Some(path),
            ..ResponseObject::default()
        },
        temp_file_path => ResponseObject {
            status_code: response.status_code,
            data: None,
            temp_file_path,
            extra: response.extra,
        },
    }
}

/// Base-10 integer with leading-prefix semantics (`"201"`, `" 201abc"`).
fn parse_status_override(value: &Value) -> Option<u16> {
    let code = match value {
        Value::String(s) => parse_int_prefix(s)?,
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64))?,
        _ => return None,
    };
    u16::try_from(code).ok()
}

fn parse_int_prefix(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let (sign, rest) = match text.as_bytes().first() {
        Some(b'-') => (-1, &text[1..]),
        Some(b'+') => (1, &text[1..]),
        _ => (1, text),
    };
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    rest[..digits].parse::<i64>().ok().map(|n| sign * n)
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
