//! Host transport payloads for the host-does-IO pattern.
//!
//! # Design
//! These types describe what the executor asks the host to do and what the
//! host reports back, as plain data. The generic request mirrors an
//! XHR-style lifecycle (`open(method, url)`, `setRequestHeader`, optional
//! `responseType`, `send(body)`) collapsed into one value; the host runs it
//! and reports the `readyState == 4` snapshot. Upload and download mirror
//! the platform's `uploadFile` / `downloadFile` task arguments.
//!
//! Everything derives serde with the host's camelCase names so the FFI
//! binding can hand these to a native host as JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{FormData, ResponseType};

/// HTTP method for a generic host request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

/// Body handed to the host's `send`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// A JSON document already serialized to text.
    Json(String),
    /// A multipart form, passed through unmodified.
    Form(FormData),
}

impl Serialize for RequestBody {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RequestBody::Json(text) => serializer.serialize_str(text),
            RequestBody::Form(form) => {
                let map: Map<String, Value> = form
                    .fields()
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                map.serialize(serializer)
            }
        }
    }
}

/// A generic request described as plain data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
}

/// Terminal snapshot of a generic request.
///
/// A host reports this once its request object reaches the done state.
/// `status` is 0 when the request never produced a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: String,
}

/// Arguments for the platform upload task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileRequest {
    pub url: String,
    pub file_path: String,
    /// Multipart field name the file is sent under.
    pub name: String,
    pub form_data: Map<String, Value>,
    pub header: BTreeMap<String, String>,
}

/// What the platform upload task passes to `success`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileResponse {
    pub status_code: u16,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Arguments for the platform download task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadFileRequest {
    pub url: String,
    pub header: BTreeMap<String, String>,
}

/// What the platform download task passes to `success`.
///
/// Hosts attach extra fields (profiles, headers); they are kept so a
/// non-200 result can be handed back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadFileResponse {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_file_path: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn http_request_serializes_for_host() {
        let req = HttpRequest {
            method: HttpMethod::Post,
            url: "https://a.com/x".to_string(),
            headers: vec![("x-sdk".to_string(), "1".to_string())],
            body: Some(RequestBody::Json("{}".to_string())),
            response_type: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["method"], "POST");
        assert_eq!(json["body"], "{}");
        assert_eq!(json["headers"], json!([["x-sdk", "1"]]));
        assert!(json.get("responseType").is_none());
    }

    #[test]
    fn form_body_serializes_as_object() {
        let mut form = FormData::new();
        form.append("a", "1");
        let json = serde_json::to_value(RequestBody::Form(form)).unwrap();
        assert_eq!(json, json!({ "a": "1" }));
    }

    #[test]
    fn download_response_keeps_unknown_fields() {
        let res: DownloadFileResponse =
            serde_json::from_value(json!({ "statusCode": 206, "header": { "etag": "x" } })).unwrap();
        assert_eq!(res.status_code, 206);
        assert!(res.temp_file_path.is_none());
        assert_eq!(res.extra["header"]["etag"], "x");
    }

    #[test]
    fn http_response_defaults_missing_body() {
        let res: HttpResponse = serde_json::from_str(r#"{"status":0}"#).unwrap();
        assert_eq!(res.status, 0);
        assert!(res.body.is_empty());
    }
}
