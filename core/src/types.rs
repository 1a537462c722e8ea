//! Caller-facing DTOs: per-call options and the normalized response.
//!
//! # Design
//! Field names serialize in camelCase so the same values can cross the FFI
//! boundary as JSON exactly as the outer SDK spells them. `ResponseObject`
//! keeps a flattened `extra` map: a download result that is not a plain
//! 200-with-temp-file, or an upload failure object, passes through it
//! untouched.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::HostError;

/// The four call kinds an executor dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodKind {
    Get,
    Post,
    Upload,
    Download,
}

impl MethodKind {
    pub const ALL: [MethodKind; 4] = [
        MethodKind::Get,
        MethodKind::Post,
        MethodKind::Upload,
        MethodKind::Download,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MethodKind::Get => "get",
            MethodKind::Post => "post",
            MethodKind::Upload => "upload",
            MethodKind::Download => "download",
        }
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hint for how the host should expose the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    Text,
    Json,
    Arraybuffer,
}

/// A multipart form, sent by `post` without re-encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    fields: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Request payload: arbitrary JSON, or a multipart form object.
///
/// Only the JSON form can be deserialized; forms are built in Rust.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Form(FormData),
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<FormData> for Payload {
    fn from(form: FormData) -> Self {
        Payload::Form(form)
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Payload::Json(value) => value.serialize(serializer),
            Payload::Form(form) => {
                let map: Map<String, Value> = form
                    .fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect();
                map.serialize(serializer)
            }
        }
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Payload::Json)
    }
}

/// Options for `get` and `post`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
}

impl RequestOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn data(mut self, data: impl Into<Payload>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }
}

/// Options for `upload`.
///
/// `data.success_action_status`, when truthy, replaces a 200 status code
/// in the result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadOptions {
    pub url: String,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Options for `download`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOptions {
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Normalized result of every call kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseObject {
    #[serde(default)]
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_file_path: Option<String>,
    /// Host fields passed through verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResponseObject {
    pub fn with_status(status_code: u16) -> Self {
        Self {
            status_code,
            ..Self::default()
        }
    }
}

/// A host failure object resolved as a result (the `upload` failure path).
impl From<HostError> for ResponseObject {
    fn from(err: HostError) -> Self {
        let mut extra = Map::new();
        extra.insert("errMsg".to_string(), Value::String(err.err_msg));
        if let Some(code) = err.err_code {
            extra.insert("errCode".to_string(), Value::from(code));
        }
        Self {
            extra,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_omits_absent_fields() {
        let json = serde_json::to_value(ResponseObject::with_status(200)).unwrap();
        assert_eq!(json, json!({ "statusCode": 200 }));
    }

    #[test]
    fn response_flattens_extra_fields() {
        let raw = json!({ "statusCode": 404, "tempFilePath": "/tmp/a", "profile": { "rtt": 3 } });
        let res: ResponseObject = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(res.status_code, 404);
        assert_eq!(res.temp_file_path.as_deref(), Some("/tmp/a"));
        assert_eq!(res.extra["profile"]["rtt"], 3);
        assert_eq!(serde_json::to_value(&res).unwrap(), raw);
    }

    #[test]
    fn host_error_becomes_status_zero_response() {
        let res = ResponseObject::from(HostError::new("upload failed", Some(7)));
        assert_eq!(
            serde_json::to_value(&res).unwrap(),
            json!({ "statusCode": 0, "errMsg": "upload failed", "errCode": 7 })
        );
    }

    #[test]
    fn method_kinds_use_lowercase_names() {
        let kinds: Vec<MethodKind> = serde_json::from_str(r#"["get","download"]"#).unwrap();
        assert_eq!(kinds, vec![MethodKind::Get, MethodKind::Download]);
        assert_eq!(MethodKind::Upload.to_string(), "upload");
    }

    #[test]
    fn request_options_deserialize_with_defaults() {
        let opts: RequestOptions = serde_json::from_str(r#"{"url":"a.com/x"}"#).unwrap();
        assert!(opts.headers.is_empty());
        assert!(opts.data.is_none());
        assert!(opts.response_type.is_none());

        let opts: RequestOptions =
            serde_json::from_str(r#"{"url":"a","data":{"k":1},"responseType":"arraybuffer"}"#).unwrap();
        assert_eq!(opts.data, Some(Payload::Json(json!({ "k": 1 }))));
        assert_eq!(opts.response_type, Some(ResponseType::Arraybuffer));
    }

    #[test]
    fn form_payload_serializes_as_object() {
        let mut form = FormData::new();
        form.append("key", "a.png").append("policy", "p");
        let json = serde_json::to_value(Payload::Form(form)).unwrap();
        assert_eq!(json, json!({ "key": "a.png", "policy": "p" }));
    }
}
