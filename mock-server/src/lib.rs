use std::collections::HashMap;
use std::time::Duration;

use axum::{
    extract::{Path, Query},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use uuid::Uuid;

/// Upload envelope: multipart fields plus the file contents, sent as JSON.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadEnvelope {
    #[serde(default)]
    pub form_data: Map<String, Value>,
    pub file_name: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct SlowQuery {
    #[serde(default)]
    pub ms: u64,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", get(echo_query).post(echo_body))
        .route("/xml", get(xml))
        .route("/upload", post(upload))
        .route("/files/{name}", get(download))
        .route("/slow", get(slow))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo_query(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    Json(json!({ "method": "GET", "query": query }))
}

async fn echo_body(body: String) -> Result<Json<Value>, StatusCode> {
    let body: Value = serde_json::from_str(&body).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok(Json(json!({ "method": "POST", "body": body })))
}

async fn xml() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/xml")], "<xml/>")
}

/// Object-storage style upload: answers 200 with an XML receipt naming the
/// stored key.
async fn upload(Json(envelope): Json<UploadEnvelope>) -> impl IntoResponse {
    let key = envelope
        .form_data
        .get("key")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| envelope.file_name.clone());
    tracing::info!(%key, bytes = envelope.content.len(), "stored upload");
    let receipt = format!(
        "<PostResponse><Key>{key}</Key><ETag>{}</ETag></PostResponse>",
        Uuid::new_v4()
    );
    ([(header::CONTENT_TYPE, "application/xml")], receipt)
}

async fn download(Path(name): Path<String>) -> Result<String, StatusCode> {
    if name == "missing" {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(format!("contents of {name}"))
}

async fn slow(Query(query): Query<SlowQuery>) -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(query.ms)).await;
    Json(json!({ "slept": query.ms }))
}
