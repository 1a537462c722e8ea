use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::app;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get_request(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_get_reflects_query() {
    let resp = app().oneshot(get_request("/echo?env=prod&n=3")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body, json!({ "method": "GET", "query": { "env": "prod", "n": "3" } }));
}

#[tokio::test]
async fn echo_post_reflects_json_body() {
    let resp = app()
        .oneshot(json_request("POST", "/echo", r#"{"a":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body, json!({ "method": "POST", "body": { "a": 1 } }));
}

#[tokio::test]
async fn echo_post_rejects_non_json() {
    let resp = app()
        .oneshot(json_request("POST", "/echo", "not json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- xml ---

#[tokio::test]
async fn xml_endpoint_returns_xml() {
    let resp = app().oneshot(get_request("/xml")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/xml");
    assert_eq!(&body_bytes(resp).await[..], b"<xml/>");
}

// --- upload ---

#[tokio::test]
async fn upload_returns_receipt_with_form_key() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/upload",
            r#"{"formData":{"key":"avatars/a.png"},"fileName":"a.png","content":"xyz"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(body_bytes(resp).await.to_vec()).unwrap();
    assert!(body.starts_with("<PostResponse><Key>avatars/a.png</Key>"), "{body}");
}

#[tokio::test]
async fn upload_falls_back_to_file_name() {
    let resp = app()
        .oneshot(json_request("POST", "/upload", r#"{"fileName":"b.txt"}"#))
        .await
        .unwrap();

    let body = String::from_utf8(body_bytes(resp).await.to_vec()).unwrap();
    assert!(body.contains("<Key>b.txt</Key>"), "{body}");
}

#[tokio::test]
async fn upload_without_file_name_is_rejected() {
    let resp = app()
        .oneshot(json_request("POST", "/upload", r#"{"content":"x"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- download ---

#[tokio::test]
async fn download_serves_named_file() {
    let resp = app().oneshot(get_request("/files/a.txt")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(&body_bytes(resp).await[..], b"contents of a.txt");
}

#[tokio::test]
async fn download_missing_returns_404() {
    let resp = app().oneshot(get_request("/files/missing")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- slow ---

#[tokio::test]
async fn slow_reports_delay() {
    let resp = app().oneshot(get_request("/slow?ms=5")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "slept": 5 }));
}

// --- one router, several calls ---

#[tokio::test]
async fn router_serves_sequential_calls() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/echo?x=1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get_request("/files/missing"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/echo", "[1,2]"))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, json!({ "method": "POST", "body": [1, 2] }));
}
