//! End-to-end tests for the HTTP endpoints

use api::{create_router, AppState, ServerConfig};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use inference_engine::{
    BatchedTensor, Classifier, InferenceError, InferencePipeline, LabelPolicy, ModelHandle,
    TargetShape,
};
use serde_json::Value;
use std::io::Cursor;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "cell-classifier-test-boundary";

struct FixedScore(f32);

impl Classifier for FixedScore {
    fn classify(&self, _input: &BatchedTensor) -> Result<f32, InferenceError> {
        Ok(self.0)
    }
}

struct Panicking;

impl Classifier for Panicking {
    fn classify(&self, _input: &BatchedTensor) -> Result<f32, InferenceError> {
        panic!("simulated runtime fault in /opt/models/cells.onnx")
    }
}

fn router_with(model: ModelHandle) -> Router {
    let pipeline = InferencePipeline::new(Arc::new(model), LabelPolicy::default());
    create_router(Arc::new(AppState::new(pipeline)), &ServerConfig::default())
}

fn loaded(score: f32) -> Router {
    router_with(ModelHandle::with_classifier(
        "fake.onnx",
        TargetShape::new(32, 32).unwrap(),
        FixedScore(score),
    ))
}

fn png() -> Vec<u8> {
    let img = RgbImage::from_fn(50, 40, |x, y| Rgb([(x * 5) as u8, (y * 6) as u8, 90]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn upload(uri: &str, field: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"cell.png\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_predict_uninfected() {
    let (status, json) = send(loaded(0.9), upload("/predict", "image", &png())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], "Uninfected");
    assert!((json["confidence"].as_f64().unwrap() - 0.9).abs() < 1e-6);
}

#[tokio::test]
async fn test_predict_parasitized_on_api_route() {
    let (status, json) = send(loaded(0.1), upload("/api/predict", "image", &png())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], "Parasitized");
    assert!((json["confidence"].as_f64().unwrap() - 0.9).abs() < 1e-6);
}

#[tokio::test]
async fn test_empty_upload_is_client_error() {
    let (status, json) = send(loaded(0.9), upload("/predict", "image", &[])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "empty_input");
    assert!(json.get("result").is_none());
}

#[tokio::test]
async fn test_text_upload_is_unsupported() {
    let (status, json) = send(
        loaded(0.9),
        upload("/predict", "image", b"this is a plain text file, not a picture"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "unsupported_image_format");
}

#[tokio::test]
async fn test_missing_image_field() {
    let (status, json) = send(loaded(0.9), upload("/predict", "picture", &png())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "missing_field");
    assert_eq!(json["error"], "No image uploaded");
}

#[tokio::test]
async fn test_non_multipart_request() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();

    let (status, json) = send(loaded(0.9), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "missing_field");
}

#[tokio::test]
async fn test_no_model_is_server_error() {
    let app = router_with(ModelHandle::unavailable("missing.onnx"));
    let (status, json) = send(app, upload("/predict", "image", &png())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["kind"], "model_unavailable");
    assert_eq!(json["error"], "Model not loaded on server");
}

#[tokio::test]
async fn test_bad_input_without_model_still_client_error() {
    let app = router_with(ModelHandle::unavailable("missing.onnx"));
    let (status, json) = send(app, upload("/predict", "image", &[])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "empty_input");
}

#[tokio::test]
async fn test_internal_fault_is_sanitized() {
    let app = router_with(ModelHandle::with_classifier(
        "fake.onnx",
        TargetShape::new(8, 8).unwrap(),
        Panicking,
    ));
    let (status, json) = send(app, upload("/predict", "image", &png())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["kind"], "internal");
    assert_eq!(json["error"], "Internal inference error");
    assert!(!json.to_string().contains("/opt/models"));
}

#[tokio::test]
async fn test_out_of_range_score_is_not_fabricated() {
    let (status, json) = send(loaded(7.5), upload("/predict", "image", &png())).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["kind"], "internal");
    assert!(json.get("result").is_none());
}

#[tokio::test]
async fn test_health_reports_model() {
    let request = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(loaded(0.9), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["model"]["loaded"], true);
    assert_eq!(json["model"]["expected_shape"], serde_json::json!([32, 32]));
}

#[tokio::test]
async fn test_health_degraded_without_model() {
    let app = router_with(ModelHandle::unavailable("missing.onnx"));
    let request = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["model"]["loaded"], false);
    assert_eq!(json["model"]["shape_source"], "default");
    assert_eq!(json["model"]["expected_shape"], serde_json::json!([128, 128]));
}

#[tokio::test]
async fn test_upload_over_limit_rejected() {
    let pipeline = InferencePipeline::new(
        Arc::new(ModelHandle::with_classifier(
            "fake.onnx",
            TargetShape::new(8, 8).unwrap(),
            FixedScore(0.9),
        )),
        LabelPolicy::default(),
    );
    let server = ServerConfig {
        max_upload_bytes: 64,
        ..Default::default()
    };
    let app = create_router(Arc::new(AppState::new(pipeline)), &server);

    let (status, json) = send(app, upload("/predict", "image", &png())).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(json["kind"], "malformed_upload");
}
