//! Integration tests for the HTTP surface

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use common::*;

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app(true).await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_voice_returns_wav_bytes() {
    let app = create_test_app(true).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/voice?text=hello")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "audio/wav"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[0..4], b"RIFF");
    assert_eq!(body.len(), 44 + 240 * 2);
}

#[tokio::test]
async fn test_voice_validation_empty_text() {
    let app = create_test_app(true).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/voice?text=")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(error["error"].is_string());
    assert_eq!(error["code"], 400);
}

#[tokio::test]
async fn test_voice_validation_unsupported_language() {
    let app = create_test_app(true).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/voice?text=hello&language=FR")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_voice_without_model_is_service_unavailable() {
    let app = create_test_app(false).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/voice?text=hello")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(error["error"]
        .as_str()
        .unwrap()
        .contains("not loaded"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_voice_mp3_uses_the_configured_encoder() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("encoder.sh");
    std::fs::write(&script, "#!/bin/sh\nprintf 'MP3:'\nexec cat\n").unwrap();
    let mut perms = std::fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).unwrap();

    let config = server::config::ServerConfig {
        ffmpeg_path: script.to_string_lossy().to_string(),
        ..Default::default()
    };
    let state = test_state_with_config(config, std::sync::Arc::new(TestLoader::new()));
    state
        .manager
        .load(artifacts(), tts_core::Device::Cpu)
        .await
        .unwrap();
    let app = server::routes::build_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/voice?text=hello&x_audio_format=mp3")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "audio/mpeg"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[0..4], b"MP3:");
    assert_eq!(&body[4..8], b"RIFF");
}

#[tokio::test]
async fn test_models_info_describes_active_model() {
    let app = create_test_app(true).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/models/info")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let info: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let descriptor = &info["0"];
    assert_eq!(descriptor["device"], "cpu");
    assert_eq!(descriptor["spk2id"]["default"], 0);
    assert_eq!(descriptor["style2id"]["Neutral"], 0);
    assert!(descriptor["config_path"].as_str().unwrap().contains("config.json"));
}

#[tokio::test]
async fn test_models_info_without_model() {
    let app = create_test_app(false).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/models/info")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

fn multipart_body(boundary: &str) -> String {
    let mut body = String::new();
    for (name, filename, contents) in [
        ("model_file", "model.onnx", "weights"),
        ("config_file", "config.json", "{}"),
        ("style_file", "style_vectors.npy", "vectors"),
    ] {
        body.push_str(&format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n{contents}\r\n"
        ));
    }
    body.push_str(&format!("--{boundary}--\r\n"));
    body
}

#[tokio::test]
async fn test_models_load_writes_artifacts_and_activates_model() {
    let dir = tempfile::tempdir().unwrap();
    let config = server::config::ServerConfig {
        model_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let state = test_state_with_config(config.clone(), std::sync::Arc::new(TestLoader::new()));
    let app = server::routes::build_router(state.clone());

    let boundary = "X-ARTIFACT-BOUNDARY";
    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/models/load")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(multipart_body(boundary)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let result: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(result["result"], "success");

    let artifacts = config.artifacts();
    assert_eq!(std::fs::read(&artifacts.model_path).unwrap(), b"weights");
    assert_eq!(std::fs::read(&artifacts.config_path).unwrap(), b"{}");
    assert_eq!(std::fs::read(&artifacts.style_vec_path).unwrap(), b"vectors");
    assert!(state.manager.active().is_some());
}

#[tokio::test]
async fn test_models_load_reports_fail_on_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = server::config::ServerConfig {
        model_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let loader = std::sync::Arc::new(TestLoader::new());
    loader
        .fail
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let state = test_state_with_config(config, loader);
    let app = server::routes::build_router(state.clone());

    let boundary = "X-ARTIFACT-BOUNDARY";
    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/models/load")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(multipart_body(boundary)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let result: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(result["result"], "fail");
    assert!(state.manager.active().is_none());
}

#[tokio::test]
async fn test_config_verbose_toggle() {
    let app = create_test_app(true).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/config/verbose?verbose=true")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let result: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(result["result"], "on");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/config/verbose?verbose=false")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let result: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(result["result"], "off");
}

#[tokio::test]
async fn test_not_found_endpoint() {
    let app = create_test_app(true).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/nonexistent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
