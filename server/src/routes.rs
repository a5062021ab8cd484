use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use tts_core::{
    Device, ModelManager, OutputFormat, SynthesisPipeline, SynthesisRequest, TtsError,
};

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::validation::validate_voice_request;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<SynthesisPipeline>,
    pub manager: Arc<ModelManager>,
    pub config: ServerConfig,
}

pub fn build_router(state: AppState) -> Router {
    let max_upload = state.config.max_upload_bytes();
    Router::new()
        .route("/health", get(health_check))
        .route("/voice", get(get_voice))
        .route("/models/info", get(get_models_info))
        .route("/models/load", put(put_models_load))
        .route("/config/verbose", post(post_config_verbose))
        .layer(DefaultBodyLimit::max(max_upload))
        .with_state(state)
}

pub async fn health_check() -> &'static str {
    "ok"
}

fn default_speaker_id() -> i64 {
    0
}
fn default_sdp_ratio() -> f32 {
    0.2
}
fn default_noise() -> f32 {
    0.6
}
fn default_noise_w() -> f32 {
    0.8
}
fn default_length() -> f32 {
    1.0
}
fn default_language() -> String {
    "JP".to_string()
}
fn default_line_split() -> bool {
    true
}
fn default_split_interval() -> f32 {
    0.5
}
fn default_assist_text_weight() -> f32 {
    0.7
}
fn default_style() -> String {
    "Neutral".to_string()
}
fn default_style_weight() -> f32 {
    1.0
}
fn default_audio_format() -> String {
    "wave".to_string()
}

#[derive(Debug, Deserialize)]
pub struct VoiceQuery {
    text: String,
    #[serde(default = "default_speaker_id")]
    speaker_id: i64,
    #[serde(default = "default_sdp_ratio")]
    sdp_ratio: f32,
    #[serde(default = "default_noise")]
    noise: f32,
    #[serde(default = "default_noise_w", rename = "noisew")]
    noise_w: f32,
    #[serde(default = "default_length")]
    length: f32,
    #[serde(default = "default_language")]
    language: String,
    #[serde(default = "default_line_split", rename = "auto_split")]
    line_split: bool,
    #[serde(default = "default_split_interval")]
    split_interval: f32,
    #[serde(default)]
    assist_text: Option<String>,
    #[serde(default = "default_assist_text_weight")]
    assist_text_weight: f32,
    #[serde(default = "default_style")]
    style: String,
    #[serde(default = "default_style_weight")]
    style_weight: f32,
    #[serde(default)]
    reference_audio_path: Option<String>,
    #[serde(default = "default_audio_format", rename = "x_audio_format")]
    audio_format: String,
}

pub async fn get_voice(
    State(state): State<AppState>,
    Query(query): Query<VoiceQuery>,
) -> Result<Response, ApiError> {
    validate_voice_request(&query.text, &query.language, &query.style)?;

    let format = OutputFormat::from_name(&query.audio_format);
    let request = SynthesisRequest {
        text: query.text,
        speaker_id: query.speaker_id,
        style: query.style,
        language: query.language,
        sdp_ratio: query.sdp_ratio,
        noise: query.noise,
        noise_w: query.noise_w,
        length: query.length,
        line_split: query.line_split,
        split_interval: query.split_interval,
        assist_text: query.assist_text,
        assist_text_weight: query.assist_text_weight,
        style_weight: query.style_weight,
        reference_audio_path: query.reference_audio_path,
    };

    let (payload, media_type) = state.pipeline.synthesize(request, format).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(media_type));
    Ok((StatusCode::OK, headers, payload).into_response())
}

pub async fn get_models_info(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let model = state
        .manager
        .active()
        .ok_or(ApiError::Tts(TtsError::ModelNotLoaded))?;
    Ok(Json(serde_json::json!({ "0": model.descriptor() })))
}

#[derive(Debug, Deserialize)]
pub struct LoadQuery {
    #[serde(default)]
    use_gpu: bool,
}

#[derive(Serialize)]
pub struct LoadResult {
    result: &'static str,
}

pub async fn put_models_load(
    State(state): State<AppState>,
    Query(query): Query<LoadQuery>,
    mut multipart: Multipart,
) -> Result<Json<LoadResult>, ApiError> {
    let mut model_file: Option<Vec<u8>> = None;
    let mut config_file: Option<Vec<u8>> = None;
    let mut style_file: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("invalid multipart payload: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::InvalidInput(format!("failed to read field {name}: {e}")))?;
        match name.as_str() {
            "model_file" => model_file = Some(bytes.to_vec()),
            "config_file" => config_file = Some(bytes.to_vec()),
            "style_file" => style_file = Some(bytes.to_vec()),
            _ => {}
        }
    }

    let model_file =
        model_file.ok_or_else(|| ApiError::InvalidInput("model_file is required".to_string()))?;
    let config_file =
        config_file.ok_or_else(|| ApiError::InvalidInput("config_file is required".to_string()))?;
    let style_file =
        style_file.ok_or_else(|| ApiError::InvalidInput("style_file is required".to_string()))?;

    tokio::fs::create_dir_all(&state.config.model_dir)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to create model directory: {e}")))?;

    let artifacts = state.config.artifacts();
    write_artifact(&artifacts.model_path, &model_file).await?;
    write_artifact(&artifacts.config_path, &config_file).await?;
    write_artifact(&artifacts.style_vec_path, &style_file).await?;

    let device = Device::from_gpu_flag(query.use_gpu);
    match state.manager.load(artifacts, device).await {
        Ok(()) => Ok(Json(LoadResult { result: "success" })),
        Err(e) => {
            error!("model reload failed: {e}");
            Ok(Json(LoadResult { result: "fail" }))
        }
    }
}

/// Write-then-rename so a half-written upload never replaces a live artifact.
async fn write_artifact(path: &Path, contents: &[u8]) -> Result<(), ApiError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ApiError::Internal(format!("invalid artifact path: {}", path.display())))?;
    let tmp = path.with_file_name(format!("{file_name}.upload"));
    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to write {}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to replace {}: {e}", path.display())))?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct VerboseQuery {
    verbose: bool,
}

pub async fn post_config_verbose(
    State(state): State<AppState>,
    Query(query): Query<VerboseQuery>,
) -> Json<serde_json::Value> {
    state.pipeline.set_verbose(query.verbose);
    info!(verbose = query.verbose, "verbose diagnostics toggled");
    Json(serde_json::json!({ "result": if query.verbose { "on" } else { "off" } }))
}
