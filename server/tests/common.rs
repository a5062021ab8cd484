//! Common utilities for integration tests

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use server::config::ServerConfig;
use server::routes::{build_router, AppState};
use tts_core::{
    BackendLoader, Device, LoadedModel, ModelArtifacts, ModelManager, MpegEncoder, RawAudio,
    ResponseCache, SynthesisBackend, SynthesisPipeline, SynthesisRequest, TtsError,
};

pub struct TestBackend;

impl SynthesisBackend for TestBackend {
    fn synthesize(&self, _request: &SynthesisRequest) -> Result<RawAudio, TtsError> {
        Ok(RawAudio {
            sample_rate: 24_000,
            samples: vec![0; 240],
        })
    }
}

pub struct TestLoader {
    pub fail: AtomicBool,
}

impl TestLoader {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
        }
    }
}

impl BackendLoader for TestLoader {
    fn load(&self, artifacts: &ModelArtifacts, device: Device) -> Result<LoadedModel, TtsError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(TtsError::ModelLoad("unreadable artifacts".to_string()));
        }
        Ok(LoadedModel {
            backend: Arc::new(TestBackend),
            artifacts: artifacts.clone(),
            device,
            spk2id: HashMap::from([("default".to_string(), 0)]),
            id2spk: HashMap::from([(0, "default".to_string())]),
            style2id: HashMap::from([("Neutral".to_string(), 0)]),
        })
    }
}

pub fn artifacts() -> ModelArtifacts {
    ModelArtifacts::in_dir(
        Path::new("model"),
        "model.onnx",
        "config.json",
        "style_vectors.npy",
    )
}

/// Build application state around a stub loader; the encoder path comes from
/// the supplied config so tests can point it at a stub executable.
pub fn test_state_with_config(config: ServerConfig, loader: Arc<TestLoader>) -> AppState {
    let cache = Arc::new(ResponseCache::new(NonZeroUsize::new(16).unwrap()));
    let manager = Arc::new(ModelManager::new(loader, cache.clone()));
    let encoder = Arc::new(MpegEncoder::new(
        config.ffmpeg_path.clone(),
        config.mp3_bitrate.clone(),
        2,
        Duration::from_secs(5),
    ));
    let pipeline = Arc::new(SynthesisPipeline::new(
        manager.clone(),
        cache,
        encoder,
        Duration::from_secs(5),
    ));
    AppState {
        pipeline,
        manager,
        config,
    }
}

/// Create a test app instance
pub async fn create_test_app(load_model: bool) -> Router {
    let state = test_state_with_config(ServerConfig::default(), Arc::new(TestLoader::new()));
    if load_model {
        state
            .manager
            .load(artifacts(), Device::Cpu)
            .await
            .expect("stub model loads");
    }
    build_router(state)
}
