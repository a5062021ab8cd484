use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::info;

use crate::backend::{Device, SynthesisBackend};
use crate::cache::ResponseCache;
use crate::error::TtsError;

/// On-disk files a backend is constructed from.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub model_path: PathBuf,
    pub config_path: PathBuf,
    pub style_vec_path: PathBuf,
}

impl ModelArtifacts {
    pub fn in_dir(dir: &Path, model_file: &str, config_file: &str, style_file: &str) -> Self {
        Self {
            model_path: dir.join(model_file),
            config_path: dir.join(config_file),
            style_vec_path: dir.join(style_file),
        }
    }

    pub fn all_present(&self) -> bool {
        self.model_path.exists() && self.config_path.exists() && self.style_vec_path.exists()
    }
}

/// The active backend plus its provenance and name↔id mappings.
pub struct LoadedModel {
    pub backend: Arc<dyn SynthesisBackend>,
    pub artifacts: ModelArtifacts,
    pub device: Device,
    pub spk2id: HashMap<String, i64>,
    pub id2spk: HashMap<i64, String>,
    pub style2id: HashMap<String, i64>,
}

/// Introspection view of the active model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelDescriptor {
    pub model_path: String,
    pub config_path: String,
    pub style_vec_path: String,
    pub device: &'static str,
    pub spk2id: HashMap<String, i64>,
    pub id2spk: HashMap<i64, String>,
    pub style2id: HashMap<String, i64>,
}

impl LoadedModel {
    pub fn descriptor(&self) -> ModelDescriptor {
        ModelDescriptor {
            model_path: self.artifacts.model_path.display().to_string(),
            config_path: self.artifacts.config_path.display().to_string(),
            style_vec_path: self.artifacts.style_vec_path.display().to_string(),
            device: self.device.as_str(),
            spk2id: self.spk2id.clone(),
            id2spk: self.id2spk.clone(),
            style2id: self.style2id.clone(),
        }
    }
}

/// Constructs a backend from artifacts. The call is blocking (weights are
/// parsed and uploaded to the inference runtime) and runs off the async
/// runtime via `spawn_blocking`.
pub trait BackendLoader: Send + Sync {
    fn load(&self, artifacts: &ModelArtifacts, device: Device) -> Result<LoadedModel, TtsError>;
}

/// Owns the lifecycle of the active model.
///
/// The active reference is an immutable snapshot behind a short critical
/// section; synthesis captures one `Arc` at entry and never re-reads shared
/// state mid-call. A successful load swaps the snapshot and clears the
/// response cache so audio from a previous model is never served under the
/// new one. A failed load leaves the previous model untouched; once loaded,
/// a model is never unloaded.
pub struct ModelManager {
    loader: Arc<dyn BackendLoader>,
    cache: Arc<ResponseCache>,
    active: RwLock<Option<Arc<LoadedModel>>>,
}

impl ModelManager {
    pub fn new(loader: Arc<dyn BackendLoader>, cache: Arc<ResponseCache>) -> Self {
        Self {
            loader,
            cache,
            active: RwLock::new(None),
        }
    }

    /// Snapshot of the active model, or `None` before the first load.
    pub fn active(&self) -> Option<Arc<LoadedModel>> {
        self.active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the active model from artifacts on disk.
    pub async fn load(&self, artifacts: ModelArtifacts, device: Device) -> Result<(), TtsError> {
        let loader = self.loader.clone();
        let arts = artifacts.clone();
        let loaded = tokio::task::spawn_blocking(move || loader.load(&arts, device))
            .await
            .map_err(|e| TtsError::ModelLoad(format!("load task join error: {e}")))??;

        {
            let mut slot = self.active.write().unwrap_or_else(|e| e.into_inner());
            *slot = Some(Arc::new(loaded));
        }
        self.cache.clear().await;
        info!(
            device = device.as_str(),
            config = %artifacts.config_path.display(),
            "speech model loaded, response cache cleared"
        );
        Ok(())
    }
}
