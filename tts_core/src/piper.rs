use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use piper_rs::synth::{PiperSpeechStreamParallel, PiperSpeechSynthesizer};
use tracing::warn;

use crate::backend::{Device, RawAudio, SynthesisBackend, SynthesisRequest};
use crate::error::TtsError;
use crate::manager::{BackendLoader, LoadedModel, ModelArtifacts};

/// Backend wrapping the piper inference engine.
pub struct PiperBackend {
    synth: RwLock<PiperSpeechSynthesizer>,
    sample_rate: u32,
}

impl SynthesisBackend for PiperBackend {
    fn synthesize(&self, request: &SynthesisRequest) -> Result<RawAudio, TtsError> {
        let synth = self
            .synth
            .read()
            .map_err(|_| TtsError::Synthesis("synthesizer lock poisoned".to_string()))?;

        let iter: PiperSpeechStreamParallel = synth
            .synthesize_parallel(request.text.clone(), None)
            .map_err(|e| TtsError::Synthesis(format!("piper synth error: {e}")))?;

        let mut samples: Vec<i16> = Vec::new();
        for part in iter {
            let chunk = part.map_err(|e| TtsError::Synthesis(format!("chunk error: {e}")))?;
            samples.extend(
                chunk
                    .into_vec()
                    .into_iter()
                    .map(|s: f32| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
            );
        }

        Ok(RawAudio {
            sample_rate: self.sample_rate,
            samples,
        })
    }
}

/// Production loader: builds a [`PiperBackend`] from the config artifact.
///
/// The weights path is referenced from inside the config; the style-vector
/// artifact is carried as provenance. Speaker and style name↔id tables are
/// read from the config JSON when present.
pub struct PiperLoader;

impl BackendLoader for PiperLoader {
    fn load(&self, artifacts: &ModelArtifacts, device: Device) -> Result<LoadedModel, TtsError> {
        let config = read_config(&artifacts.config_path)?;
        let sample_rate = read_sample_rate(&config)?;

        let mut spk2id = read_id_map(&config, "spk2id", "speaker_id_map");
        if spk2id.is_empty() {
            spk2id.insert("default".to_string(), 0);
        }
        let id2spk: HashMap<i64, String> =
            spk2id.iter().map(|(name, id)| (*id, name.clone())).collect();
        let mut style2id = read_id_map(&config, "style2id", "style_id_map");
        if style2id.is_empty() {
            style2id.insert("Neutral".to_string(), 0);
        }

        if device == Device::Gpu {
            warn!("gpu requested; execution providers are fixed by the inference runtime build");
        }

        let model = piper_rs::from_config_path(&artifacts.config_path)
            .map_err(|e| TtsError::ModelLoad(format!("piper load error: {e}")))?;
        let synth = PiperSpeechSynthesizer::new(model)
            .map_err(|e| TtsError::ModelLoad(format!("piper init error: {e}")))?;

        Ok(LoadedModel {
            backend: Arc::new(PiperBackend {
                synth: RwLock::new(synth),
                sample_rate,
            }),
            artifacts: artifacts.clone(),
            device,
            spk2id,
            id2spk,
            style2id,
        })
    }
}

fn read_config(path: &Path) -> Result<serde_json::Value, TtsError> {
    let text = fs::read_to_string(path)
        .map_err(|e| TtsError::ModelLoad(format!("failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| TtsError::ModelLoad(format!("{} is not valid JSON: {e}", path.display())))
}

fn read_sample_rate(config: &serde_json::Value) -> Result<u32, TtsError> {
    config
        .get("audio")
        .and_then(|a| a.get("sample_rate"))
        .and_then(|v| v.as_u64())
        .map(|v| v as u32)
        .ok_or_else(|| TtsError::ModelLoad("missing 'audio.sample_rate' in model config".to_string()))
}

/// Name→id table from either the nested `data.<nested>` shape or a
/// top-level `<flat>` key.
fn read_id_map(config: &serde_json::Value, nested: &str, flat: &str) -> HashMap<String, i64> {
    let table = config
        .get("data")
        .and_then(|d| d.get(nested))
        .or_else(|| config.get(flat));
    match table.and_then(|v| v.as_object()) {
        Some(obj) => obj
            .iter()
            .filter_map(|(name, id)| id.as_i64().map(|id| (name.clone(), id)))
            .collect(),
        None => HashMap::new(),
    }
}
