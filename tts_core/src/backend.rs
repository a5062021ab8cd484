use crate::error::TtsError;

/// Inference device selector recorded with a loaded model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Gpu,
}

impl Device {
    pub fn from_gpu_flag(use_gpu: bool) -> Self {
        if use_gpu {
            Device::Gpu
        } else {
            Device::Cpu
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Gpu => "gpu",
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single synthesis request, immutable once constructed.
///
/// Only `text`, `speaker_id` and `style` participate in response caching;
/// the remaining knobs tune the waveform but are not part of the fingerprint
/// (see [`crate::cache::response_key`]).
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub speaker_id: i64,
    pub style: String,
    pub language: String,
    pub sdp_ratio: f32,
    pub noise: f32,
    pub noise_w: f32,
    pub length: f32,
    pub line_split: bool,
    pub split_interval: f32,
    pub assist_text: Option<String>,
    pub assist_text_weight: f32,
    pub style_weight: f32,
    pub reference_audio_path: Option<String>,
}

impl Default for SynthesisRequest {
    fn default() -> Self {
        Self {
            text: String::new(),
            speaker_id: 0,
            style: "Neutral".to_string(),
            language: "JP".to_string(),
            sdp_ratio: 0.2,
            noise: 0.6,
            noise_w: 0.8,
            length: 1.0,
            line_split: true,
            split_interval: 0.5,
            assist_text: None,
            assist_text_weight: 0.7,
            style_weight: 1.0,
            reference_audio_path: None,
        }
    }
}

/// Raw synthesized audio: 16-bit signed little-endian mono PCM.
#[derive(Debug, Clone)]
pub struct RawAudio {
    pub sample_rate: u32,
    pub samples: Vec<i16>,
}

/// The neural inference capability behind the pipeline.
///
/// The call is synchronous and CPU/GPU bound; the pipeline is responsible
/// for dispatching it off the request-handling tasks.
pub trait SynthesisBackend: Send + Sync {
    fn synthesize(&self, request: &SynthesisRequest) -> Result<RawAudio, TtsError>;
}
