use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::backend::SynthesisRequest;
use crate::cache::{response_key, ResponseCache};
use crate::encoder::MpegEncoder;
use crate::error::TtsError;
use crate::manager::ModelManager;
use crate::wav;

/// Requested response format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Wave,
    Mp3,
}

impl OutputFormat {
    /// Anything other than `mp3` selects uncompressed WAV output.
    pub fn from_name(name: &str) -> Self {
        if name == "mp3" {
            OutputFormat::Mp3
        } else {
            OutputFormat::Wave
        }
    }

    pub fn media_type(self) -> &'static str {
        match self {
            OutputFormat::Wave => "audio/wav",
            OutputFormat::Mp3 => "audio/mpeg",
        }
    }

    fn cache_discriminator(self) -> Option<&'static str> {
        match self {
            OutputFormat::Wave => None,
            OutputFormat::Mp3 => Some("mp3"),
        }
    }
}

/// Orchestrates one synthesis request:
/// cache lookup → backend call → WAV framing → optional MP3 pass → cache store.
pub struct SynthesisPipeline {
    manager: Arc<ModelManager>,
    cache: Arc<ResponseCache>,
    encoder: Arc<MpegEncoder>,
    synthesis_timeout: Duration,
    verbose: AtomicBool,
}

impl SynthesisPipeline {
    pub fn new(
        manager: Arc<ModelManager>,
        cache: Arc<ResponseCache>,
        encoder: Arc<MpegEncoder>,
        synthesis_timeout: Duration,
    ) -> Self {
        Self {
            manager,
            cache,
            encoder,
            synthesis_timeout,
            verbose: AtomicBool::new(false),
        }
    }

    /// Runtime toggle for per-request diagnostics.
    pub fn set_verbose(&self, on: bool) {
        self.verbose.store(on, Ordering::Relaxed);
    }

    pub fn verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    /// Produce the final audio payload and its media type.
    ///
    /// The active model is captured once at entry; a reload racing with this
    /// call keeps serving the snapshot it started with. The backend call runs
    /// on a blocking worker under a deadline so concurrent requests' cache
    /// lookups and encoding are never stalled behind inference.
    pub async fn synthesize(
        &self,
        request: SynthesisRequest,
        format: OutputFormat,
    ) -> Result<(Vec<u8>, &'static str), TtsError> {
        let model = self.manager.active().ok_or(TtsError::ModelNotLoaded)?;

        let key = response_key(
            &request.text,
            request.speaker_id,
            &request.style,
            format.cache_discriminator(),
        );
        if let Some(payload) = self.cache.get(&key).await {
            if self.verbose() {
                info!(
                    speaker_id = request.speaker_id,
                    style = %request.style,
                    "cache hit: {}",
                    request.text
                );
            }
            return Ok((payload, format.media_type()));
        }

        let backend = model.backend.clone();
        let req = request.clone();
        let started = Instant::now();
        let joined = tokio::time::timeout(
            self.synthesis_timeout,
            tokio::task::spawn_blocking(move || backend.synthesize(&req)),
        )
        .await;
        let raw = match joined {
            Ok(Ok(Ok(raw))) => raw,
            Ok(Ok(Err(e))) => {
                error!("error generating audio: {e}");
                return Err(e);
            }
            Ok(Err(join_err)) => {
                error!("synthesis task join error: {join_err}");
                return Err(TtsError::Synthesis(format!("task join error: {join_err}")));
            }
            Err(_) => {
                return Err(TtsError::Synthesis(format!(
                    "timed out after {:?}",
                    self.synthesis_timeout
                )));
            }
        };
        if self.verbose() {
            info!(
                "audio generated in {:.2}s: {}",
                started.elapsed().as_secs_f64(),
                request.text
            );
        }

        let wav_bytes = wav::encode_wav(&raw.samples, raw.sample_rate)?;

        let payload = match format {
            OutputFormat::Wave => wav_bytes,
            OutputFormat::Mp3 => {
                let enc_started = Instant::now();
                let mp3 = self.encoder.encode(&wav_bytes).await?;
                if self.verbose() {
                    info!("mp3 conversion in {:.2}s", enc_started.elapsed().as_secs_f64());
                }
                mp3
            }
        };

        self.cache.put(key, payload.clone()).await;
        Ok((payload, format.media_type()))
    }
}
