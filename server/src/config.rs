// Environment-sourced configuration for the server

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tts_core::ModelArtifacts;

#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub use_gpu: bool,
    pub verbose: bool,
    pub ffmpeg_path: String,
    pub mp3_bitrate: String,
    pub model_dir: PathBuf,
    pub model_file: String,
    pub config_file: String,
    pub style_file: String,
    pub cache_capacity: usize,
    pub encoder_concurrency: usize,
    pub encoder_timeout_secs: u64,
    pub synthesis_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub rate_limit_per_minute: u32,
    pub max_upload_mb: usize,
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            use_gpu: false,
            verbose: false,
            ffmpeg_path: "ffmpeg".to_string(),
            mp3_bitrate: "64k".to_string(),
            model_dir: PathBuf::from("model"),
            model_file: "model.onnx".to_string(),
            config_file: "config.json".to_string(),
            style_file: "style_vectors.npy".to_string(),
            cache_capacity: 256,
            encoder_concurrency: 4,
            encoder_timeout_secs: 60,
            synthesis_timeout_secs: 120,
            request_timeout_secs: 300,
            rate_limit_per_minute: 120,
            cors_allowed_origins: None,
            max_upload_mb: 512,
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "y" | "yes"),
        Err(_) => default,
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let encoder_concurrency = std::env::var("ENCODER_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(defaults.encoder_concurrency)
            });

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| origins.split(',').map(|s| s.trim().to_string()).collect());

        Self {
            port: env_parse("PORT", defaults.port),
            use_gpu: env_bool("USE_GPU", defaults.use_gpu),
            verbose: env_bool("VERBOSE", defaults.verbose),
            ffmpeg_path: env_parse("FFMPEG_PATH", defaults.ffmpeg_path),
            mp3_bitrate: env_parse("MP3_BITRATE", defaults.mp3_bitrate),
            model_dir: env_parse("MODEL_DIR", defaults.model_dir),
            model_file: env_parse("MODEL_FILE", defaults.model_file),
            config_file: env_parse("CONFIG_FILE", defaults.config_file),
            style_file: env_parse("STYLE_FILE", defaults.style_file),
            cache_capacity: env_parse("CACHE_CAPACITY", defaults.cache_capacity),
            encoder_concurrency,
            encoder_timeout_secs: env_parse("ENCODER_TIMEOUT_SECS", defaults.encoder_timeout_secs),
            synthesis_timeout_secs: env_parse(
                "SYNTHESIS_TIMEOUT_SECS",
                defaults.synthesis_timeout_secs,
            ),
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            rate_limit_per_minute: env_parse(
                "RATE_LIMIT_PER_MINUTE",
                defaults.rate_limit_per_minute,
            ),
            max_upload_mb: env_parse("MAX_UPLOAD_MB", defaults.max_upload_mb),
            cors_allowed_origins,
        }
    }

    /// Artifact paths under the configured model directory.
    pub fn artifacts(&self) -> ModelArtifacts {
        ModelArtifacts::in_dir(
            &self.model_dir,
            &self.model_file,
            &self.config_file,
            &self.style_file,
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis_timeout_secs)
    }

    pub fn encoder_timeout(&self) -> Duration {
        Duration::from_secs(self.encoder_timeout_secs)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}
