//! Core of the speech-synthesis service: the request pipeline and its
//! collaborators.
//!
//! [`pipeline::SynthesisPipeline`] deduplicates repeated requests through a
//! bounded [`cache::ResponseCache`], bridges the blocking inference call onto
//! a worker thread, frames raw PCM as WAV and optionally pipes it through the
//! external [`encoder::MpegEncoder`]. [`manager::ModelManager`] owns the
//! active backend snapshot and invalidates the cache on reload.

pub mod backend;
pub mod cache;
pub mod encoder;
pub mod error;
pub mod manager;
pub mod pipeline;
pub mod piper;
pub mod wav;

pub use backend::{Device, RawAudio, SynthesisBackend, SynthesisRequest};
pub use cache::{response_key, ResponseCache};
pub use encoder::MpegEncoder;
pub use error::TtsError;
pub use manager::{BackendLoader, LoadedModel, ModelArtifacts, ModelDescriptor, ModelManager};
pub use pipeline::{OutputFormat, SynthesisPipeline};
pub use piper::PiperLoader;
