use thiserror::Error;

/// Failures surfaced by the synthesis pipeline and its collaborators.
///
/// Nothing here is retried internally; every variant carries the diagnostic
/// text of the underlying failure so the HTTP boundary can report it.
#[derive(Debug, Error)]
pub enum TtsError {
    /// No speech model is currently active.
    #[error("speech model is not loaded")]
    ModelNotLoaded,

    /// The inference backend failed while generating audio.
    #[error("synthesis failed: {0}")]
    Synthesis(String),

    /// The external audio encoder process failed or timed out.
    #[error("audio encoding failed: {0}")]
    Encoding(String),

    /// Model artifacts could not be parsed or loaded.
    #[error("model load failed: {0}")]
    ModelLoad(String),
}
