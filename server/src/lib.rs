//! HTTP surface for the speech synthesis service: route handlers, request
//! validation, env configuration and error mapping around
//! [`tts_core::SynthesisPipeline`].

pub mod config;
pub mod error;
pub mod routes;
pub mod validation;
