//! Speech synthesis for caller-facing replies.
//!
//! Wraps the hosted TTS provider behind a single awaited
//! synthesize-to-bytes operation and caches the resulting audio under a
//! short-lived opaque handle served back to the telephony provider.

pub mod cache;
pub mod error;
pub mod tts;

pub use cache::{AudioCache, StoredAudio, AUDIO_TTL_SECONDS};
pub use error::VoiceError;
pub use tts::{TtsConfig, TtsService};
