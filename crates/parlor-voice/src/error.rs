use thiserror::Error;

/// Synthesis failures are split by cause because each maps to a different
/// caller-facing fallback line.
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("TTS is not configured: {0}")]
    Config(String),

    #[error("cannot synthesize empty text")]
    EmptyInput,

    #[error("TTS provider error: {0}")]
    Provider(String),
}
