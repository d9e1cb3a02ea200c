//! HTTP client for the hosted text-to-speech provider.

use crate::error::VoiceError;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;

/// Maximum text input size for TTS (64 KiB). Prevents resource exhaustion
/// from oversized synthesis requests.
const MAX_TTS_INPUT_BYTES: usize = 64 * 1024;

/// Bound on a single synthesis request. A broken audio pipeline fails the
/// turn rather than hanging the call.
const TTS_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Deserialize)]
pub struct TtsConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub voice_id: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model_id")]
    pub model_id: String,
}

fn default_base_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_model_id() -> String {
    "eleven_turbo_v2".to_string()
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            voice_id: String::new(),
            base_url: default_base_url(),
            model_id: default_model_id(),
        }
    }
}

impl fmt::Debug for TtsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtsConfig")
            .field("api_key", &"[REDACTED]")
            .field("voice_id", &self.voice_id)
            .field("base_url", &self.base_url)
            .field("model_id", &self.model_id)
            .finish()
    }
}

/// Service for generating speech from text.
#[derive(Debug, Clone)]
pub struct TtsService {
    config: TtsConfig,
    http: reqwest::Client,
}

impl TtsService {
    pub fn new(config: TtsConfig) -> Self {
        // Construction happens once at startup; a client without the
        // bounded timeout must never come into existence.
        let http = reqwest::Client::builder()
            .timeout(TTS_TIMEOUT)
            .build()
            .expect("failed to build TTS HTTP client");
        Self { config, http }
    }

    /// Synthesizes `text` to MP3 bytes.
    ///
    /// Distinguishes misconfiguration (missing voice id or API key) from
    /// empty input from provider failure; the caller maps each to a
    /// different spoken fallback.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>, VoiceError> {
        if text.trim().is_empty() {
            return Err(VoiceError::EmptyInput);
        }
        if text.len() > MAX_TTS_INPUT_BYTES {
            return Err(VoiceError::Provider(format!(
                "text exceeds maximum size: {} bytes (limit: {} bytes)",
                text.len(),
                MAX_TTS_INPUT_BYTES
            )));
        }
        if self.config.voice_id.is_empty() {
            return Err(VoiceError::Config("voice_id is not set".to_string()));
        }
        if self.config.api_key.is_empty() {
            return Err(VoiceError::Config("api_key is not set".to_string()));
        }

        let url = format!(
            "{}/v1/text-to-speech/{}?output_format=mp3_44100_128",
            self.config.base_url, self.config.voice_id
        );
        let body = json!({
            "text": text,
            "model_id": self.config.model_id,
            "voice_settings": { "stability": 0.6, "similarity_boost": 0.8 },
        });

        let response = self
            .http
            .post(url)
            .header("xi-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    VoiceError::Provider(format!(
                        "synthesis timed out after {} seconds",
                        TTS_TIMEOUT.as_secs()
                    ))
                } else {
                    VoiceError::Provider(format!("synthesis request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(VoiceError::Provider(format!(
                "synthesis returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VoiceError::Provider(format!("failed to read audio body: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_input_is_its_own_error() {
        let service = TtsService::new(TtsConfig {
            api_key: "key".to_string(),
            voice_id: "voice".to_string(),
            ..Default::default()
        });
        assert!(matches!(
            service.synthesize("   ").await,
            Err(VoiceError::EmptyInput)
        ));
    }

    #[tokio::test]
    async fn missing_voice_id_is_a_config_error() {
        let service = TtsService::new(TtsConfig::default());
        assert!(matches!(
            service.synthesize("hello").await,
            Err(VoiceError::Config(_))
        ));
    }

    #[test]
    fn debug_output_redacts_the_api_key() {
        let config = TtsConfig {
            api_key: "super-secret".to_string(),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
