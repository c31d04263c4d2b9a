use super::speech_repository::{
    truncate_for_narration, SpeechError, SpeechRepository, DEFAULT_STYLE_INSTRUCTIONS,
    SYNTHESIS_TIMEOUT,
};
use async_openai::{
    config::OpenAIConfig,
    types::{CreateSpeechRequestArgs, SpeechModel, SpeechResponseFormat, Voice},
    Client,
};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// OpenAI speech implementation of the speech repository
pub struct OpenAiSpeechRepository {
    client: Arc<Client<OpenAIConfig>>,
    model: String,
    default_voice: String,
    /// Whether an API key was configured at startup. When false every call
    /// fails fast with `MissingCredentials` without touching the network.
    credentials_configured: bool,
}

impl OpenAiSpeechRepository {
    pub fn new(
        client: Arc<Client<OpenAIConfig>>,
        model: String,
        default_voice: String,
        credentials_configured: bool,
    ) -> Self {
        Self {
            client,
            model,
            default_voice,
            credentials_configured,
        }
    }

    /// Map a voice name onto the OpenAI voice enum.
    fn parse_voice(voice: &str) -> Option<Voice> {
        match voice.to_lowercase().as_str() {
            "alloy" => Some(Voice::Alloy),
            "coral" => Some(Voice::Coral),
            "echo" => Some(Voice::Echo),
            "fable" => Some(Voice::Fable),
            "onyx" => Some(Voice::Onyx),
            "nova" => Some(Voice::Nova),
            "shimmer" => Some(Voice::Shimmer),
            _ => None,
        }
    }

    /// Caller's voice if recognized, otherwise the configured default,
    /// otherwise `nova`.
    fn resolve_voice(&self, voice: &str) -> Voice {
        Self::parse_voice(voice)
            .or_else(|| Self::parse_voice(&self.default_voice))
            .unwrap_or(Voice::Nova)
    }

    fn parse_model(&self) -> SpeechModel {
        match self.model.as_str() {
            "tts-1" => SpeechModel::Tts1,
            "tts-1-hd" => SpeechModel::Tts1Hd,
            other => SpeechModel::Other(other.to_string()),
        }
    }
}

#[async_trait]
impl SpeechRepository for OpenAiSpeechRepository {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        instructions: Option<&str>,
    ) -> Result<Bytes, SpeechError> {
        if !self.credentials_configured {
            tracing::error!("OpenAI API key is missing, refusing speech synthesis");
            return Err(SpeechError::MissingCredentials);
        }

        let input = truncate_for_narration(text);
        let instructions = instructions.unwrap_or(DEFAULT_STYLE_INSTRUCTIONS);

        tracing::info!(
            model = %self.model,
            voice = voice,
            original_length = text.chars().count(),
            submitted_length = input.chars().count(),
            "Calling OpenAI speech API"
        );

        let request = CreateSpeechRequestArgs::default()
            .model(self.parse_model())
            .input(input.into_owned())
            .voice(self.resolve_voice(voice))
            .instructions(instructions.to_string())
            .response_format(SpeechResponseFormat::Mp3)
            .build()
            .map_err(|e| SpeechError::Upstream(format!("invalid speech request: {}", e)))?;

        let start_time = std::time::Instant::now();

        let response = tokio::time::timeout(SYNTHESIS_TIMEOUT, self.client.audio().speech(request))
            .await
            .map_err(|_| {
                tracing::error!(
                    timeout_secs = SYNTHESIS_TIMEOUT.as_secs(),
                    "OpenAI speech call exceeded client timeout"
                );
                SpeechError::Timeout
            })?
            .map_err(|e| {
                tracing::error!(error = %e, model = %self.model, "OpenAI speech call failed");
                SpeechError::Upstream(format!("OpenAI speech error: {}", e))
            })?;

        let audio: Bytes = response.bytes;
        if audio.is_empty() {
            tracing::error!("OpenAI speech call returned a zero-byte payload");
            return Err(SpeechError::EmptyResult);
        }

        tracing::info!(
            provider = "openai",
            model = %self.model,
            voice = voice,
            latency_ms = start_time.elapsed().as_millis(),
            audio_size_bytes = audio.len(),
            "Speech synthesis completed"
        );

        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(default_voice: &str, credentials: bool) -> OpenAiSpeechRepository {
        OpenAiSpeechRepository::new(
            Arc::new(Client::with_config(OpenAIConfig::new())),
            "gpt-4o-mini-tts".to_string(),
            default_voice.to_string(),
            credentials,
        )
    }

    #[test]
    fn test_resolve_voice_known_names() {
        let repo = repo("nova", true);
        assert!(matches!(repo.resolve_voice("onyx"), Voice::Onyx));
        assert!(matches!(repo.resolve_voice("Echo"), Voice::Echo));
    }

    #[test]
    fn test_resolve_voice_falls_back_to_configured_default() {
        let repo = repo("shimmer", true);
        assert!(matches!(repo.resolve_voice("brian"), Voice::Shimmer));
    }

    #[test]
    fn test_resolve_voice_falls_back_to_nova_when_default_unknown() {
        let repo = repo("", true);
        assert!(matches!(repo.resolve_voice("brian"), Voice::Nova));
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_fast() {
        let repo = repo("nova", false);
        let result = repo.synthesize("hello", "nova", None).await;
        assert_eq!(result.unwrap_err(), SpeechError::MissingCredentials);
    }
}
