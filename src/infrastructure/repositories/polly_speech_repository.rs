use super::speech_repository::{
    truncate_for_narration, SpeechError, SpeechRepository, SYNTHESIS_TIMEOUT,
};
use async_trait::async_trait;
use aws_sdk_polly::{
    types::{Engine, OutputFormat, VoiceId},
    Client as PollyClient,
};
use bytes::Bytes;
use std::sync::Arc;

/// AWS Polly implementation of the speech repository
///
/// Polly's voice catalogue is disjoint from the genre voice names the
/// orchestrator suggests, so a Polly deployment narrates everything with
/// its one configured voice.
pub struct PollySpeechRepository {
    polly_client: Arc<PollyClient>,
    voice: String,
}

impl PollySpeechRepository {
    pub fn new(polly_client: Arc<PollyClient>, voice: String) -> Self {
        Self {
            polly_client,
            voice,
        }
    }
}

#[async_trait]
impl SpeechRepository for PollySpeechRepository {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        instructions: Option<&str>,
    ) -> Result<Bytes, SpeechError> {
        // Polly has no style-instruction input; the directive is dropped.
        if let Some(instructions) = instructions {
            tracing::debug!(
                instructions_length = instructions.len(),
                "Polly does not support style instructions, ignoring"
            );
        }
        if voice != self.voice {
            tracing::debug!(
                suggested = voice,
                configured = %self.voice,
                "Polly narrates with its configured voice"
            );
        }

        let input = truncate_for_narration(text);
        let voice = self.voice.as_str();
        let voice_id = VoiceId::from(voice);
        let engine = Engine::Neural;

        tracing::info!(
            voice = voice,
            engine = ?engine,
            output_format = "Mp3",
            original_length = text.chars().count(),
            submitted_length = input.chars().count(),
            "Calling AWS Polly synthesize_speech"
        );

        let start_time = std::time::Instant::now();

        let request = self
            .polly_client
            .synthesize_speech()
            .text(input.into_owned())
            .voice_id(voice_id.clone())
            .output_format(OutputFormat::Mp3)
            .engine(engine)
            .send();

        let result = tokio::time::timeout(SYNTHESIS_TIMEOUT, request)
            .await
            .map_err(|_| {
                tracing::error!(
                    timeout_secs = SYNTHESIS_TIMEOUT.as_secs(),
                    voice = voice,
                    "AWS Polly call exceeded client timeout"
                );
                SpeechError::Timeout
            })?
            .map_err(|e| {
                tracing::error!(
                    error = ?e,
                    voice_id = ?voice_id,
                    "AWS Polly synthesize_speech failed"
                );
                SpeechError::Upstream(format!("AWS Polly error: {}", e))
            })?;

        let audio_stream = result.audio_stream.collect().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to collect audio stream from Polly response");
            SpeechError::Upstream(format!("failed to read audio stream: {}", e))
        })?;

        let audio = audio_stream.into_bytes();
        if audio.is_empty() {
            tracing::error!("AWS Polly returned a zero-byte payload");
            return Err(SpeechError::EmptyResult);
        }

        tracing::info!(
            provider = "polly",
            voice = voice,
            latency_ms = start_time.elapsed().as_millis(),
            audio_size_bytes = audio.len(),
            "Speech synthesis completed"
        );

        Ok(audio)
    }
}
