use async_trait::async_trait;
use bytes::Bytes;
use std::borrow::Cow;
use std::time::Duration;

/// Speech APIs reject very long inputs; only the first 4000 characters of a
/// story are narrated. The tail is dropped, not chunked.
pub const MAX_NARRATION_CHARS: usize = 4000;

/// Appended to the input when it had to be cut at the cap.
pub const TRUNCATION_MARKER: &str = "...";

/// Client-side bound on a single synthesis call.
pub const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(30);

/// Style directive used when the caller supplies none.
pub const DEFAULT_STYLE_INSTRUCTIONS: &str =
    "Speak in a clear, engaging storytelling voice with appropriate emotion \
     for the content. Maintain a moderately brisk pace throughout the \
     narration while keeping every word clear.";

/// Media type every narration payload is labeled with. Transport layers do
/// not reliably preserve content-type metadata, so the label is applied
/// explicitly wherever the payload is stored or served.
pub const AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpeechError {
    #[error("speech credentials are not configured")]
    MissingCredentials,
    #[error("speech generation timed out")]
    Timeout,
    #[error("speech provider error: {0}")]
    Upstream(String),
    #[error("speech provider returned an empty payload")]
    EmptyResult,
}

/// Repository for speech synthesis.
/// Abstracts the underlying provider (OpenAI speech, AWS Polly, ...)
///
/// Implementations are responsible for:
/// - Capping the input at [`MAX_NARRATION_CHARS`] via [`truncate_for_narration`]
/// - Bounding the remote call with [`SYNTHESIS_TIMEOUT`]
/// - Classifying failures into [`SpeechError`]
///
/// No retries happen at this layer; retry policy, if any, belongs to the
/// caller.
#[async_trait]
pub trait SpeechRepository: Send + Sync {
    /// Synthesize `text` into a compressed audio payload (MP3).
    ///
    /// `voice` is a provider-meaningful voice identifier. `instructions` is
    /// an opaque style directive passed through verbatim where the provider
    /// supports one; `None` falls back to [`DEFAULT_STYLE_INSTRUCTIONS`].
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        instructions: Option<&str>,
    ) -> Result<Bytes, SpeechError>;
}

/// Cap `text` at [`MAX_NARRATION_CHARS`] characters, appending the
/// truncation marker when anything was dropped. Counts characters, not
/// bytes, so multi-byte input is never split mid-character.
pub fn truncate_for_narration(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(MAX_NARRATION_CHARS) {
        None => Cow::Borrowed(text),
        Some((byte_idx, _)) => {
            let mut truncated = String::with_capacity(byte_idx + TRUNCATION_MARKER.len());
            truncated.push_str(&text[..byte_idx]);
            truncated.push_str(TRUNCATION_MARKER);
            Cow::Owned(truncated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncation_leaves_short_text_unmodified() {
        let text = "a".repeat(3999);
        let result = truncate_for_narration(&text);
        assert!(matches!(result, Cow::Borrowed(_)));
        assert_eq!(result, text);
    }

    #[test]
    fn test_truncation_leaves_exact_cap_unmodified() {
        let text = "a".repeat(MAX_NARRATION_CHARS);
        let result = truncate_for_narration(&text);
        assert_eq!(result, text);
    }

    #[test]
    fn test_truncation_cuts_long_text_at_cap_with_marker() {
        let text = "b".repeat(5000);
        let result = truncate_for_narration(&text);
        let expected = format!("{}{}", "b".repeat(MAX_NARRATION_CHARS), TRUNCATION_MARKER);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        // 4001 two-byte characters; naive byte slicing would panic or cut
        // mid-character.
        let text = "é".repeat(MAX_NARRATION_CHARS + 1);
        let result = truncate_for_narration(&text);
        assert_eq!(
            result.chars().count(),
            MAX_NARRATION_CHARS + TRUNCATION_MARKER.chars().count()
        );
        assert!(result.ends_with(TRUNCATION_MARKER));
    }
}
