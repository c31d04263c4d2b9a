use crate::error::AppError;
use crate::infrastructure::repositories::SpeechError;

#[derive(Debug, thiserror::Error)]
pub enum NarrationServiceError {
    #[error(transparent)]
    Speech(#[from] SpeechError),
    #[error("narration storage failed: {0}")]
    StorageWrite(String),
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("dependency error: {0}")]
    Dependency(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<NarrationServiceError> for AppError {
    fn from(err: NarrationServiceError) -> Self {
        match err {
            NarrationServiceError::Speech(SpeechError::Timeout) => {
                AppError::Timeout("speech generation timed out, please try again".to_string())
            }
            NarrationServiceError::Speech(SpeechError::MissingCredentials) => {
                AppError::ExternalService("narration is currently unavailable".to_string())
            }
            NarrationServiceError::Speech(e @ SpeechError::EmptyResult)
            | NarrationServiceError::Speech(e @ SpeechError::Upstream(_)) => {
                AppError::ExternalService(e.to_string())
            }
            NarrationServiceError::Invalid(msg) => AppError::BadRequest(msg),
            NarrationServiceError::StorageWrite(msg) => AppError::Internal(msg),
            NarrationServiceError::Dependency(msg) => AppError::ExternalService(msg),
            NarrationServiceError::Other(e) => AppError::Internal(e.to_string()),
        }
    }
}
