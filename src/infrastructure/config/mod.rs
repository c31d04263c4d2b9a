use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub environment: Environment,
    pub log_format: LogFormat,
    // Object storage
    pub aws_region: String,
    pub audio_bucket: String,
    // Speech synthesis
    pub speech_provider: SpeechProvider,
    pub openai_api_key: String,
    pub openai_speech_model: String,
    pub openai_voice: String,
    pub polly_voice: String,
    // Narration URL cache
    pub narration_cache_enabled: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SpeechProvider {
    OpenAi,
    Polly,
}

/// Log format used when LOG_FORMAT is unset: human-readable locally,
/// machine-parseable in production.
fn default_log_format(environment: &Environment) -> LogFormat {
    match environment {
        Environment::Production => LogFormat::Json,
        Environment::Development => LogFormat::Pretty,
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let environment = match env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string())
            .as_str()
        {
            "production" => Environment::Production,
            _ => Environment::Development,
        };

        let log_format = match env::var("LOG_FORMAT") {
            Ok(value) if value == "json" => LogFormat::Json,
            Ok(_) => LogFormat::Pretty,
            Err(_) => default_log_format(&environment),
        };

        let config = Config {
            database_url: env::var("DATABASE_URL")?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            jwt_secret: env::var("JWT_SECRET")?,
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()?,
            environment,
            log_format,
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "eu-west-1".to_string()),
            audio_bucket: env::var("AUDIO_BUCKET")?,
            speech_provider: match env::var("SPEECH_PROVIDER")
                .unwrap_or_else(|_| "openai".to_string())
                .to_lowercase()
                .as_str()
            {
                "polly" => SpeechProvider::Polly,
                _ => SpeechProvider::OpenAi,
            },
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            openai_speech_model: env::var("OPENAI_SPEECH_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini-tts".to_string()),
            openai_voice: env::var("OPENAI_VOICE").unwrap_or_else(|_| "nova".to_string()),
            polly_voice: env::var("POLLY_VOICE").unwrap_or_else(|_| "Joanna".to_string()),
            narration_cache_enabled: env::var("NARRATION_CACHE_ENABLED")
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(true),
        };

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_defaults_to_json_logs() {
        assert_eq!(
            default_log_format(&Environment::Production),
            LogFormat::Json
        );
    }

    #[test]
    fn test_development_defaults_to_pretty_logs() {
        assert_eq!(
            default_log_format(&Environment::Development),
            LogFormat::Pretty
        );
    }
}
