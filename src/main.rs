use async_openai::config::OpenAIConfig;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snapstory_backend::infrastructure::config::{Config, LogFormat, SpeechProvider};
use snapstory_backend::infrastructure::db::{check_connection, create_pool};
use snapstory_backend::infrastructure::http::start_http_server;
use snapstory_backend::infrastructure::repositories::SpeechRepository;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting SnapStory Backend on {}:{}",
        config.host,
        config.port
    );

    // Create database connection pool
    let pool = create_pool(&config).await?;
    tracing::info!("Database connection pool created");

    // Verify database connection
    check_connection(&pool).await?;
    tracing::info!("Database connection verified");

    // AWS config backs both the audio bucket and the Polly fallback
    tracing::info!("Loading AWS configuration for region: {}", config.aws_region);
    let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.aws_region.clone()))
        .load()
        .await;

    let s3_client = Arc::new(aws_sdk_s3::Client::new(&aws_config));
    tracing::info!(bucket = %config.audio_bucket, "S3 client initialized");

    let pool = Arc::new(pool);
    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Instantiate repositories (inject db pool and AWS clients)
    tracing::info!("Instantiating repositories...");
    let audio_storage: Arc<dyn snapstory_backend::infrastructure::storage::ObjectStorage> =
        Arc::new(snapstory_backend::infrastructure::storage::S3ObjectStorage::new(
            s3_client,
            config.audio_bucket.clone(),
            config.aws_region.clone(),
        ));
    let record_repo: Arc<dyn snapstory_backend::infrastructure::repositories::NarrationRecordRepository> =
        Arc::new(snapstory_backend::infrastructure::repositories::PgNarrationRecordRepository::new(pool.clone()));
    let narration_repo = Arc::new(
        snapstory_backend::infrastructure::repositories::NarrationRepository::new(
            audio_storage,
            record_repo,
        ),
    );
    let story_repo: Arc<dyn snapstory_backend::infrastructure::repositories::StoryRepository> =
        Arc::new(snapstory_backend::infrastructure::repositories::PgStoryRepository::new(pool.clone()));
    let favorites_repo =
        Arc::new(snapstory_backend::infrastructure::repositories::PgFavoritesRepository::new(pool.clone()));

    // 2. Instantiate the speech provider
    let speech_repo: Arc<dyn SpeechRepository> = match config.speech_provider {
        SpeechProvider::OpenAi => {
            tracing::info!(model = %config.openai_speech_model, "Using OpenAI speech synthesis");
            let openai_client = Arc::new(async_openai::Client::with_config(
                OpenAIConfig::new().with_api_key(config.openai_api_key.clone()),
            ));
            Arc::new(
                snapstory_backend::infrastructure::repositories::OpenAiSpeechRepository::new(
                    openai_client,
                    config.openai_speech_model.clone(),
                    config.openai_voice.clone(),
                    !config.openai_api_key.is_empty(),
                ),
            )
        }
        SpeechProvider::Polly => {
            tracing::info!(voice = %config.polly_voice, "Using AWS Polly speech synthesis");
            let polly_client = Arc::new(aws_sdk_polly::Client::new(&aws_config));
            Arc::new(
                snapstory_backend::infrastructure::repositories::PollySpeechRepository::new(
                    polly_client,
                    config.polly_voice.clone(),
                ),
            )
        }
    };

    // 3. Instantiate services (inject repositories and clients)
    tracing::info!("Instantiating services...");
    let narration_service = Arc::new(snapstory_backend::domain::narration::NarrationService::new(
        speech_repo,
        narration_repo,
        story_repo,
        favorites_repo.clone(),
        config.narration_cache_enabled,
    ));

    // 4. Instantiate controllers (inject services)
    tracing::info!("Instantiating controllers...");
    let narration_controller = Arc::new(
        snapstory_backend::controllers::narration::NarrationController::new(
            narration_service.clone(),
        ),
    );
    let favorites_controller = Arc::new(
        snapstory_backend::controllers::favorites::FavoritesController::new(
            favorites_repo,
            narration_service,
        ),
    );

    // Start HTTP server with all routes
    start_http_server(pool, config, narration_controller, favorites_controller).await?;

    Ok(())
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "snapstory_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "snapstory_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
