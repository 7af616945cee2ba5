//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        openai_client, DbAdapter, GoogleSearchAdapter, OpenAiJsonAdapter, YouTubeSearchAdapter,
    },
    config::Config,
    error::ApiError,
    web::{
        generate_lesson_content_handler, generate_path_handler, generate_quiz_handler,
        list_resources_by_category_handler, list_resources_handler, require_auth,
        resource_stats_handler, rest::ApiDoc, state::AppState,
    },
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use pathora_core::{ContentPipeline, ContentRequester, ResourceResolver};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let llm_client = openai_client(&config.openai_api_key, config.openai_api_base.as_deref());
    let curriculum_llm = Arc::new(OpenAiJsonAdapter::new(
        llm_client.clone(),
        config.curriculum_model.clone(),
    ));
    let lesson_llm = Arc::new(OpenAiJsonAdapter::new(
        llm_client,
        config.lesson_model.clone(),
    ));

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;
    if config.youtube_api_key.is_none() {
        warn!("YOUTUBE_API_KEY is not set; video resources will link to search pages.");
    }
    if config.web_search.is_none() {
        warn!("Google search is not configured; web resources will link to search pages.");
    }
    let video_search = Arc::new(YouTubeSearchAdapter::new(
        http.clone(),
        config.youtube_api_key.clone(),
    ));
    let web_search = Arc::new(GoogleSearchAdapter::new(
        http,
        config
            .web_search
            .clone()
            .map(|creds| (creds.api_key, creds.engine_id)),
    ));

    // --- 4. Build the Shared AppState ---
    let pipeline = ContentPipeline::new(
        db_adapter.clone(),
        ContentRequester::new(curriculum_llm, lesson_llm),
        ResourceResolver::new(video_search, web_search),
    );
    let app_state = Arc::new(AppState {
        db: db_adapter,
        pipeline,
    });

    // --- 5. Configure CORS ---
    let mut origins = Vec::with_capacity(config.allowed_origins.len());
    for origin in &config.allowed_origins {
        let value = origin.parse::<HeaderValue>().map_err(|e| {
            ApiError::Internal(format!("Invalid origin '{}' in ALLOWED_ORIGINS: {}", origin, e))
        })?;
        origins.push(value);
    }
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    let protected_routes = Router::new()
        .route("/ai/generate-path", post(generate_path_handler))
        .route("/ai/generate-lesson-content", post(generate_lesson_content_handler))
        .route("/ai/generate-quiz", post(generate_quiz_handler))
        .route("/resources", get(list_resources_handler))
        .route("/resources/stats", get(resource_stats_handler))
        .route(
            "/resources/category/{category}",
            get(list_resources_by_category_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
