//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::port_error_response;
use crate::web::state::AppState;
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use pathora_core::domain::{
    GeneratedLessonContent, GenerationRequest, LessonId, QuizRequest, UserId,
};
use pathora_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        generate_path_handler,
        generate_lesson_content_handler,
        generate_quiz_handler,
        list_resources_handler,
        resource_stats_handler,
        list_resources_by_category_handler,
    ),
    components(
        schemas(
            GeneratePathRequest,
            GeneratePathResponse,
            LessonContentRequest,
            LessonContentResponse,
            GenerateQuizRequest,
        )
    ),
    tags(
        (name = "Pathora API", description = "AI curriculum generation and learning resources.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request and Response Payloads
//=========================================================================================

/// Parameters for a new learning path.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GeneratePathRequest {
    pub topic: String,
    pub difficulty: String,
    #[serde(alias = "duration_weeks")]
    pub weeks: u32,
    pub hours_per_week: u32,
}

impl GeneratePathRequest {
    fn into_domain(self, requester_id: UserId) -> GenerationRequest {
        GenerationRequest {
            topic: self.topic,
            difficulty: self.difficulty,
            duration_weeks: self.weeks,
            hours_per_week: self.hours_per_week,
            requester_id,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GeneratePathResponse {
    pub message: String,
    pub path_id: i64,
    pub title: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LessonContentRequest {
    pub lesson_id: LessonId,
}

/// The generated lesson, with every resource already resolved to a URL.
#[derive(Debug, Serialize, ToSchema)]
pub struct LessonContentResponse {
    pub message: String,
    #[schema(value_type = Object)]
    pub lesson: GeneratedLessonContent,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateQuizRequest {
    pub topic: String,
    pub difficulty: String,
    #[serde(default = "default_question_count")]
    pub question_count: u32,
}

fn default_question_count() -> u32 {
    5
}

impl From<GenerateQuizRequest> for QuizRequest {
    fn from(req: GenerateQuizRequest) -> Self {
        QuizRequest {
            topic: req.topic,
            difficulty: req.difficulty,
            question_count: req.question_count,
        }
    }
}

/// Logs a failed operation and turns it into the response tuple.
fn reject(request_id: Uuid, operation: &str, e: PortError) -> (StatusCode, String) {
    let (status, message) = port_error_response(&e);
    if status.is_server_error() {
        error!("[{}] {} failed: {:?}", request_id, operation, e);
    } else {
        info!("[{}] {} rejected: {}", request_id, operation, message);
    }
    (status, message)
}

//=========================================================================================
// Generation Handlers
//=========================================================================================

/// Generate a learning path for the signed-in user and store it.
#[utoipa::path(
    post,
    path = "/ai/generate-path",
    request_body = GeneratePathRequest,
    responses(
        (status = 201, description = "Learning path generated and stored",
            body = GeneratePathResponse),
        (status = 400, description = "Invalid request parameters"),
        (status = 401, description = "Missing or invalid session"),
        (status = 502, description = "The model failed or answered with malformed JSON"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn generate_path_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Json(payload): Json<GeneratePathRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let request_id = Uuid::new_v4();
    info!(
        "[{}] Generating path on '{}' for user {}",
        request_id, payload.topic, user_id
    );

    let persisted = app_state
        .pipeline
        .generate_path(&payload.into_domain(user_id))
        .await
        .map_err(|e| reject(request_id, "Path generation", e))?;

    info!("[{}] Stored path {}", request_id, persisted.path_id);
    Ok((
        StatusCode::CREATED,
        Json(GeneratePathResponse {
            message: "Learning path generated".to_string(),
            path_id: persisted.path_id,
            title: persisted.title,
        }),
    ))
}

/// Generate study content and resources for one of the user's lessons.
#[utoipa::path(
    post,
    path = "/ai/generate-lesson-content",
    request_body = LessonContentRequest,
    responses(
        (status = 200, description = "Lesson content generated and stored",
            body = LessonContentResponse),
        (status = 401, description = "Missing or invalid session"),
        (status = 404, description = "Lesson not found"),
        (status = 502, description = "The model failed or answered with malformed JSON"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn generate_lesson_content_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Json(payload): Json<LessonContentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let request_id = Uuid::new_v4();
    info!(
        "[{}] Generating content for lesson {} (user {})",
        request_id, payload.lesson_id, user_id
    );

    let lesson = app_state
        .pipeline
        .generate_lesson_content(payload.lesson_id, user_id)
        .await
        .map_err(|e| reject(request_id, "Lesson generation", e))?;

    Ok(Json(LessonContentResponse {
        message: "Lesson content generated".to_string(),
        lesson,
    }))
}

/// Generate a multiple-choice quiz. Nothing is stored.
#[utoipa::path(
    post,
    path = "/ai/generate-quiz",
    request_body = GenerateQuizRequest,
    responses(
        (status = 200, description = "The generated quiz", body = serde_json::Value),
        (status = 400, description = "Invalid request parameters"),
        (status = 401, description = "Missing or invalid session"),
        (status = 502, description = "The model failed or answered with malformed JSON")
    )
)]
pub async fn generate_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Json(payload): Json<GenerateQuizRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let request_id = Uuid::new_v4();
    info!(
        "[{}] Generating {} question quiz on '{}' for user {}",
        request_id, payload.question_count, payload.topic, user_id
    );

    let quiz = app_state
        .pipeline
        .generate_quiz(&payload.into())
        .await
        .map_err(|e| reject(request_id, "Quiz generation", e))?;

    Ok(Json(quiz))
}

//=========================================================================================
// Resource Handlers
//=========================================================================================

/// List curated resources followed by the AI resources of the user's lessons.
#[utoipa::path(
    get,
    path = "/resources",
    responses(
        (status = 200, description = "Curated and generated resources",
            body = Vec<serde_json::Value>),
        (status = 401, description = "Missing or invalid session"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_resources_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let request_id = Uuid::new_v4();
    let entries = app_state
        .pipeline
        .list_resources(user_id)
        .await
        .map_err(|e| reject(request_id, "Resource listing", e))?;
    Ok(Json(entries))
}

/// Count resources per category.
#[utoipa::path(
    get,
    path = "/resources/stats",
    responses(
        (status = 200, description = "Resource count per category label",
            body = BTreeMap<String, usize>),
        (status = 401, description = "Missing or invalid session"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn resource_stats_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let request_id = Uuid::new_v4();
    let stats: BTreeMap<String, usize> = app_state
        .pipeline
        .resource_stats(user_id)
        .await
        .map_err(|e| reject(request_id, "Resource stats", e))?;
    Ok(Json(stats))
}

/// List resources whose category matches, ignoring case.
#[utoipa::path(
    get,
    path = "/resources/category/{category}",
    params(
        ("category" = String, Path, description = "Category label, e.g. `Video Courses`.")
    ),
    responses(
        (status = 200, description = "Resources in the category", body = Vec<serde_json::Value>),
        (status = 401, description = "Missing or invalid session"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_resources_by_category_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<UserId>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let request_id = Uuid::new_v4();
    let entries = app_state
        .pipeline
        .list_resources_in_category(user_id, &category)
        .await
        .map_err(|e| reject(request_id, "Category listing", e))?;
    Ok(Json(entries))
}
