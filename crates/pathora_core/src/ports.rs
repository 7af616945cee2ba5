//! crates/pathora_core/src/ports.rs
//!
//! Defines the service contracts (traits) the content pipeline depends on.
//! These traits form the boundary of the hexagonal architecture, keeping the core
//! independent of the database, the model provider and the search providers.

use async_trait::async_trait;

use crate::domain::{
    LessonContentUpdate, LessonId, LessonIdentity, LessonResourceBlob, ManualResource, ModuleId,
    PathId, UserId,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The error type shared by every port and pipeline operation.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// A provider credential is missing or unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The model answered, but not with the JSON shape we asked for.
    #[error("Generated content was malformed: {0}")]
    GenerationFormat(String),
    /// The model provider could not be reached or refused the request.
    #[error("Generation provider failed: {0}")]
    GenerationProvider(String),
    /// A write sequence failed; everything it wrote has been rolled back.
    #[error("Failed to persist generated content: {0}")]
    Materialization(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Persistence Ports
//=========================================================================================

/// A lesson row as written by the materializer.
#[derive(Debug, Clone, Copy)]
pub struct NewLesson<'a> {
    pub title: &'a str,
    pub content: &'a str,
    pub difficulty: &'a str,
    pub estimated_time: &'a str,
}

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Auth ---
    /// Resolves a session token to the owning user.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<UserId>;

    // --- Curriculum ---
    /// Opens a transaction for writing one generated curriculum.
    async fn begin_curriculum(&self) -> PortResult<Box<dyn CurriculumTransaction>>;

    // --- Lessons ---
    async fn get_lesson_identity(&self, lesson_id: LessonId) -> PortResult<LessonIdentity>;

    /// Replaces the generated columns of a lesson in a single update.
    async fn save_lesson_package(
        &self,
        lesson_id: LessonId,
        update: &LessonContentUpdate,
    ) -> PortResult<()>;

    // --- Resources ---
    /// All curated resources, in table order.
    async fn list_manual_resources(&self) -> PortResult<Vec<ManualResource>>;

    /// The non-empty `ai_resources` blobs of every lesson under a path owned by
    /// `owner_id`, ordered by path, module order, then lesson.
    async fn list_lesson_resource_blobs(
        &self,
        owner_id: UserId,
    ) -> PortResult<Vec<LessonResourceBlob>>;
}

/// A unit of work that writes a path and its children.
///
/// Nothing written through it is visible to other readers until `commit`.
#[async_trait]
pub trait CurriculumTransaction: Send {
    async fn insert_path(
        &mut self,
        owner_id: UserId,
        title: &str,
        description: &str,
        difficulty: &str,
    ) -> PortResult<PathId>;

    async fn insert_module(&mut self, path_id: PathId, title: &str, order: i32)
        -> PortResult<ModuleId>;

    async fn insert_lesson(&mut self, module_id: ModuleId, lesson: NewLesson<'_>)
        -> PortResult<LessonId>;

    async fn commit(self: Box<Self>) -> PortResult<()>;

    async fn rollback(self: Box<Self>) -> PortResult<()>;
}

//=========================================================================================
// Model and Search Ports
//=========================================================================================

/// A single instruction pair sent to the generative model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    /// Ask the provider to force a JSON object response.
    pub json_mode: bool,
}

#[async_trait]
pub trait LanguageModelService: Send + Sync {
    /// Returns the raw text of the model's answer.
    async fn complete(&self, request: CompletionRequest) -> PortResult<String>;
}

/// One hit from a search provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: Option<String>,
    pub link: String,
}

#[async_trait]
pub trait SearchService: Send + Sync {
    /// Returns at most `limit` hits, best first.
    async fn search(&self, query: &str, limit: u32) -> PortResult<Vec<SearchHit>>;
}
