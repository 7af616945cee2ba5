//! crates/pathora_core/src/pipeline.rs
//!
//! The operations exposed to the web layer. Each one is a single request-scoped
//! unit of work over the ports; nothing is kept between calls.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::aggregator;
use crate::domain::{
    GeneratedLessonContent, GenerationRequest, LessonContentUpdate, LessonId, PersistedPath, Quiz,
    QuizRequest, RawResource, ResolvedResource, ResourceEntry, UserId,
};
use crate::materializer::materialize;
use crate::ports::{DatabaseService, PortError, PortResult};
use crate::requester::ContentRequester;
use crate::resolver::ResourceResolver;

#[derive(Clone)]
pub struct ContentPipeline {
    db: Arc<dyn DatabaseService>,
    requester: ContentRequester,
    resolver: ResourceResolver,
}

impl ContentPipeline {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        requester: ContentRequester,
        resolver: ResourceResolver,
    ) -> Self {
        Self {
            db,
            requester,
            resolver,
        }
    }

    /// Generates a curriculum and persists it for the requester.
    ///
    /// The model call completes before the write transaction opens, so a
    /// provider or format failure never leaves anything behind.
    pub async fn generate_path(&self, request: &GenerationRequest) -> PortResult<PersistedPath> {
        let curriculum = self.requester.generate_curriculum(request).await?;
        materialize(self.db.as_ref(), &curriculum, request.requester_id).await
    }

    /// Generates study content for a lesson the requester owns and stores it,
    /// resources included, in one update.
    pub async fn generate_lesson_content(
        &self,
        lesson_id: LessonId,
        requester_id: UserId,
    ) -> PortResult<GeneratedLessonContent> {
        let lesson = self.db.get_lesson_identity(lesson_id).await?;
        if lesson.owner_id != Some(requester_id) {
            return Err(PortError::NotFound(format!("Lesson {} not found", lesson_id)));
        }

        let package = self.requester.generate_lesson_package(&lesson).await?;
        let resources = self
            .resolver
            .resolve_all(&package.resources, Some(lesson_id))
            .await;

        let stored: Vec<RawResource> = resources.iter().map(ResolvedResource::to_stored).collect();
        let update = LessonContentUpdate {
            content: package.content.clone(),
            why_it_matters: package.why_it_matters.clone(),
            what_you_learn: to_json(&package.what_you_learn)?,
            ai_resources: to_json(&stored)?,
        };
        self.db
            .save_lesson_package(lesson_id, &update)
            .await
            .map_err(|e| PortError::Materialization(e.to_string()))?;
        info!(
            "Stored content for lesson {} with {} resources",
            lesson_id,
            resources.len()
        );

        Ok(GeneratedLessonContent {
            lesson_id,
            content: package.content,
            why_it_matters: package.why_it_matters,
            what_you_learn: package.what_you_learn,
            resources,
        })
    }

    pub async fn generate_quiz(&self, request: &QuizRequest) -> PortResult<Quiz> {
        self.requester.generate_quiz(request).await
    }

    /// Curated resources followed by the AI resources of the owner's lessons.
    pub async fn list_resources(&self, owner_id: UserId) -> PortResult<Vec<ResourceEntry>> {
        let manual = self.db.list_manual_resources().await?;
        let blobs = self.db.list_lesson_resource_blobs(owner_id).await?;
        Ok(aggregator::aggregate(manual, &blobs))
    }

    pub async fn list_resources_in_category(
        &self,
        owner_id: UserId,
        category: &str,
    ) -> PortResult<Vec<ResourceEntry>> {
        let mut entries = self.list_resources(owner_id).await?;
        entries.retain(|entry| aggregator::in_category(entry, category));
        Ok(entries)
    }

    pub async fn resource_stats(&self, owner_id: UserId) -> PortResult<BTreeMap<String, usize>> {
        let manual = self.db.list_manual_resources().await?;
        let blobs = self.db.list_lesson_resource_blobs(owner_id).await?;
        Ok(aggregator::stats(&manual, &blobs))
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> PortResult<String> {
    serde_json::to_string(value).map_err(|e| PortError::Unexpected(e.to_string()))
}
