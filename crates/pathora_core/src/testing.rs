//! In-memory fakes of every port, for unit tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::domain::{
    LessonContentUpdate, LessonId, LessonIdentity, LessonResourceBlob, ManualResource, ModuleId,
    PathId, UserId,
};
use crate::ports::{
    CompletionRequest, CurriculumTransaction, DatabaseService, LanguageModelService, NewLesson,
    PortError, PortResult, SearchHit, SearchService,
};

//=========================================================================================
// Database
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PathRow {
    pub id: PathId,
    pub owner_id: UserId,
    pub title: String,
    pub description: String,
    pub difficulty: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRow {
    pub id: ModuleId,
    pub path_id: PathId,
    pub title: String,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LessonRow {
    pub id: LessonId,
    pub module_id: ModuleId,
    pub title: String,
    pub content: String,
    pub difficulty: String,
    pub estimated_time: String,
    pub why_it_matters: Option<String>,
    pub what_you_learn: Option<String>,
    pub ai_resources: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub paths: Vec<PathRow>,
    pub modules: Vec<ModuleRow>,
    pub lessons: Vec<LessonRow>,
    pub resources: Vec<ManualResource>,
    next_id: i64,
    rollbacks: usize,
}

impl Tables {
    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// A database whose curriculum transactions stage rows privately until commit.
#[derive(Clone, Default)]
pub struct MemoryDb {
    tables: Arc<Mutex<Tables>>,
    fail_lesson_insert_after: Option<usize>,
    fail_lesson_updates: bool,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every transaction reject lesson inserts once `n` have succeeded.
    pub fn fail_lesson_insert_after(mut self, n: usize) -> Self {
        self.fail_lesson_insert_after = Some(n);
        self
    }

    pub fn fail_lesson_updates(mut self) -> Self {
        self.fail_lesson_updates = true;
        self
    }

    pub fn snapshot(&self) -> Tables {
        self.tables.lock().unwrap().clone()
    }

    pub fn rollbacks(&self) -> usize {
        self.tables.lock().unwrap().rollbacks
    }

    pub fn add_resource(&self, resource: ManualResource) {
        self.tables.lock().unwrap().resources.push(resource);
    }

    /// Seeds a path with one module and returns the module id.
    pub fn add_path(&self, owner_id: UserId, title: &str) -> ModuleId {
        let mut tables = self.tables.lock().unwrap();
        let path_id = tables.allocate();
        tables.paths.push(PathRow {
            id: path_id,
            owner_id,
            title: title.to_string(),
            description: String::new(),
            difficulty: "beginner".to_string(),
        });
        let module_id = tables.allocate();
        tables.modules.push(ModuleRow {
            id: module_id,
            path_id,
            title: "Module".to_string(),
            order: 1,
        });
        module_id
    }

    pub fn add_lesson(
        &self,
        module_id: ModuleId,
        title: &str,
        ai_resources: Option<&str>,
    ) -> LessonId {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.allocate();
        tables.lessons.push(LessonRow {
            id,
            module_id,
            title: title.to_string(),
            difficulty: "beginner".to_string(),
            ai_resources: ai_resources.map(str::to_string),
            ..LessonRow::default()
        });
        id
    }

    pub fn lesson(&self, lesson_id: LessonId) -> Option<LessonRow> {
        self.snapshot().lessons.into_iter().find(|l| l.id == lesson_id)
    }
}

#[async_trait]
impl DatabaseService for MemoryDb {
    async fn validate_auth_session(&self, _session_id: &str) -> PortResult<UserId> {
        Err(PortError::Unauthorized)
    }

    async fn begin_curriculum(&self) -> PortResult<Box<dyn CurriculumTransaction>> {
        Ok(Box::new(MemoryTransaction {
            tables: self.tables.clone(),
            staged: Tables::default(),
            fail_lesson_insert_after: self.fail_lesson_insert_after,
        }))
    }

    async fn get_lesson_identity(&self, lesson_id: LessonId) -> PortResult<LessonIdentity> {
        let tables = self.snapshot();
        let lesson = tables
            .lessons
            .iter()
            .find(|l| l.id == lesson_id)
            .ok_or_else(|| PortError::NotFound(format!("Lesson {} not found", lesson_id)))?;
        let path = tables
            .modules
            .iter()
            .find(|m| m.id == lesson.module_id)
            .and_then(|m| tables.paths.iter().find(|p| p.id == m.path_id));
        Ok(LessonIdentity {
            lesson_id,
            title: lesson.title.clone(),
            difficulty: lesson.difficulty.clone(),
            path_title: path.map(|p| p.title.clone()).unwrap_or_default(),
            owner_id: path.map(|p| p.owner_id),
        })
    }

    async fn save_lesson_package(
        &self,
        lesson_id: LessonId,
        update: &LessonContentUpdate,
    ) -> PortResult<()> {
        if self.fail_lesson_updates {
            return Err(PortError::Unexpected("disk full".to_string()));
        }
        let mut tables = self.tables.lock().unwrap();
        let lesson = tables
            .lessons
            .iter_mut()
            .find(|l| l.id == lesson_id)
            .ok_or_else(|| PortError::NotFound(format!("Lesson {} not found", lesson_id)))?;
        lesson.content = update.content.clone();
        lesson.why_it_matters = Some(update.why_it_matters.clone());
        lesson.what_you_learn = Some(update.what_you_learn.clone());
        lesson.ai_resources = Some(update.ai_resources.clone());
        Ok(())
    }

    async fn list_manual_resources(&self) -> PortResult<Vec<ManualResource>> {
        Ok(self.snapshot().resources)
    }

    async fn list_lesson_resource_blobs(
        &self,
        owner_id: UserId,
    ) -> PortResult<Vec<LessonResourceBlob>> {
        let tables = self.snapshot();
        let mut blobs = Vec::new();
        for path in tables.paths.iter().filter(|p| p.owner_id == owner_id) {
            for module in tables.modules.iter().filter(|m| m.path_id == path.id) {
                for lesson in tables.lessons.iter().filter(|l| l.module_id == module.id) {
                    match lesson.ai_resources.as_deref() {
                        Some(blob) if !blob.trim().is_empty() => blobs.push(LessonResourceBlob {
                            lesson_id: lesson.id,
                            ai_resources: blob.to_string(),
                        }),
                        _ => {}
                    }
                }
            }
        }
        Ok(blobs)
    }
}

struct MemoryTransaction {
    tables: Arc<Mutex<Tables>>,
    staged: Tables,
    fail_lesson_insert_after: Option<usize>,
}

impl MemoryTransaction {
    fn allocate(&self) -> i64 {
        self.tables.lock().unwrap().allocate()
    }
}

#[async_trait]
impl CurriculumTransaction for MemoryTransaction {
    async fn insert_path(
        &mut self,
        owner_id: UserId,
        title: &str,
        description: &str,
        difficulty: &str,
    ) -> PortResult<PathId> {
        let id = self.allocate();
        self.staged.paths.push(PathRow {
            id,
            owner_id,
            title: title.to_string(),
            description: description.to_string(),
            difficulty: difficulty.to_string(),
        });
        Ok(id)
    }

    async fn insert_module(
        &mut self,
        path_id: PathId,
        title: &str,
        order: i32,
    ) -> PortResult<ModuleId> {
        let id = self.allocate();
        self.staged.modules.push(ModuleRow {
            id,
            path_id,
            title: title.to_string(),
            order,
        });
        Ok(id)
    }

    async fn insert_lesson(
        &mut self,
        module_id: ModuleId,
        lesson: NewLesson<'_>,
    ) -> PortResult<LessonId> {
        if self
            .fail_lesson_insert_after
            .is_some_and(|n| self.staged.lessons.len() >= n)
        {
            return Err(PortError::Unexpected("constraint violation".to_string()));
        }
        let id = self.allocate();
        self.staged.lessons.push(LessonRow {
            id,
            module_id,
            title: lesson.title.to_string(),
            content: lesson.content.to_string(),
            difficulty: lesson.difficulty.to_string(),
            estimated_time: lesson.estimated_time.to_string(),
            ..LessonRow::default()
        });
        Ok(id)
    }

    async fn commit(self: Box<Self>) -> PortResult<()> {
        let MemoryTransaction { tables, staged, .. } = *self;
        let mut tables = tables.lock().unwrap();
        tables.paths.extend(staged.paths);
        tables.modules.extend(staged.modules);
        tables.lessons.extend(staged.lessons);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> PortResult<()> {
        self.tables.lock().unwrap().rollbacks += 1;
        Ok(())
    }
}

//=========================================================================================
// Language Model
//=========================================================================================

/// Replays canned answers in order and records what it was asked.
#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<PortResult<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn with_responses(responses: Vec<PortResult<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModelService for ScriptedModel {
    async fn complete(&self, request: CompletionRequest) -> PortResult<String> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(PortError::GenerationProvider(
                    "no scripted response".to_string(),
                ))
            })
    }
}

//=========================================================================================
// Search
//=========================================================================================

/// A search provider with a fixed answer. Clones share the query log.
#[derive(Clone)]
pub struct FakeSearch {
    links: Vec<String>,
    error: Option<String>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl FakeSearch {
    pub fn empty() -> Self {
        Self::with_links(&[])
    }

    pub fn with_links(links: &[&str]) -> Self {
        Self {
            links: links.iter().map(|l| l.to_string()).collect(),
            error: None,
            queries: Arc::default(),
        }
    }

    pub fn failing(error: PortError) -> Self {
        Self {
            links: Vec::new(),
            error: Some(error.to_string()),
            queries: Arc::default(),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchService for FakeSearch {
    async fn search(&self, query: &str, limit: u32) -> PortResult<Vec<SearchHit>> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(error) = &self.error {
            return Err(PortError::Unexpected(error.clone()));
        }
        Ok(self
            .links
            .iter()
            .take(limit as usize)
            .map(|link| SearchHit {
                title: None,
                link: link.clone(),
            })
            .collect())
    }
}
