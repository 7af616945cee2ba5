//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` and `CurriculumTransaction` ports from the `core` crate.
//! It handles all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pathora_core::domain::{
    LessonContentUpdate, LessonId, LessonIdentity, LessonResourceBlob, ManualResource, ModuleId,
    PathId, UserId,
};
use pathora_core::ports::{
    CurriculumTransaction, DatabaseService, NewLesson, PortError, PortResult,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct AuthSessionRecord {
    user_id: i64,
    expires_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct LessonIdentityRecord {
    lesson_id: i64,
    title: String,
    difficulty: Option<String>,
    path_title: Option<String>,
    owner_id: Option<i64>,
}
impl LessonIdentityRecord {
    fn to_domain(self) -> LessonIdentity {
        LessonIdentity {
            lesson_id: self.lesson_id,
            title: self.title,
            difficulty: self.difficulty.unwrap_or_else(|| "beginner".to_string()),
            path_title: self.path_title.unwrap_or_default(),
            owner_id: self.owner_id,
        }
    }
}

#[derive(FromRow)]
struct ManualResourceRecord {
    id: i64,
    title: String,
    description: Option<String>,
    kind: Option<String>,
    category: Option<String>,
    url: Option<String>,
    icon_name: Option<String>,
}
impl ManualResourceRecord {
    fn to_domain(self) -> ManualResource {
        ManualResource {
            id: self.id,
            title: self.title,
            description: self.description.unwrap_or_default(),
            kind: self.kind.unwrap_or_default(),
            category: self.category,
            url: self.url.unwrap_or_default(),
            icon_name: self.icon_name,
        }
    }
}

#[derive(FromRow)]
struct LessonBlobRecord {
    lesson_id: i64,
    ai_resources: String,
}
impl LessonBlobRecord {
    fn to_domain(self) -> LessonResourceBlob {
        LessonResourceBlob {
            lesson_id: self.lesson_id,
            ai_resources: self.ai_resources,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<UserId> {
        let record = sqlx::query_as::<_, AuthSessionRecord>(
            "SELECT user_id, expires_at FROM auth_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or(PortError::Unauthorized)?;

        if record.expires_at <= Utc::now() {
            return Err(PortError::Unauthorized);
        }
        Ok(record.user_id)
    }

    async fn begin_curriculum(&self) -> PortResult<Box<dyn CurriculumTransaction>> {
        let tx = self.pool.begin().await.map_err(unexpected)?;
        Ok(Box::new(PgCurriculumTransaction { tx }))
    }

    async fn get_lesson_identity(&self, lesson_id: LessonId) -> PortResult<LessonIdentity> {
        let record = sqlx::query_as::<_, LessonIdentityRecord>(
            "SELECT l.id AS lesson_id, l.title, l.difficulty, \
                    lp.title AS path_title, lp.creator_id AS owner_id \
             FROM lessons l \
             JOIN modules m ON m.id = l.module_id \
             JOIN learning_paths lp ON lp.id = m.learning_path_id \
             WHERE l.id = $1",
        )
        .bind(lesson_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Lesson {} not found", lesson_id))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn save_lesson_package(
        &self,
        lesson_id: LessonId,
        update: &LessonContentUpdate,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE lessons \
             SET content = $1, why_it_matters = $2, what_you_learn = $3, ai_resources = $4 \
             WHERE id = $5",
        )
        .bind(&update.content)
        .bind(&update.why_it_matters)
        .bind(&update.what_you_learn)
        .bind(&update.ai_resources)
        .bind(lesson_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Lesson {} not found", lesson_id)));
        }
        Ok(())
    }

    async fn list_manual_resources(&self) -> PortResult<Vec<ManualResource>> {
        let records = sqlx::query_as::<_, ManualResourceRecord>(
            "SELECT id, title, description, type AS kind, category, url, icon_name \
             FROM resources ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn list_lesson_resource_blobs(
        &self,
        owner_id: UserId,
    ) -> PortResult<Vec<LessonResourceBlob>> {
        let records = sqlx::query_as::<_, LessonBlobRecord>(
            "SELECT l.id AS lesson_id, l.ai_resources \
             FROM lessons l \
             JOIN modules m ON m.id = l.module_id \
             JOIN learning_paths lp ON lp.id = m.learning_path_id \
             WHERE lp.creator_id = $1 \
               AND l.ai_resources IS NOT NULL \
               AND btrim(l.ai_resources) <> '' \
             ORDER BY lp.id ASC, m.module_order ASC, m.id ASC, l.id ASC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}

//=========================================================================================
// `CurriculumTransaction` Implementation
//=========================================================================================

/// A curriculum write running inside one Postgres transaction.
///
/// Dropping it without `commit` rolls the transaction back.
pub struct PgCurriculumTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CurriculumTransaction for PgCurriculumTransaction {
    async fn insert_path(
        &mut self,
        owner_id: UserId,
        title: &str,
        description: &str,
        difficulty: &str,
    ) -> PortResult<PathId> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO learning_paths (title, description, difficulty, creator_id) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(title)
        .bind(description)
        .bind(difficulty)
        .bind(owner_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(unexpected)
    }

    async fn insert_module(
        &mut self,
        path_id: PathId,
        title: &str,
        order: i32,
    ) -> PortResult<ModuleId> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO modules (title, module_order, learning_path_id) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(title)
        .bind(order)
        .bind(path_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(unexpected)
    }

    async fn insert_lesson(
        &mut self,
        module_id: ModuleId,
        lesson: NewLesson<'_>,
    ) -> PortResult<LessonId> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO lessons (title, content, difficulty, estimated_time, module_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(lesson.title)
        .bind(lesson.content)
        .bind(lesson.difficulty)
        .bind(lesson.estimated_time)
        .bind(module_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(unexpected)
    }

    async fn commit(self: Box<Self>) -> PortResult<()> {
        self.tx.commit().await.map_err(unexpected)
    }

    async fn rollback(self: Box<Self>) -> PortResult<()> {
        self.tx.rollback().await.map_err(unexpected)
    }
}
