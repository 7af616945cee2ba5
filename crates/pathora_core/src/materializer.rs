//! crates/pathora_core/src/materializer.rs
//!
//! Writes a generated curriculum as path → modules → lessons inside one
//! transaction. Either the whole tree becomes visible or none of it does.

use tracing::{error, info, warn};

use crate::domain::{GeneratedCurriculum, GeneratedModule, PathId, PersistedPath, UserId};
use crate::ports::{CurriculumTransaction, DatabaseService, NewLesson, PortError, PortResult};

/// Persists `curriculum` for `owner_id`.
///
/// Any failure after the transaction opens rolls it back and is reported as
/// `PortError::Materialization`.
pub async fn materialize(
    db: &dyn DatabaseService,
    curriculum: &GeneratedCurriculum,
    owner_id: UserId,
) -> PortResult<PersistedPath> {
    let mut tx = db.begin_curriculum().await.map_err(as_materialization)?;

    match write_tree(tx.as_mut(), curriculum, owner_id).await {
        Ok(path_id) => {
            tx.commit().await.map_err(as_materialization)?;
            info!(
                "Materialized path {} ('{}') with {} modules",
                path_id,
                curriculum.title,
                curriculum.modules.len()
            );
            Ok(PersistedPath {
                path_id,
                title: curriculum.title.clone(),
            })
        }
        Err(e) => {
            let e = as_materialization(e);
            warn!("Rolling back curriculum '{}': {}", curriculum.title, e);
            if let Err(rollback_err) = tx.rollback().await {
                error!("Rollback failed: {:?}", rollback_err);
            }
            Err(e)
        }
    }
}

fn as_materialization(e: PortError) -> PortError {
    match e {
        PortError::Materialization(_) => e,
        other => PortError::Materialization(other.to_string()),
    }
}

fn missing(what: String) -> PortError {
    PortError::Materialization(format!("{} is missing", what))
}

async fn write_tree(
    tx: &mut dyn CurriculumTransaction,
    curriculum: &GeneratedCurriculum,
    owner_id: UserId,
) -> PortResult<PathId> {
    let path_id = tx
        .insert_path(
            owner_id,
            &curriculum.title,
            &curriculum.description,
            &curriculum.difficulty,
        )
        .await?;

    for (index, module) in curriculum.modules.iter().enumerate() {
        write_module(tx, path_id, index + 1, module).await?;
    }
    Ok(path_id)
}

async fn write_module(
    tx: &mut dyn CurriculumTransaction,
    path_id: PathId,
    position: usize,
    module: &GeneratedModule,
) -> PortResult<()> {
    let title = module
        .title
        .as_deref()
        .ok_or_else(|| missing(format!("title of module {}", position)))?;
    let lessons = module
        .lessons
        .as_ref()
        .ok_or_else(|| missing(format!("lessons of module {}", position)))?;
    let order = module
        .order
        .unwrap_or_else(|| i32::try_from(position).unwrap_or(i32::MAX));

    let module_id = tx.insert_module(path_id, title, order).await?;

    for (index, lesson) in lessons.iter().enumerate() {
        let at = |field: &str| format!("{} of lesson {} in module {}", field, index + 1, position);
        let new_lesson = NewLesson {
            title: lesson.title.as_deref().ok_or_else(|| missing(at("title")))?,
            content: lesson.content.as_deref().ok_or_else(|| missing(at("content")))?,
            difficulty: &lesson.difficulty,
            estimated_time: lesson
                .estimated_time
                .as_deref()
                .ok_or_else(|| missing(at("estimated_time")))?,
        };
        tx.insert_lesson(module_id, new_lesson).await?;
    }
    Ok(())
}
